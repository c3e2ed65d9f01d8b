//! Text extraction from uploaded files.

use std::path::Path;
use std::sync::Arc;

use crate::core::errors::ExtractError;

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Concatenated page text of a PDF.
#[cfg(feature = "pdf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Failed(e.to_string()))
    }
}

/// UTF-8 text files; invalid sequences are replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Chooses an extractor from the file extension.
pub fn extractor_for(file_name: &str) -> Result<Arc<dyn TextExtractor>, ExtractError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        #[cfg(feature = "pdf")]
        "pdf" => Ok(Arc::new(PdfTextExtractor)),
        "txt" | "md" | "markdown" => Ok(Arc::new(PlainTextExtractor)),
        "" => Err(ExtractError::Unsupported(format!("'{}' has no file extension", file_name))),
        other => Err(ExtractError::Unsupported(format!(".{} files are not supported", other))),
    }
}
