use super::settings::AppConfig;
use crate::core::errors::ApiError;

pub fn validate_config(config: &AppConfig) -> Result<(), ApiError> {
    let chunking = &config.chunking;
    validate_min(chunking.chunk_size, "chunking.chunk_size", 1)?;
    if chunking.chunk_overlap >= chunking.chunk_size {
        return Err(invalid(
            "chunking.chunk_overlap",
            "must be smaller than chunk_size",
        ));
    }
    if chunking.separators.is_empty() {
        return Err(invalid("chunking.separators", "at least one separator is required"));
    }

    let retrieval = &config.retrieval;
    validate_min(retrieval.top_k, "retrieval.top_k", 1)?;
    validate_min(retrieval.dense_k, "retrieval.dense_k", 1)?;
    validate_min(retrieval.lexical_k, "retrieval.lexical_k", 1)?;
    validate_weight(retrieval.dense_weight, "retrieval.dense_weight")?;
    validate_weight(retrieval.lexical_weight, "retrieval.lexical_weight")?;
    if retrieval.dense_weight + retrieval.lexical_weight <= 0.0 {
        return Err(invalid(
            "retrieval",
            "dense_weight and lexical_weight cannot both be zero",
        ));
    }
    if !(retrieval.rrf_c.is_finite() && retrieval.rrf_c > 0.0) {
        return Err(invalid("retrieval.rrf_c", "must be a positive number"));
    }

    if config.llm.base_url.trim().is_empty() {
        return Err(invalid("llm.base_url", "value cannot be empty"));
    }
    validate_min(config.llm.hashing_dimensions, "llm.hashing_dimensions", 1)?;
    validate_min(config.llm.request_timeout_secs as usize, "llm.request_timeout_secs", 1)?;

    validate_min(config.graph.max_steps, "graph.max_steps", 1)?;

    Ok(())
}

fn validate_min(value: usize, path: &str, min: usize) -> Result<(), ApiError> {
    if value < min {
        return Err(invalid(path, &format!("must be at least {}", min)));
    }
    Ok(())
}

fn validate_weight(value: f64, path: &str) -> Result<(), ApiError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(path, "must be a non-negative number"));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid config at '{}': {}", path, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_overlap = 500;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunking.chunk_overlap"));
    }

    #[test]
    fn rejects_zero_top_k() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_negative_or_all_zero_weights() {
        let mut config = AppConfig::default();
        config.retrieval.dense_weight = -0.1;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.retrieval.dense_weight = 0.0;
        config.retrieval.lexical_weight = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn single_list_weighting_is_allowed() {
        let mut config = AppConfig::default();
        config.retrieval.lexical_weight = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_non_positive_rrf_constant() {
        let mut config = AppConfig::default();
        config.retrieval.rrf_c = 0.0;
        assert!(validate_config(&config).is_err());
    }
}
