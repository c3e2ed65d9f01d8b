// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::errors::{GenerationError, RetrievalError, WorkflowError};
use crate::llm::Generator;
use crate::rag::RetrieverHandle;

use super::state::QaState;

/// Collaborators available to nodes during execution
pub struct NodeContext<'a> {
    pub retriever: &'a RetrieverHandle,
    pub generator: &'a dyn Generator,
    /// Chunks handed to the prompt
    pub top_k: usize,
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Hand the state to the successor node
    Continue,
    /// Graph execution complete
    Final,
    /// Error occurred
    Error(String),
}

/// Typed failure raised by a node's collaborator.
#[derive(Debug)]
pub enum NodeFailure {
    Retrieval(RetrievalError),
    Generation(GenerationError),
}

/// Graph execution error
///
/// `execution_trace` records the node IDs visited before the error, most
/// recent last.
#[derive(Debug)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
    pub failure: Option<NodeFailure>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
            failure: None,
        }
    }

    pub fn retrieval(node_id: impl Into<String>, err: RetrievalError) -> Self {
        let mut graph_err = Self::new(node_id, err.to_string());
        graph_err.failure = Some(NodeFailure::Retrieval(err));
        graph_err
    }

    pub fn generation(node_id: impl Into<String>, err: GenerationError) -> Self {
        let mut graph_err = Self::new(node_id, err.to_string());
        graph_err.failure = Some(NodeFailure::Generation(err));
        graph_err
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Collaborator failures keep their type; everything else is a graph error.
impl From<GraphError> for WorkflowError {
    fn from(err: GraphError) -> Self {
        let text = err.to_string();
        match err.failure {
            Some(NodeFailure::Retrieval(e)) => WorkflowError::Retrieval(e),
            Some(NodeFailure::Generation(e)) => WorkflowError::Generation(e),
            None => WorkflowError::Graph(text),
        }
    }
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(&self, state: &mut QaState, ctx: &NodeContext<'_>) -> Result<NodeOutput, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_trace() {
        let err = GraphError::new("generate", "boom").with_trace(vec!["retrieve".into(), "prompt".into()]);
        assert_eq!(err.to_string(), "GraphError in generate (trace: retrieve -> prompt): boom");
    }

    #[test]
    fn generation_failure_converts_to_typed_workflow_error() {
        let err = GraphError::generation("generate", GenerationError("timeout".into()));
        assert!(matches!(WorkflowError::from(err), WorkflowError::Generation(_)));

        let err = GraphError::new("runtime", "Maximum steps (3) exceeded");
        assert!(matches!(WorkflowError::from(err), WorkflowError::Graph(ref m) if m.contains("Maximum steps")));
    }
}
