// Graph Builder
// Constructs the question-answering graph

use super::node::GraphError;
use super::nodes::{GenerateNode, PromptNode, RetrieveNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// retrieve -> prompt -> generate, ending at generate.
pub fn build_qa_graph(max_steps: usize) -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("retrieve")
        .max_steps(max_steps)
        .node(Box::new(RetrieveNode::new()))
        .node(Box::new(PromptNode::new()))
        .node(Box::new(GenerateNode::new()))
        .edge("retrieve", "prompt")
        .edge("prompt", "generate")
        .build()
}
