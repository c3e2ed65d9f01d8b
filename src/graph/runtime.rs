// Graph Runtime - petgraph based
// Linear execution of the QA workflow: every node has at most one successor

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::QaState;

pub struct GraphRuntime {
    graph: DiGraph<Box<dyn Node>, ()>,
    node_indices: HashMap<String, NodeIndex>,
    entry_node_id: String,
    /// Hard stop for runaway graphs
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 10,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    /// Links `from` to `to`. A node already linked to a successor is rejected.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let from_idx = self.index_of(from, "Source")?;
        let to_idx = self.index_of(to, "Target")?;

        if self.successor(from_idx).is_some() {
            return Err(GraphError::new(from, format!("Node already has a successor: {}", from)));
        }

        self.graph.add_edge(from_idx, to_idx, ());
        Ok(())
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Runs from the entry node until a node returns `Final`.
    ///
    /// Errors carry the IDs of the nodes that completed before the failure.
    pub async fn run(&self, state: &mut QaState, ctx: &NodeContext<'_>) -> Result<(), GraphError> {
        if self.entry_node_id.is_empty() {
            return Err(GraphError::new("runtime", "No entry node set"));
        }
        let mut current_idx = self.index_of(&self.entry_node_id, "Entry")?;
        let mut trace: Vec<String> = Vec::new();

        for step in 0..self.max_steps {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!(node = node_id, step, thread_id = %state.thread_id, "Executing node");

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };
            trace.push(node_id.to_string());

            match output {
                NodeOutput::Final => {
                    tracing::debug!(node = node_id, "Graph execution complete");
                    return Ok(());
                }
                NodeOutput::Error(msg) => {
                    return Err(GraphError::new(node_id, msg).with_trace(trace));
                }
                NodeOutput::Continue => {
                    current_idx = match self.successor(current_idx) {
                        Some(next) => next,
                        None => {
                            return Err(GraphError::new(
                                node_id,
                                format!("No outgoing edge from node: {}", node_id),
                            )
                            .with_trace(trace))
                        }
                    };
                }
            }
        }

        Err(GraphError::new("runtime", format!("Maximum steps ({}) exceeded", self.max_steps)).with_trace(trace))
    }

    fn index_of(&self, id: &str, role: &str) -> Result<NodeIndex, GraphError> {
        self.node_indices
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::new(id, format!("{} node not found: {}", role, id)))
    }

    fn successor(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(index, Direction::Outgoing).next()
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges.push((from.into(), to.into()));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to) in self.pending_edges {
            self.runtime.add_edge(&from, &to)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::core::config::RetrievalConfig;
    use crate::core::errors::ApiError;
    use crate::llm::{ChatMessage, ChatRequest, Embedder, Generator, HashingEmbedder};
    use crate::rag::{DocumentStore, InMemoryDocumentStore, RetrieverHandle};

    /// Appends its id to the history, then emits a fixed output.
    struct StepNode {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for StepNode {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(&self, state: &mut QaState, _ctx: &NodeContext<'_>) -> Result<NodeOutput, GraphError> {
            state.history.push(ChatMessage::assistant(self.id));
            Ok(self.output.clone())
        }
    }

    struct SilentGenerator;

    #[async_trait]
    impl Generator for SilentGenerator {
        fn name(&self) -> &str {
            "silent"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
            Ok(String::new())
        }
    }

    fn step(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(StepNode { id, output })
    }

    fn visited(state: &QaState) -> Vec<&str> {
        state.history.iter().skip(1).map(|m| m.content.as_str()).collect()
    }

    async fn run(graph: &GraphRuntime) -> (QaState, Result<(), GraphError>) {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(8));
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new(embedder.clone()));
        let retriever = RetrieverHandle::new(store, embedder, RetrievalConfig::default());
        let ctx = NodeContext {
            retriever: &retriever,
            generator: &SilentGenerator,
            top_k: 3,
        };
        let mut state = QaState::new("t", Vec::new(), "q");
        let result = graph.run(&mut state, &ctx).await;
        (state, result)
    }

    #[tokio::test]
    async fn follows_edges_until_final() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Continue))
            .node(step("c", NodeOutput::Final))
            .edge("a", "b")
            .edge("b", "c")
            .build()
            .unwrap();

        let (state, result) = run(&graph).await;
        assert!(result.is_ok());
        assert_eq!(visited(&state), vec!["a", "b", "c"]);
    }

    #[test]
    fn second_successor_is_rejected() {
        let err = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .node(step("left", NodeOutput::Final))
            .node(step("right", NodeOutput::Final))
            .edge("a", "left")
            .edge("a", "right")
            .build()
            .err()
            .unwrap();
        assert_eq!(err.node_id, "a");
        assert!(err.message.contains("already has a successor"));
    }

    #[tokio::test]
    async fn continue_without_edge_fails_with_trace() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .build()
            .unwrap();

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();
        assert_eq!(err.node_id, "a");
        assert_eq!(err.execution_trace, vec!["a"]);
    }

    #[tokio::test]
    async fn cycle_hits_step_limit_with_trace() {
        let graph = GraphBuilder::new()
            .entry("a")
            .max_steps(3)
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Continue))
            .edge("a", "b")
            .edge("b", "a")
            .build()
            .unwrap();
        assert!(graph.has_cycle());

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();
        assert!(err.message.contains("Maximum steps (3)"));
        assert_eq!(err.execution_trace, vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn node_error_output_stops_the_run() {
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Error("bad state".into())))
            .build()
            .unwrap();

        let (_, result) = run(&graph).await;
        let err = result.unwrap_err();
        assert_eq!(err.node_id, "a");
        assert_eq!(err.message, "bad state");
    }

    #[test]
    fn unknown_edge_target_fails_to_build() {
        let result = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .edge("a", "missing")
            .build();
        assert!(result.is_err());
    }
}
