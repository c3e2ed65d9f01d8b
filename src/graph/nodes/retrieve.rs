// Retrieve Node
// Fetches grounding chunks for the latest question

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{QaState, Stage};

#[derive(Default)]
pub struct RetrieveNode;

impl RetrieveNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retrieve Node"
    }

    async fn execute(&self, state: &mut QaState, ctx: &NodeContext<'_>) -> Result<NodeOutput, GraphError> {
        if !matches!(state.stage, Stage::Pending { .. }) {
            return Ok(NodeOutput::Error(format!(
                "retrieve expects a pending question, found stage '{}'",
                state.stage.name()
            )));
        }

        // Only the newest human message is used as the query.
        let Some(question) = state.latest_question().map(str::to_string) else {
            return Ok(NodeOutput::Error("no human message to answer".to_string()));
        };

        let context = ctx
            .retriever
            .retrieve(&question, ctx.top_k)
            .await
            .map_err(|e| GraphError::retrieval(self.id(), e))?;

        tracing::debug!(thread_id = %state.thread_id, chunks = context.len(), "Context retrieved");

        state.stage = Stage::Retrieved { question, context };
        Ok(NodeOutput::Continue)
    }
}
