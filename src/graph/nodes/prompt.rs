// Prompt Node
// Formats retrieved context and the question into the answer prompt

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{QaState, Stage};
use crate::rag::prompt::build_prompt;

#[derive(Default)]
pub struct PromptNode;

impl PromptNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for PromptNode {
    fn id(&self) -> &'static str {
        "prompt"
    }

    fn name(&self) -> &'static str {
        "Prompt Node"
    }

    async fn execute(&self, state: &mut QaState, _ctx: &NodeContext<'_>) -> Result<NodeOutput, GraphError> {
        let Stage::Retrieved { question, context } = &state.stage else {
            return Ok(NodeOutput::Error(format!(
                "prompt expects retrieved context, found stage '{}'",
                state.stage.name()
            )));
        };

        let prompt = build_prompt(context, question);
        state.stage = Stage::Prompted {
            question: question.clone(),
            context: context.clone(),
            prompt,
        };
        Ok(NodeOutput::Continue)
    }
}
