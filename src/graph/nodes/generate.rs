// Generate Node
// Sends the prompt to the language model as a single user message

use async_trait::async_trait;

use crate::core::errors::GenerationError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{QaState, Stage};
use crate::llm::ChatMessage;

#[derive(Default)]
pub struct GenerateNode;

impl GenerateNode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Node for GenerateNode {
    fn id(&self) -> &'static str {
        "generate"
    }

    fn name(&self) -> &'static str {
        "Generate Node"
    }

    async fn execute(&self, state: &mut QaState, ctx: &NodeContext<'_>) -> Result<NodeOutput, GraphError> {
        let Stage::Prompted { prompt, .. } = &state.stage else {
            return Ok(NodeOutput::Error(format!(
                "generate expects a prompt, found stage '{}'",
                state.stage.name()
            )));
        };

        let answer = ctx
            .generator
            .generate(prompt)
            .await
            .map_err(|e| GraphError::generation(self.id(), GenerationError(e.to_string())))?;

        tracing::debug!(
            thread_id = %state.thread_id,
            generator = ctx.generator.name(),
            chars = answer.len(),
            "Answer generated"
        );

        state.history.push(ChatMessage::assistant(answer.clone()));
        if let Stage::Prompted { question, context, prompt } =
            std::mem::replace(&mut state.stage, Stage::Pending { question: String::new() })
        {
            state.stage = Stage::Answered {
                question,
                context,
                prompt,
                answer,
            };
        }
        Ok(NodeOutput::Final)
    }
}
