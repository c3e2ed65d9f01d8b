//! Conversation turns over the QA graph.

use std::sync::Arc;

use serde::Serialize;

use super::node::NodeContext;
use super::runtime::GraphRuntime;
use super::state::{QaState, Stage};
use crate::core::errors::WorkflowError;
use crate::history::{SessionStore, Turn};
use crate::llm::Generator;
use crate::rag::RetrieverHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub thread_id: String,
    pub answer: String,
    /// Ids of the chunks the answer was grounded on, in retrieval order
    pub sources: Vec<String>,
}

pub struct ConversationWorkflow {
    graph: GraphRuntime,
    retriever: Arc<RetrieverHandle>,
    generator: Arc<dyn Generator>,
    sessions: Arc<dyn SessionStore>,
    top_k: usize,
}

impl ConversationWorkflow {
    pub fn new(
        graph: GraphRuntime,
        retriever: Arc<RetrieverHandle>,
        generator: Arc<dyn Generator>,
        sessions: Arc<dyn SessionStore>,
        top_k: usize,
    ) -> Self {
        Self {
            graph,
            retriever,
            generator,
            sessions,
            top_k,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Answers `question` within `thread_id`.
    ///
    /// Turns on the same thread run one at a time. The session is only
    /// written after the answer is generated, so a failed turn leaves the
    /// history exactly as it was.
    pub async fn ask(&self, question: &str, thread_id: &str) -> Result<Answer, WorkflowError> {
        if question.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("question must not be empty".to_string()));
        }
        if thread_id.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("thread_id must not be empty".to_string()));
        }

        let lock = self.sessions.thread_lock(thread_id);
        let _guard = lock.lock().await;

        let history = self
            .sessions
            .get(thread_id)
            .await?
            .map(|session| session.messages)
            .unwrap_or_default();

        let mut state = QaState::new(thread_id, history, question);
        let ctx = NodeContext {
            retriever: self.retriever.as_ref(),
            generator: self.generator.as_ref(),
            top_k: self.top_k,
        };

        if let Err(err) = self.graph.run(&mut state, &ctx).await {
            tracing::warn!(thread_id, error = %err, "Conversation turn failed");
            return Err(err.into());
        }

        let stage_name = state.stage.name();
        let Stage::Answered { question, context, answer, .. } = state.stage else {
            return Err(WorkflowError::Graph(format!(
                "graph finished at stage '{}' without an answer",
                stage_name
            )));
        };

        let sources = context.iter().map(|chunk| chunk.id.clone()).collect();
        self.sessions
            .append(
                thread_id,
                Turn {
                    question,
                    answer: answer.clone(),
                    context,
                },
            )
            .await?;

        tracing::info!(thread_id, "Conversation turn completed");

        Ok(Answer {
            thread_id: thread_id.to_string(),
            answer,
            sources,
        })
    }
}
