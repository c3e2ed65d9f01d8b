// Conversation state
// Typed per-turn state passed through the QA graph

use crate::llm::ChatMessage;
use crate::rag::Chunk;

/// Progress of one turn. Each node moves the state one stage forward.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Pending {
        question: String,
    },
    Retrieved {
        question: String,
        context: Vec<Chunk>,
    },
    Prompted {
        question: String,
        context: Vec<Chunk>,
        prompt: String,
    },
    Answered {
        question: String,
        context: Vec<Chunk>,
        prompt: String,
        answer: String,
    },
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Pending { .. } => "pending",
            Stage::Retrieved { .. } => "retrieved",
            Stage::Prompted { .. } => "prompted",
            Stage::Answered { .. } => "answered",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QaState {
    pub thread_id: String,
    /// Persisted messages plus the ones produced by this turn
    pub history: Vec<ChatMessage>,
    pub stage: Stage,
}

impl QaState {
    /// Starts a turn: the new question is appended to the loaded history.
    pub fn new(thread_id: impl Into<String>, mut history: Vec<ChatMessage>, question: impl Into<String>) -> Self {
        let question = question.into();
        history.push(ChatMessage::user(question.clone()));
        Self {
            thread_id: thread_id.into(),
            history,
            stage: Stage::Pending { question },
        }
    }

    /// Content of the most recent human message.
    pub fn latest_question(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|message| message.is_user())
            .map(|message| message.content.as_str())
    }

    pub fn context(&self) -> &[Chunk] {
        match &self.stage {
            Stage::Pending { .. } => &[],
            Stage::Retrieved { context, .. }
            | Stage::Prompted { context, .. }
            | Stage::Answered { context, .. } => context,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.stage {
            Stage::Answered { answer, .. } => Some(answer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_appends_question_to_history() {
        let history = vec![ChatMessage::user("old question"), ChatMessage::assistant("old answer")];
        let state = QaState::new("t1", history, "new question");

        assert_eq!(state.history.len(), 3);
        assert_eq!(state.latest_question(), Some("new question"));
        assert_eq!(state.stage.name(), "pending");
        assert!(state.context().is_empty());
        assert!(state.answer().is_none());
    }

    #[test]
    fn latest_question_skips_assistant_messages() {
        let mut state = QaState::new("t1", Vec::new(), "q");
        state.history.push(ChatMessage::assistant("a"));
        assert_eq!(state.latest_question(), Some("q"));
    }

    #[test]
    fn answered_stage_exposes_answer() {
        let mut state = QaState::new("t1", Vec::new(), "q");
        state.stage = Stage::Answered {
            question: "q".into(),
            context: Vec::new(),
            prompt: "p".into(),
            answer: "a".into(),
        };
        assert_eq!(state.answer(), Some("a"));
    }
}
