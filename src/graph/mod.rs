// QA Graph Module
// StateGraph workflow: retrieve -> prompt -> generate

pub mod builder;
pub mod node;
pub mod nodes;
pub mod runtime;
pub mod state;
pub mod workflow;

pub use builder::build_qa_graph;
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::{QaState, Stage};
pub use workflow::{Answer, ConversationWorkflow};
