// Graph Nodes Module
// retrieve -> prompt -> generate

pub mod generate;
pub mod prompt;
pub mod retrieve;

pub use generate::GenerateNode;
pub use prompt::PromptNode;
pub use retrieve::RetrieveNode;
