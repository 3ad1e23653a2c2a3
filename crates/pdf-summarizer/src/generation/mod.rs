//! Summary prompt construction

pub mod prompt;

pub use prompt::PromptBuilder;
