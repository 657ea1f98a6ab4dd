//! Content generator adapters.
//!
//! `OpenAiContentGenerator` talks to any OpenAI-compatible chat completions
//! endpoint; `PromptRenderer` turns a resolved hierarchy into the prompt it
//! sends.

pub mod openai_generator;
pub mod prompt;

pub use openai_generator::OpenAiContentGenerator;
pub use prompt::PromptRenderer;
