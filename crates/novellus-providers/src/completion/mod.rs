//! Completion provider implementations.

mod ollama;
mod openai;
mod scripted;

pub use ollama::OllamaCompletionProvider;
pub use openai::OpenAiCompletionProvider;
pub use scripted::ScriptedCompletionProvider;
