mod api;
mod enhance;
pub mod prompts;
mod provider;

pub use api::LlmApiClient;
pub use enhance::EnhancementClient;
pub use provider::{CompletionOptions, LlmBackend, LlmProvider};
