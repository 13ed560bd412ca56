use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{ResumeError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Resolves the configured model to a backend and owns the client for it.
#[derive(Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    client: Option<Arc<LlmApiClient>>,
}

impl std::fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => match &config.base_url {
                Some(base_url) => LlmBackend::OpenAICompatible {
                    base_url: base_url.clone(),
                },
                None => {
                    let reason = format!("Unknown provider in model: {}", config.model);
                    warn!("{}", reason);
                    return Self::unavailable(&reason);
                }
            },
        };

        match LlmApiClient::new(config) {
            Ok(client) => {
                info!(model = %client.model(), base_url = %client.base_url(), "LLM client initialized");
                Self {
                    backend,
                    client: Some(Arc::new(client)),
                }
            }
            Err(e) => {
                let reason = format!("LLM backend unavailable: {e}");
                warn!("{}", reason);
                Self::unavailable(&reason)
            }
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            client: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ResumeError::LlmUnavailable(self.unavailable_reason()))?;

        client.complete(prompt, system_prompt, options).await
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM client not initialized".to_string(),
        }
    }
}
