use std::time::Duration;

use tracing::{debug, warn};

use super::prompts::{resume_enhancement_prompt, RESUME_ENHANCEMENT_SYSTEM_PROMPT};
use super::provider::{CompletionOptions, LlmProvider};
use crate::config::EnhancementConfig;

/// Best-effort LLM cleanup of noisy extracted text.
///
/// [`EnhancementClient::enhance`] never fails: any problem yields the input
/// unchanged.
#[derive(Debug, Clone)]
pub struct EnhancementClient {
    provider: LlmProvider,
    config: EnhancementConfig,
}

impl EnhancementClient {
    pub fn new(provider: LlmProvider, config: EnhancementConfig) -> Self {
        Self { provider, config }
    }

    pub fn disabled() -> Self {
        Self {
            provider: LlmProvider::unavailable("Enhancement disabled"),
            config: EnhancementConfig {
                enabled: false,
                ..EnhancementConfig::default()
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.config.enabled && self.provider.is_available()
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    pub async fn enhance(&self, raw: &str) -> String {
        if !self.is_active() {
            return raw.to_string();
        }

        let input_chars = raw.chars().count();
        if input_chars == 0 {
            return String::new();
        }
        if input_chars > self.config.max_input_chars {
            debug!(
                input_chars,
                limit = self.config.max_input_chars,
                "Skipping enhancement for oversized input"
            );
            return raw.to_string();
        }

        let prompt = resume_enhancement_prompt(raw);
        let options = CompletionOptions {
            temperature: Some(0.0),
            max_tokens: None,
        };
        let call = self.provider.complete(
            &prompt,
            Some(RESUME_ENHANCEMENT_SYSTEM_PROMPT),
            Some(&options),
        );

        let completion =
            match tokio::time::timeout(Duration::from_secs(self.config.timeout_secs), call).await {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(error = %e, "Enhancement request failed, keeping raw text");
                    return raw.to_string();
                }
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.timeout_secs,
                        "Enhancement timed out, keeping raw text"
                    );
                    return raw.to_string();
                }
            };

        let enhanced = completion.trim();
        let output_chars = enhanced.chars().count();
        let min_chars = self.config.min_length_ratio * input_chars as f64;
        if output_chars == 0 || (output_chars as f64) < min_chars {
            warn!(
                input_chars,
                output_chars, "Enhanced text too short, keeping raw text"
            );
            return raw.to_string();
        }

        debug!(input_chars, output_chars, "Text enhanced");
        enhanced.to_string()
    }
}
