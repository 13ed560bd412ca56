use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};

use crate::{
    config::{parse_llm_provider_model, LlmConfig},
    error::{ResumeError, Result},
    llm::provider::CompletionOptions,
};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

#[derive(Debug, Clone)]
struct ApiConfig {
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
    max_retries: u32,
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    config: ApiConfig,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_config = ApiConfig::from_llm_config(config);

        let (provider, _) = parse_llm_provider_model(&config.model);
        let needs_api_key = matches!(
            provider.to_lowercase().as_str(),
            "openai" | "openrouter"
        ) && config.base_url.is_none();

        if needs_api_key && api_config.api_key.is_none() {
            return Err(ResumeError::LlmUnavailable(format!(
                "API key required for provider '{provider}'"
            )));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_base(api_config.base_url.clone())
            .with_api_key(api_config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api_config.timeout_secs))
            .build()
            .map_err(|error| {
                ResumeError::Llm(format!("Failed to create LLM HTTP client: {error}"))
            })?;

        // async-openai retries 5xx internally until max_elapsed_time, which
        // defaults to 15 minutes.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(api_config.timeout_secs)),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            config: api_config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// One chat completion. The first choice's content is returned as-is.
    pub async fn complete(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ResumeError::Validation("Prompt cannot be empty".to_string()));
        }

        let mut last_error: Option<ResumeError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay_ms = 100 * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            let request = self.build_request(prompt, system_prompt, options)?;

            match self.client.chat().create(request).await {
                Ok(response) => return Self::extract_content(response),
                Err(error) => {
                    let (mapped_error, retryable) = Self::classify(error);
                    tracing::debug!(attempt, retryable, error = %mapped_error, "LLM request failed");

                    if retryable && attempt < self.config.max_retries {
                        last_error = Some(mapped_error);
                        continue;
                    }

                    return Err(mapped_error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ResumeError::Llm("LLM completion failed after retries".to_string())
        }))
    }

    fn build_request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        options: Option<&CompletionOptions>,
    ) -> Result<CreateChatCompletionRequest> {
        let mut messages = Vec::new();

        if let Some(system_prompt) = system_prompt.filter(|value| !value.trim().is_empty()) {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|error| {
                        ResumeError::Validation(format!("Invalid system prompt: {error}"))
                    })?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|error| ResumeError::Validation(format!("Invalid user prompt: {error}")))?
                .into(),
        );

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(self.config.model.clone()).messages(messages);

        if let Some(options) = options {
            if let Some(temperature) = options.temperature {
                request.temperature(temperature);
            }
            if let Some(max_tokens) = options.max_tokens {
                request.max_tokens(max_tokens);
            }
        }

        request.build().map_err(|error| {
            ResumeError::Validation(format!("Invalid LLM completion request: {error}"))
        })
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ResumeError::Llm("LLM response contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(ResumeError::Llm(
                "LLM response contained empty content".to_string(),
            ));
        }

        Ok(message)
    }

    /// Map a client error and decide whether another attempt is worthwhile.
    /// Rate limits and auth failures are never retried.
    fn classify(error: OpenAIError) -> (ResumeError, bool) {
        match error {
            OpenAIError::Reqwest(reqwest_error) => match reqwest_error.status() {
                Some(reqwest::StatusCode::TOO_MANY_REQUESTS) => {
                    (ResumeError::LlmRateLimit { retry_after: None }, false)
                }
                Some(reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN) => (
                    ResumeError::Llm(format!("LLM authentication failed: {reqwest_error}")),
                    false,
                ),
                status => (
                    ResumeError::Llm(format!("LLM request failed: {reqwest_error}")),
                    status.map(|s| s.is_server_error()).unwrap_or(true),
                ),
            },
            OpenAIError::ApiError(api_error) => {
                if is_rate_limit_api_error(&api_error) {
                    (ResumeError::LlmRateLimit { retry_after: None }, false)
                } else if is_auth_api_error(&api_error) {
                    (
                        ResumeError::Llm(format!("LLM authentication failed: {api_error}")),
                        false,
                    )
                } else {
                    let retryable = api_error.r#type.is_none() && api_error.code.is_none();
                    (
                        ResumeError::Llm(format!("LLM API error: {api_error}")),
                        retryable,
                    )
                }
            }
            OpenAIError::JSONDeserialize(err) => (
                ResumeError::Llm(format!("Failed to parse LLM response: {err}")),
                false,
            ),
            OpenAIError::InvalidArgument(message) => (ResumeError::Validation(message), false),
            other => (ResumeError::Llm(other.to_string()), false),
        }
    }
}

fn lowercase_fields(api_error: &ApiError) -> (String, String, String) {
    (
        api_error.message.to_lowercase(),
        api_error.r#type.clone().unwrap_or_default().to_lowercase(),
        api_error.code.clone().unwrap_or_default().to_lowercase(),
    )
}

fn is_rate_limit_api_error(api_error: &ApiError) -> bool {
    let (message, error_type, code) = lowercase_fields(api_error);

    message.contains("rate limit")
        || message.contains("too many requests")
        || error_type.contains("rate_limit")
        || code.contains("rate_limit")
        || code == "insufficient_quota"
}

fn is_auth_api_error(api_error: &ApiError) -> bool {
    let (message, error_type, code) = lowercase_fields(api_error);

    message.contains("unauthorized")
        || message.contains("invalid api key")
        || code.contains("invalid_api_key")
        || error_type.contains("authentication")
}

impl ApiConfig {
    fn from_llm_config(config: &LlmConfig) -> Self {
        let (provider, model) = parse_llm_provider_model(&config.model);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let normalized_model = if provider.eq_ignore_ascii_case("local") {
            config.model.clone()
        } else {
            model.to_string()
        };

        Self {
            base_url,
            api_key: config.api_key.clone(),
            model: normalized_model,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => OPENAI_BASE_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(model: &str, api_key: Option<&str>, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: api_key.map(String::from),
            base_url: base_url.map(String::from),
            timeout_secs: 30,
            max_retries: 0,
        }
    }

    #[test]
    fn test_provider_prefix_selects_base_url_and_strips_model() {
        let client = LlmApiClient::new(&llm_config("ollama/llama3", None, None)).unwrap();
        assert_eq!(client.base_url(), OLLAMA_BASE_URL);
        assert_eq!(client.model(), "llama3");

        let client =
            LlmApiClient::new(&llm_config("openrouter/openai/gpt-4o", Some("sk"), None)).unwrap();
        assert_eq!(client.base_url(), OPENROUTER_BASE_URL);
        assert_eq!(client.model(), "openai/gpt-4o");
    }

    #[test]
    fn test_hosted_provider_without_key_is_unavailable() {
        let result = LlmApiClient::new(&llm_config("openai/gpt-4o-mini", None, None));
        assert!(matches!(result, Err(ResumeError::LlmUnavailable(_))));
    }

    #[test]
    fn test_explicit_base_url_needs_no_key() {
        let client = LlmApiClient::new(&llm_config(
            "openai/gpt-4o-mini",
            None,
            Some("http://127.0.0.1:9999/v1"),
        ))
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9999/v1");
    }

    #[test]
    fn test_request_carries_system_and_user_messages() {
        let client = LlmApiClient::new(&llm_config("ollama/llama3", None, None)).unwrap();
        let request = client
            .build_request("raw resume", Some("fix OCR errors"), None)
            .unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.model, "llama3");

        let request = client.build_request("raw resume", Some("  "), None).unwrap();
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_rate_limit_api_error_is_not_retried() {
        let (error, retryable) = LlmApiClient::classify(OpenAIError::ApiError(ApiError {
            message: "Rate limit reached".to_string(),
            r#type: Some("requests".to_string()),
            param: None,
            code: Some("rate_limit_exceeded".to_string()),
        }));
        assert!(matches!(error, ResumeError::LlmRateLimit { .. }));
        assert!(!retryable);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_before_any_request() {
        let client = LlmApiClient::new(&llm_config("ollama/llama3", None, None)).unwrap();
        let result = client.complete("   ", None, None).await;
        assert!(matches!(result, Err(ResumeError::Validation(_))));
    }
}
