use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;
use crate::llm::LlmBackend;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub ocr: OcrStatus,
    pub llm: LlmStatus,
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct OcrStatus {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Whether OCR and Word output is sent through the LLM.
    pub enhancement: bool,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let orchestrator = &state.orchestrator;

    let ocr_status = OcrStatus {
        status: if orchestrator.ocr_available() {
            "available".to_string()
        } else {
            "unavailable".to_string()
        },
        model: state.config.ocr.model.clone(),
    };

    let enhancer = orchestrator.enhancer();
    let llm_status = if enhancer.provider().is_available() {
        let provider = match enhancer.provider().backend() {
            LlmBackend::OpenAI => "openai",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
            LlmBackend::LmStudio => "lmstudio",
            LlmBackend::OpenAICompatible { .. } => "openai-compatible",
            LlmBackend::Unavailable { .. } => "unavailable",
        };
        LlmStatus {
            status: "available".to_string(),
            provider: Some(provider.to_string()),
            model: state.config.llm.as_ref().map(|c| c.model.clone()),
            enhancement: enhancer.is_active(),
        }
    } else {
        LlmStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
            enhancement: false,
        }
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr: ocr_status,
        llm: llm_status,
        max_file_size: orchestrator.max_file_size(),
    })
}
