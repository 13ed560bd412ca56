use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Resume Text API",
        version = "1.0.0",
        description = "Plain-text extraction for resume uploads: PDF, Word and text files, with an OCR fallback for scanned PDFs.",
    ),
    paths(
        handlers::health::health_check,
        handlers::resumes::extract_resume,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Resumes
        dto::resumes::ExtractResumeForm,
        dto::resumes::ExtractResumeResponse,
        crate::models::ExtractionResult,
        crate::models::ExtractionMethod,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::OcrStatus,
        handlers::health::LlmStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "resumes", description = "Resume text extraction"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
