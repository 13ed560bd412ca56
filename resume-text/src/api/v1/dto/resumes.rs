//! Resume extraction request/response DTOs for the v1 API.

use serde::{Deserialize, Serialize};

use crate::models::ExtractionResult;

/// Multipart body for `POST /v1/resumes:extract`. Documentation only; the
/// handler reads the parts as a stream.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResumeForm {
    /// The resume file (PDF, Word or plain text).
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// RFC 3339 modification time of the original file, shown in the
    /// placeholder when extraction fails.
    pub last_modified: Option<String>,
}

/// Response body for `POST /v1/resumes:extract`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResumeResponse {
    pub result: ExtractionResult,
    /// Non-blocking notice for the uploader, e.g. when little or no text
    /// could be recovered.
    pub warning: Option<String>,
}

impl ExtractResumeResponse {
    pub fn new(result: ExtractionResult, warning: Option<&str>) -> Self {
        Self {
            result,
            warning: warning.map(str::to_string),
        }
    }
}
