use axum::extract::{Multipart, State};
use chrono::{DateTime, Utc};

use crate::api::v1::dto::{ExtractResumeForm, ExtractResumeResponse};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::error::{ResumeError, Result};
use crate::models::UploadedFile;

/// `POST /api/v1/resumes:extract`
///
/// Runs the extraction chain on the uploaded file. Extraction failures still
/// return 200 with method `failed` and a placeholder text.
#[utoipa::path(
    post,
    path = "/api/v1/resumes:extract",
    tag = "resumes",
    operation_id = "resumes.extract",
    request_body(content = ExtractResumeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Extraction finished", body = ExtractResumeResponse),
        (status = 400, description = "Invalid multipart body", body = ApiError),
        (status = 413, description = "File exceeds the upload limit", body = ApiError),
    )
)]
pub async fn extract_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResponse<ExtractResumeResponse> {
    let file = match read_upload(&mut multipart, state.orchestrator.max_file_size()).await {
        Ok(file) => file,
        Err(e) => return e.into(),
    };

    match state.orchestrator.extract(&file).await {
        Ok(result) => {
            let warning = state.orchestrator.warning_for(&result);
            ApiResponse::success(ExtractResumeResponse::new(result, warning))
        }
        Err(e) => e.into(),
    }
}

/// An RFC 3339 timestamp with nanoseconds and offset fits well inside this.
const MAX_TIMESTAMP_BYTES: usize = 64;

struct FilePart {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

/// Collect the multipart body into an [`UploadedFile`], aborting as soon as
/// the `file` part passes `limit` bytes.
async fn read_upload(multipart: &mut Multipart, limit: u64) -> Result<UploadedFile> {
    let mut file: Option<FilePart> = None;
    let mut last_modified: Option<DateTime<Utc>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ResumeError::Multipart(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = match field.content_type() {
                    Some(ct) => ct.to_string(),
                    None => mime_guess::from_path(&file_name)
                        .first_or_octet_stream()
                        .to_string(),
                };

                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ResumeError::Multipart(format!("Failed to read file: {e}")))?
                {
                    let size = (bytes.len() + chunk.len()) as u64;
                    if size > limit {
                        tracing::warn!(file = %file_name, size, limit, "Upload cut off");
                        return Err(ResumeError::FileTooLarge { size, limit });
                    }
                    bytes.extend_from_slice(&chunk);
                }

                file = Some(FilePart {
                    name: file_name,
                    mime_type,
                    bytes,
                });
            }
            "lastModified" | "last_modified" => {
                let mut raw = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    ResumeError::Multipart(format!("Failed to read lastModified: {e}"))
                })? {
                    if raw.len() + chunk.len() > MAX_TIMESTAMP_BYTES {
                        return Err(ResumeError::Validation(format!(
                            "lastModified exceeds {MAX_TIMESTAMP_BYTES} bytes"
                        )));
                    }
                    raw.extend_from_slice(&chunk);
                }
                last_modified = parse_last_modified(&String::from_utf8_lossy(&raw));
            }
            _ => {}
        }
    }

    let part = file.ok_or_else(|| ResumeError::Validation("Missing 'file' field".to_string()))?;

    let upload = UploadedFile::from_bytes(part.name, part.mime_type, part.bytes);
    Ok(match last_modified {
        Some(ts) => upload.with_last_modified(ts),
        None => upload,
    })
}

/// The timestamp only feeds the placeholder text, so a bad value is dropped
/// rather than failing the upload.
fn parse_last_modified(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = %raw.trim(), error = %e, "Ignoring lastModified that is not RFC 3339");
            None
        }
    }
}
