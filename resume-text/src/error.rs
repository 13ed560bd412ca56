use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeError {
    #[error("File too large: {size} bytes (max {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Binary data detected: content carries a PDF signature")]
    BinaryDataDetected,

    #[error("Read error: {0}")]
    Read(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Insufficient text: {chars} characters, need at least {required}")]
    InsufficientText { chars: usize, required: usize },

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR cancelled")]
    OcrCancelled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResumeError {
    /// Step-local failures that the orchestrator turns into a fallback.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ResumeError::FileTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResumeError>;
