use crate::error::{ResumeError, Result};
use crate::models::UploadedFile;

use super::sanitize::sanitize_with_limit;

const PDF_SIGNATURE: &str = "%PDF-";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read an upload as UTF-8 text.
///
/// Content that turns out to be a PDF yields
/// [`ResumeError::BinaryDataDetected`] so the caller can reroute it.
pub async fn read_as_text(file: &UploadedFile, max_chars: usize) -> Result<String> {
    let bytes = file.read_bytes().await?;
    decode_text(&bytes, max_chars)
}

pub(crate) fn decode_text(bytes: &[u8], max_chars: usize) -> Result<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let decoded = String::from_utf8_lossy(bytes);

    if decoded.starts_with(PDF_SIGNATURE) {
        return Err(ResumeError::BinaryDataDetected);
    }

    Ok(sanitize_with_limit(&decoded, max_chars))
}
