use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::plain_text::decode_text;
use super::sanitize::sanitize_with_limit;
use crate::config::ExtractionConfig;
use crate::error::{ResumeError, Result};
use crate::models::UploadedFile;

/// Reads the text a PDF carries without rasterizing it.
#[async_trait]
pub trait TextLayerSource: Send + Sync {
    async fn read_text_layer(&self, pdf: Arc<[u8]>) -> Result<String>;
}

/// Text layer through `pdf-extract`.
pub struct PdfExtractTextLayer;

#[async_trait]
impl TextLayerSource for PdfExtractTextLayer {
    async fn read_text_layer(&self, pdf: Arc<[u8]>) -> Result<String> {
        // pdf-extract panics on some malformed inputs; the join error absorbs it.
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
            .await
            .map_err(|e| ResumeError::Conversion(format!("PDF text layer reader crashed: {e}")))?
            .map_err(|e| ResumeError::Conversion(format!("PDF extraction failed: {e}")))
    }
}

/// First PDF step: accept direct text only when there is enough of it.
pub struct PdfDirectExtractor {
    text_layer: Option<Arc<dyn TextLayerSource>>,
    min_chars: usize,
    max_chars: usize,
}

impl PdfDirectExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        let text_layer: Option<Arc<dyn TextLayerSource>> = if config.pdf_text_layer {
            Some(Arc::new(PdfExtractTextLayer))
        } else {
            None
        };
        Self::with_text_layer(text_layer, config)
    }

    pub fn with_text_layer(
        text_layer: Option<Arc<dyn TextLayerSource>>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            text_layer,
            min_chars: config.min_direct_text_chars,
            max_chars: config.max_text_chars,
        }
    }

    /// Sanitized direct text, or [`ResumeError::InsufficientText`] when it is
    /// shorter than the usefulness threshold.
    pub async fn extract_direct(&self, file: &UploadedFile) -> Result<String> {
        let bytes = file.read_bytes().await?;

        let text = match decode_text(&bytes, self.max_chars) {
            Ok(text) => text,
            Err(ResumeError::BinaryDataDetected) => match &self.text_layer {
                Some(source) => {
                    let raw = source.read_text_layer(bytes).await?;
                    sanitize_with_limit(&raw, self.max_chars)
                }
                None => return Err(ResumeError::BinaryDataDetected),
            },
            Err(e) => return Err(e),
        };

        let chars = text.chars().count();
        debug!(chars, required = self.min_chars, "Direct PDF text read");
        if chars < self.min_chars {
            return Err(ResumeError::InsufficientText {
                chars,
                required: self.min_chars,
            });
        }
        Ok(text)
    }
}
