use std::sync::Arc;

use async_trait::async_trait;
use leptess::LepTess;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::preprocessing::preprocess_page;
use super::rasterize::PageImage;
use crate::config::OcrConfig;
use crate::error::{ResumeError, Result};

/// Produces recognition workers. Creating a worker may be expensive
/// (language data is loaded), so one is created per recognition call.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>>;
}

/// A loaded recognizer. `terminate` releases its resources and must be
/// safe to call on a worker that is mid-recognition on another thread.
#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, page: &PageImage) -> Result<String>;

    fn terminate(&mut self);
}

/// Local Tesseract through leptess.
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>> {
        let languages = self.config.languages.clone();
        let tesseract = tokio::task::spawn_blocking(move || LepTess::new(None, &languages))
            .await
            .map_err(|e| ResumeError::Ocr(format!("Tesseract init task panicked: {e}")))?
            .map_err(|e| ResumeError::OcrUnavailable(format!("Tesseract not available: {e}")))?;

        info!(languages = %self.config.languages, "Tesseract worker initialized");
        Ok(Box::new(TesseractWorker {
            tesseract: Some(Arc::new(Mutex::new(tesseract))),
            config: self.config.clone(),
        }))
    }
}

struct TesseractWorker {
    tesseract: Option<Arc<Mutex<LepTess>>>,
    config: OcrConfig,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, page: &PageImage) -> Result<String> {
        let tesseract = self
            .tesseract
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ResumeError::Ocr("Tesseract worker already terminated".to_string()))?;
        let png = page.png.clone();
        let config = self.config.clone();
        let page_number = page.page_number;

        let text = tokio::task::spawn_blocking(move || {
            let prepared = preprocess_page(&png, &config)?;
            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&prepared)
                .map_err(|e| ResumeError::Ocr(format!("Failed to set page image: {e}")))?;
            lt.get_utf8_text()
                .map_err(|e| ResumeError::Ocr(format!("Failed to recognize page: {e}")))
        })
        .await
        .map_err(|e| ResumeError::Ocr(format!("OCR task panicked: {e}")))??;

        debug!(page = page_number, chars = text.len(), "Recognized page");
        Ok(text)
    }

    fn terminate(&mut self) {
        // A blocking task still holding a clone finishes on its own copy.
        if self.tesseract.take().is_some() {
            debug!("Tesseract worker terminated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_terminated_worker_refuses_pages() {
        let mut worker = TesseractWorker {
            tesseract: None,
            config: OcrConfig::default(),
        };
        worker.terminate();
        let page = PageImage {
            page_number: 1,
            png: Vec::new(),
        };
        let result = worker.recognize(&page).await;
        assert!(matches!(result, Err(ResumeError::Ocr(_))));
    }

    #[tokio::test]
    async fn test_missing_language_data_is_unavailable() {
        let engine = TesseractEngine::new(&OcrConfig {
            languages: "zz-not-a-language".to_string(),
            ..OcrConfig::default()
        });
        let result = engine.create_worker().await;
        assert!(
            matches!(result, Err(ResumeError::OcrUnavailable(_))),
            "no traineddata exists for this language, so init must fail"
        );
    }
}
