use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::engine::{OcrEngine, OcrWorker, TesseractEngine};
use super::rasterize::{PageRasterizer, PdftoppmRasterizer};
use crate::config::OcrConfig;
use crate::error::{ResumeError, Result};
use crate::processing::{ExtractionContext, ProgressReporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OcrState {
    Idle,
    Initializing,
    Recognizing,
    Done,
    Failed,
}

/// Holds a worker for one recognition call and terminates it exactly once,
/// whether the call returns, fails or is dropped mid-flight.
struct WorkerGuard {
    worker: Option<Box<dyn OcrWorker>>,
}

impl WorkerGuard {
    fn new(worker: Box<dyn OcrWorker>) -> Self {
        Self {
            worker: Some(worker),
        }
    }

    fn worker(&mut self) -> Result<&mut Box<dyn OcrWorker>> {
        self.worker
            .as_mut()
            .ok_or_else(|| ResumeError::Internal("OCR worker already released".to_string()))
    }

    fn release(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.terminate();
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Puts progress back to `0/false` on every exit path.
struct ProgressReset(ProgressReporter);

impl Drop for ProgressReset {
    fn drop(&mut self) {
        self.0.ocr(0, false);
    }
}

enum Backend {
    Ready {
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn PageRasterizer>,
    },
    Unavailable {
        reason: String,
    },
}

/// Last-resort text source for image-only PDFs.
pub struct OcrAdapter {
    backend: Backend,
    max_pages: usize,
    timeout: Duration,
}

impl OcrAdapter {
    pub fn new(config: &OcrConfig) -> Self {
        if config.is_disabled() {
            info!("OCR disabled by configuration");
            return Self::unavailable("OCR is disabled");
        }

        Self::with_components(
            Arc::new(TesseractEngine::new(config)),
            Arc::new(PdftoppmRasterizer::new(config)),
            config.max_pages,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_components(
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn PageRasterizer>,
        max_pages: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            backend: Backend::Ready { engine, rasterizer },
            max_pages,
            timeout,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Unavailable {
                reason: reason.into(),
            },
            max_pages: 0,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.backend, Backend::Ready { .. })
    }

    /// Recognize the leading pages of `pdf`. Pages are joined with a blank
    /// line. The text is returned raw; callers sanitize it.
    pub async fn recognize(&self, pdf: &[u8], ctx: &ExtractionContext) -> Result<String> {
        let (engine, rasterizer) = match &self.backend {
            Backend::Ready { engine, rasterizer } => (engine, rasterizer),
            Backend::Unavailable { reason } => {
                return Err(ResumeError::OcrUnavailable(reason.clone()))
            }
        };

        debug!(state = ?OcrState::Idle, max_pages = self.max_pages, "Starting OCR");
        ctx.progress.ocr(0, true);
        let _reset = ProgressReset(ctx.progress.clone());

        let run = tokio::time::timeout(
            self.timeout,
            self.run(engine.as_ref(), rasterizer.as_ref(), pdf, &ctx.progress),
        );

        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(ResumeError::OcrCancelled),
            outcome = run => match outcome {
                Ok(inner) => inner,
                Err(_) => Err(ResumeError::Ocr(format!(
                    "OCR timed out after {} seconds",
                    self.timeout.as_secs()
                ))),
            },
        };

        match &result {
            Ok(text) => {
                ctx.progress.ocr(100, true);
                info!(state = ?OcrState::Done, chars = text.chars().count(), "OCR finished");
            }
            Err(e) => warn!(state = ?OcrState::Failed, error = %e, "OCR failed"),
        }
        result
    }

    async fn run(
        &self,
        engine: &dyn OcrEngine,
        rasterizer: &dyn PageRasterizer,
        pdf: &[u8],
        progress: &ProgressReporter,
    ) -> Result<String> {
        debug!(state = ?OcrState::Initializing, "Acquiring OCR worker");
        let mut guard = WorkerGuard::new(engine.create_worker().await?);

        let mut pages = rasterizer.rasterize(pdf, self.max_pages).await?;
        pages.truncate(self.max_pages);
        if pages.is_empty() {
            return Err(ResumeError::Ocr("No pages rendered from PDF".to_string()));
        }

        let total = pages.len();
        let mut texts = Vec::with_capacity(total);
        for (index, page) in pages.iter().enumerate() {
            debug!(state = ?OcrState::Recognizing, page = page.page_number, total, "Recognizing page");
            let text = guard.worker()?.recognize(page).await?;
            texts.push(text.trim().to_string());
            progress.ocr(((index + 1) * 100 / total) as u8, true);
        }

        guard.release();
        Ok(texts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OcrProgress;
    use crate::ocr::PageImage;
    use crate::processing::ProgressEvent;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct Counters {
        created: AtomicUsize,
        terminated: AtomicUsize,
        recognized: AtomicUsize,
    }

    struct StubEngine {
        counters: Arc<Counters>,
        fail_on_page: Option<usize>,
        hang: bool,
    }

    struct StubWorker {
        counters: Arc<Counters>,
        fail_on_page: Option<usize>,
        hang: bool,
    }

    #[async_trait]
    impl OcrEngine for StubEngine {
        async fn create_worker(&self) -> Result<Box<dyn OcrWorker>> {
            self.counters.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubWorker {
                counters: Arc::clone(&self.counters),
                fail_on_page: self.fail_on_page,
                hang: self.hang,
            }))
        }
    }

    #[async_trait]
    impl OcrWorker for StubWorker {
        async fn recognize(&mut self, page: &PageImage) -> Result<String> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail_on_page == Some(page.page_number) {
                return Err(ResumeError::Ocr("engine crashed".to_string()));
            }
            self.counters.recognized.fetch_add(1, Ordering::SeqCst);
            Ok(format!("page {} text", page.page_number))
        }

        fn terminate(&mut self) {
            self.counters.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubRasterizer {
        pages: usize,
    }

    #[async_trait]
    impl PageRasterizer for StubRasterizer {
        async fn rasterize(&self, _pdf: &[u8], _max_pages: usize) -> Result<Vec<PageImage>> {
            // Ignores the cap so the adapter's own truncation is exercised.
            Ok((1..=self.pages)
                .map(|page_number| PageImage {
                    page_number,
                    png: Vec::new(),
                })
                .collect())
        }
    }

    fn adapter(counters: &Arc<Counters>, pages: usize, fail_on_page: Option<usize>) -> OcrAdapter {
        OcrAdapter::with_components(
            Arc::new(StubEngine {
                counters: Arc::clone(counters),
                fail_on_page,
                hang: false,
            }),
            Arc::new(StubRasterizer { pages }),
            5,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_success_joins_pages_and_releases_once() {
        let counters = Arc::new(Counters::default());
        let text = adapter(&counters, 2, None)
            .recognize(b"%PDF-", &ExtractionContext::default())
            .await
            .unwrap();

        assert_eq!(text, "page 1 text\n\npage 2 text");
        assert_eq!(counters.created.load(Ordering::SeqCst), 1);
        assert_eq!(counters.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_first_five_pages_are_recognized() {
        let counters = Arc::new(Counters::default());
        let text = adapter(&counters, 8, None)
            .recognize(b"%PDF-", &ExtractionContext::default())
            .await
            .unwrap();

        assert_eq!(counters.recognized.load(Ordering::SeqCst), 5);
        assert!(text.contains("page 5 text"));
        assert!(!text.contains("page 6 text"));
    }

    #[tokio::test]
    async fn test_engine_failure_releases_once() {
        let counters = Arc::new(Counters::default());
        let result = adapter(&counters, 3, Some(2))
            .recognize(b"%PDF-", &ExtractionContext::default())
            .await;

        assert!(matches!(result, Err(ResumeError::Ocr(_))));
        assert_eq!(counters.terminated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_releases_and_resets_progress() {
        let counters = Arc::new(Counters::default());
        let adapter = OcrAdapter::with_components(
            Arc::new(StubEngine {
                counters: Arc::clone(&counters),
                fail_on_page: None,
                hang: true,
            }),
            Arc::new(StubRasterizer { pages: 1 }),
            5,
            Duration::from_secs(30),
        );
        let (progress, mut rx) = ProgressReporter::channel();
        let cancel = CancellationToken::new();
        let ctx = ExtractionContext::new(progress, cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
        let result = adapter.recognize(b"%PDF-", &ctx).await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(ResumeError::OcrCancelled)));
        assert_eq!(counters.terminated.load(Ordering::SeqCst), 1);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(ProgressEvent::Ocr(OcrProgress::default())));
    }

    #[tokio::test]
    async fn test_unavailable_adapter_reports_reason() {
        let adapter = OcrAdapter::unavailable("OCR is disabled");
        assert!(!adapter.is_available());
        let result = adapter
            .recognize(b"%PDF-", &ExtractionContext::default())
            .await;
        assert!(matches!(result, Err(ResumeError::OcrUnavailable(_))));
    }

    #[test]
    fn test_disabled_config_builds_unavailable_adapter() {
        let adapter = OcrAdapter::new(&OcrConfig {
            model: "disabled".to_string(),
            ..OcrConfig::default()
        });
        assert!(!adapter.is_available());
    }
}
