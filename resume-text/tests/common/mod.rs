#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use resume_text::config::{EnhancementConfig, ExtractionConfig, LlmConfig};
use resume_text::error::{ResumeError, Result};
use resume_text::llm::{EnhancementClient, LlmProvider};
use resume_text::ocr::{OcrAdapter, OcrEngine, OcrWorker, PageImage, PageRasterizer};
use resume_text::processing::{Orchestrator, PdfDirectExtractor, ProgressEvent, TextLayerSource};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Build a DOCX in memory with docx-rs.
pub fn create_test_docx<F>(builder_fn: F) -> Vec<u8>
where
    F: FnOnce(docx_rs::Docx) -> docx_rs::Docx,
{
    let docx = builder_fn(docx_rs::Docx::new());
    let mut buffer = Cursor::new(Vec::new());
    docx.build().pack(&mut buffer).expect("Failed to pack DOCX");
    buffer.into_inner()
}

/// Counters shared between a fake engine and the workers it hands out.
#[derive(Default)]
pub struct OcrCounters {
    pub created: AtomicUsize,
    pub terminated: AtomicUsize,
    pub recognized: AtomicUsize,
    pub rasterized: AtomicUsize,
}

impl OcrCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn recognized(&self) -> usize {
        self.recognized.load(Ordering::SeqCst)
    }

    pub fn rasterized(&self) -> usize {
        self.rasterized.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Default)]
pub enum WorkerBehavior {
    #[default]
    Succeed,
    FailOnPage(usize),
    Hang,
}

pub struct FakeEngine {
    counters: Arc<OcrCounters>,
    behavior: WorkerBehavior,
}

struct FakeWorker {
    counters: Arc<OcrCounters>,
    behavior: WorkerBehavior,
}

#[async_trait]
impl OcrEngine for FakeEngine {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>> {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeWorker {
            counters: Arc::clone(&self.counters),
            behavior: self.behavior,
        }))
    }
}

#[async_trait]
impl OcrWorker for FakeWorker {
    async fn recognize(&mut self, page: &PageImage) -> Result<String> {
        match self.behavior {
            WorkerBehavior::Hang => std::future::pending::<()>().await,
            WorkerBehavior::FailOnPage(n) if n == page.page_number => {
                return Err(ResumeError::Ocr("engine crashed".to_string()));
            }
            _ => {}
        }
        self.counters.recognized.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Page {} of the scanned resume. Senior Rust engineer with ten years of \
             experience building distributed systems.",
            page.page_number
        ))
    }

    fn terminate(&mut self) {
        self.counters.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Renders `pages` blank pages regardless of the requested cap.
pub struct FakeRasterizer {
    counters: Arc<OcrCounters>,
    pages: usize,
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn rasterize(&self, _pdf: &[u8], _max_pages: usize) -> Result<Vec<PageImage>> {
        self.counters.rasterized.fetch_add(1, Ordering::SeqCst);
        Ok((1..=self.pages)
            .map(|page_number| PageImage {
                page_number,
                png: Vec::new(),
            })
            .collect())
    }
}

pub fn fake_ocr(counters: &Arc<OcrCounters>, pages: usize, behavior: WorkerBehavior) -> OcrAdapter {
    OcrAdapter::with_components(
        Arc::new(FakeEngine {
            counters: Arc::clone(counters),
            behavior,
        }),
        Arc::new(FakeRasterizer {
            counters: Arc::clone(counters),
            pages,
        }),
        5,
        Duration::from_secs(10),
    )
}

/// Text layer that returns a fixed string and counts reads.
pub struct FixedTextLayer {
    pub text: String,
    pub reads: AtomicUsize,
}

impl FixedTextLayer {
    pub fn new(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            text: text.into(),
            reads: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextLayerSource for FixedTextLayer {
    async fn read_text_layer(&self, _pdf: Arc<[u8]>) -> Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Orchestrator with the given PDF text layer and OCR adapter and no LLM.
pub fn orchestrator(text_layer: Option<Arc<dyn TextLayerSource>>, ocr: OcrAdapter) -> Orchestrator {
    orchestrator_with(text_layer, ocr, EnhancementClient::disabled())
}

pub fn orchestrator_with(
    text_layer: Option<Arc<dyn TextLayerSource>>,
    ocr: OcrAdapter,
    enhancer: EnhancementClient,
) -> Orchestrator {
    let config = ExtractionConfig::default();
    Orchestrator::from_parts(
        config.clone(),
        enhancer,
        PdfDirectExtractor::with_text_layer(text_layer, &config),
        ocr,
    )
}

/// Enhancement client pointed at an OpenAI-compatible endpoint, with no retries.
pub fn enhancer_for(base_url: String) -> EnhancementClient {
    let llm = LlmConfig {
        model: "openai/gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        timeout_secs: 1,
        max_retries: 0,
    };
    EnhancementClient::new(
        LlmProvider::new(Some(&llm)),
        EnhancementConfig {
            timeout_secs: 5,
            ..EnhancementConfig::default()
        },
    )
}

pub fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o-mini",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
