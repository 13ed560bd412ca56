use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{ExtractionMethod, OcrProgress};

/// Advisory progress, for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Ocr(OcrProgress),
    Step { method: ExtractionMethod, percent: u8 },
}

/// Side channel for progress events. Sending never blocks and a dropped
/// receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn ocr(&self, percent: u8, processing: bool) {
        self.send(ProgressEvent::Ocr(OcrProgress {
            percent: percent.min(100),
            processing,
        }));
    }

    pub fn step(&self, method: ExtractionMethod, percent: u8) {
        self.send(ProgressEvent::Step {
            method,
            percent: percent.min(100),
        });
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Per-run context threaded through every extraction step.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub progress: ProgressReporter,
    pub cancel: CancellationToken,
}

impl ExtractionContext {
    pub fn new(progress: ProgressReporter, cancel: CancellationToken) -> Self {
        Self { progress, cancel }
    }
}
