//! OCR fallback for image-only PDFs.
//!
//! # Architecture
//!
//! - `PageRasterizer` renders the leading pages of a PDF (`pdftoppm` by default)
//! - `OcrEngine` hands out an `OcrWorker` per call (Tesseract through leptess)
//! - `OcrAdapter` drives one recognition call: page cap, progress,
//!   cancellation, timeout, and worker release on every exit path
//!
//! # Configuration
//!
//! Controlled via `OcrConfig` (see `config.rs`):
//! - `model`: `local/tesseract`, or `disabled`
//! - `languages`: Tesseract language codes, `+` separated
//! - `rasterizer` / `dpi`: page rendering
//! - `max_pages`: pages past this are never rendered or recognized
//! - `timeout_secs`: bound on the whole call

mod adapter;
mod engine;
mod preprocessing;
mod rasterize;

pub use adapter::OcrAdapter;
pub use engine::{OcrEngine, OcrWorker, TesseractEngine};
pub use preprocessing::preprocess_page;
pub use rasterize::{PageImage, PageRasterizer, PdftoppmRasterizer};
