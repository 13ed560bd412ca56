//! Resume text extraction for applicant tracking.
//!
//! Uploads go through [`processing::Orchestrator`], which picks a chain of
//! extraction methods by file kind (plain text, Word, direct PDF text, OCR)
//! and always hands back an [`models::ExtractionResult`].

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod processing;
