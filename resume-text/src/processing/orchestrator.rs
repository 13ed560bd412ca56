use std::collections::VecDeque;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::pdf::PdfDirectExtractor;
use super::plain_text::read_as_text;
use super::progress::ExtractionContext;
use super::sanitize::sanitize_with_limit;
use super::word::WordExtractor;
use crate::config::{Config, ExtractionConfig};
use crate::error::{ResumeError, Result};
use crate::llm::{EnhancementClient, LlmProvider};
use crate::models::{
    AttemptOutcome, ExtractionAttempt, ExtractionMethod, ExtractionResult, FileKind, UploadedFile,
};
use crate::ocr::OcrAdapter;

/// One entry of a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PlainText,
    Word,
    PdfDirect,
    Ocr,
}

impl Step {
    pub fn method(self) -> ExtractionMethod {
        match self {
            Step::PlainText => ExtractionMethod::TextFile,
            Step::Word => ExtractionMethod::WordDocument,
            Step::PdfDirect => ExtractionMethod::PdfExtraction,
            Step::Ocr => ExtractionMethod::Ocr,
        }
    }
}

const PDF_CHAIN: &[Step] = &[Step::PdfDirect, Step::Ocr];
const WORD_CHAIN: &[Step] = &[Step::Word];
const TEXT_CHAIN: &[Step] = &[Step::PlainText];

impl FileKind {
    /// Steps tried in order until one succeeds.
    pub fn chain(self) -> &'static [Step] {
        match self {
            FileKind::Pdf => PDF_CHAIN,
            FileKind::Word => WORD_CHAIN,
            FileKind::Text | FileKind::Unknown => TEXT_CHAIN,
        }
    }
}

/// Chooses and sequences extraction methods for one upload.
pub struct Orchestrator {
    config: ExtractionConfig,
    enhancer: EnhancementClient,
    word: WordExtractor,
    pdf: PdfDirectExtractor,
    ocr: OcrAdapter,
}

impl Orchestrator {
    pub fn new(config: &Config) -> Self {
        let provider = LlmProvider::new(config.llm.as_ref());
        let enhancer = EnhancementClient::new(provider, config.enhancement.clone());

        Self::from_parts(
            config.extraction.clone(),
            enhancer,
            PdfDirectExtractor::new(&config.extraction),
            OcrAdapter::new(&config.ocr),
        )
    }

    pub fn from_parts(
        config: ExtractionConfig,
        enhancer: EnhancementClient,
        pdf: PdfDirectExtractor,
        ocr: OcrAdapter,
    ) -> Self {
        Self {
            word: WordExtractor::new(enhancer.clone(), &config),
            config,
            enhancer,
            pdf,
            ocr,
        }
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr.is_available()
    }

    pub fn enhancer(&self) -> &EnhancementClient {
        &self.enhancer
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Warning for the uploader, judged against the configured direct-text
    /// threshold.
    pub fn warning_for(&self, result: &ExtractionResult) -> Option<&'static str> {
        result.warning(self.config.min_direct_text_chars)
    }

    pub async fn extract(&self, file: &UploadedFile) -> Result<ExtractionResult> {
        self.extract_with(file, &ExtractionContext::default()).await
    }

    /// Run the chain for `file`. Only [`ResumeError::FileTooLarge`] is
    /// returned as an error; every other failure ends in a placeholder with
    /// method `failed`.
    pub async fn extract_with(
        &self,
        file: &UploadedFile,
        ctx: &ExtractionContext,
    ) -> Result<ExtractionResult> {
        let kind = file.kind();
        let run_id = Uuid::new_v4();

        if file.size() > self.config.max_file_size {
            warn!(
                %run_id,
                file = %file.name(),
                size = file.size(),
                limit = self.config.max_file_size,
                "Upload rejected"
            );
            return Err(ResumeError::FileTooLarge {
                size: file.size(),
                limit: self.config.max_file_size,
            });
        }

        debug!(%run_id, file = %file.name(), %kind, size = file.size(), "Extraction started");
        let result = self.run_chain(kind, file, ctx).await?;
        info!(
            %run_id,
            file = %file.name(),
            method = %result.method,
            is_pdf = result.is_pdf,
            chars = result.char_count(),
            "Extraction finished"
        );
        Ok(result)
    }

    async fn run_chain(
        &self,
        kind: FileKind,
        file: &UploadedFile,
        ctx: &ExtractionContext,
    ) -> Result<ExtractionResult> {
        let mut is_pdf = kind == FileKind::Pdf;
        let mut queue: VecDeque<Step> = kind.chain().iter().copied().collect();

        while let Some(step) = queue.pop_front() {
            let ExtractionAttempt {
                method,
                text,
                outcome,
            } = self.attempt(step, file, ctx).await;

            match outcome {
                AttemptOutcome::Succeeded => {
                    return Ok(ExtractionResult {
                        text,
                        method,
                        is_pdf,
                    })
                }
                AttemptOutcome::Failed(ResumeError::BinaryDataDetected)
                    if step == Step::PlainText =>
                {
                    info!("Content carries a PDF signature, switching to the PDF chain");
                    is_pdf = true;
                    queue.extend(FileKind::Pdf.chain());
                }
                AttemptOutcome::Failed(e) if !e.is_recoverable() => return Err(e),
                AttemptOutcome::Failed(e) => {
                    warn!(step = ?step, error = %e, "Extraction step failed");
                }
            }
        }

        warn!("All extraction methods failed, storing placeholder");
        Ok(ExtractionResult {
            text: self.placeholder(file),
            method: ExtractionMethod::Failed,
            is_pdf,
        })
    }

    async fn attempt(
        &self,
        step: Step,
        file: &UploadedFile,
        ctx: &ExtractionContext,
    ) -> ExtractionAttempt {
        let outcome = match step {
            Step::PlainText => read_as_text(file, self.config.max_text_chars).await,
            Step::Word => self.word.extract(file, &ctx.progress).await,
            Step::PdfDirect => self.pdf.extract_direct(file).await,
            Step::Ocr => self.ocr_text(file, ctx).await,
        };

        match outcome {
            Ok(text) => ExtractionAttempt::succeeded(step.method(), text),
            Err(e) => ExtractionAttempt::failed(step.method(), e),
        }
    }

    async fn ocr_text(&self, file: &UploadedFile, ctx: &ExtractionContext) -> Result<String> {
        let bytes = file.read_bytes().await?;
        let raw = self.ocr.recognize(&bytes, ctx).await?;
        let enhanced = self.enhancer.enhance(&raw).await;
        let text = sanitize_with_limit(&enhanced, self.config.max_text_chars);

        if text.is_empty() {
            return Err(ResumeError::Ocr("No text recognized".to_string()));
        }
        Ok(text)
    }

    fn placeholder(&self, file: &UploadedFile) -> String {
        let last_modified = file
            .last_modified()
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());

        let block = format!(
            "[Resume text could not be extracted]\n\
             File name: {}\n\
             File size: {} bytes ({:.1} KB)\n\
             Last modified: {}\n\
             Please open the original file to review this resume.",
            file.name(),
            file.size(),
            file.size() as f64 / 1024.0,
            last_modified,
        );
        sanitize_with_limit(&block, self.config.max_text_chars)
    }
}
