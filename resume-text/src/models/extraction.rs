use serde::{Deserialize, Serialize};

use crate::error::ResumeError;

/// Which strategy ultimately produced the stored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    TextFile,
    WordDocument,
    PdfExtraction,
    Ocr,
    Failed,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextFile => write!(f, "text_file"),
            Self::WordDocument => write!(f, "word_document"),
            Self::PdfExtraction => write!(f, "pdf_extraction"),
            Self::Ocr => write!(f, "ocr"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExtractionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text_file" => Ok(Self::TextFile),
            "word_document" => Ok(Self::WordDocument),
            "pdf_extraction" => Ok(Self::PdfExtraction),
            "ocr" => Ok(Self::Ocr),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown extraction method: {other}")),
        }
    }
}

/// File type as declared by the uploader (MIME type or extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Pdf,
    Word,
    Text,
    Unknown,
}

const WORD_MIME_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-word.document.macroenabled.12",
];

impl FileKind {
    pub fn from_declared(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if mime == "application/pdf" || extension == "pdf" {
            return Self::Pdf;
        }
        if WORD_MIME_TYPES.contains(&mime.as_str())
            || matches!(extension.as_str(), "docx" | "doc")
        {
            return Self::Word;
        }
        if mime == "text/plain" || extension == "txt" {
            return Self::Text;
        }
        Self::Unknown
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Word => write!(f, "word"),
            Self::Text => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(ResumeError),
}

/// One try of one method against one file. Never persisted.
#[derive(Debug)]
pub struct ExtractionAttempt {
    pub method: ExtractionMethod,
    pub text: String,
    pub outcome: AttemptOutcome,
}

impl ExtractionAttempt {
    pub fn succeeded(method: ExtractionMethod, text: String) -> Self {
        Self {
            method,
            text,
            outcome: AttemptOutcome::Succeeded,
        }
    }

    pub fn failed(method: ExtractionMethod, error: ResumeError) -> Self {
        Self {
            method,
            text: String::new(),
            outcome: AttemptOutcome::Failed(error),
        }
    }
}

/// The only artifact handed to the persistence layer.
///
/// `text` has always been through the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub is_pdf: bool,
}

impl ExtractionResult {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Non-blocking warning the caller should show next to the submission.
    /// `min_chars` is the configured direct-text threshold.
    pub fn warning(&self, min_chars: usize) -> Option<&'static str> {
        if self.method == ExtractionMethod::Failed {
            Some("Resume text could not be extracted; reviewers will need to open the original file.")
        } else if self.char_count() < min_chars {
            Some("Very little text was extracted from this resume; consider uploading a text-based PDF or Word document.")
        } else {
            None
        }
    }
}

/// Transient OCR state for the UI. Reset to `0/false` when a recognition call ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrProgress {
    pub percent: u8,
    pub processing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_snake_case() {
        let json = serde_json::to_string(&ExtractionMethod::PdfExtraction).unwrap();
        assert_eq!(json, "\"pdf_extraction\"");
        assert_eq!(
            "word_document".parse::<ExtractionMethod>().unwrap(),
            ExtractionMethod::WordDocument
        );
        assert!("scan".parse::<ExtractionMethod>().is_err());
    }

    #[test]
    fn test_result_serializes_is_pdf_camel_case() {
        let result = ExtractionResult {
            text: "Jane Doe".to_string(),
            method: ExtractionMethod::Ocr,
            is_pdf: true,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isPdf"], true);
        assert_eq!(value["method"], "ocr");
    }

    #[test]
    fn test_file_kind_from_mime_and_extension() {
        assert_eq!(FileKind::from_declared("application/pdf", "cv"), FileKind::Pdf);
        assert_eq!(
            FileKind::from_declared("application/octet-stream", "CV.PDF"),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::from_declared(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "resume"
            ),
            FileKind::Word
        );
        assert_eq!(FileKind::from_declared("", "resume.doc"), FileKind::Word);
        assert_eq!(
            FileKind::from_declared("text/plain; charset=utf-8", "resume"),
            FileKind::Text
        );
        assert_eq!(FileKind::from_declared("", "resume.txt"), FileKind::Text);
        assert_eq!(
            FileKind::from_declared("application/rtf", "resume.rtf"),
            FileKind::Unknown
        );
    }

    #[test]
    fn test_warning_for_failed_and_short_results() {
        let failed = ExtractionResult {
            text: "placeholder".repeat(20),
            method: ExtractionMethod::Failed,
            is_pdf: false,
        };
        assert!(failed.warning(100).is_some());

        let short = ExtractionResult {
            text: "Jane Doe".to_string(),
            method: ExtractionMethod::TextFile,
            is_pdf: false,
        };
        assert!(short.warning(100).is_some());
        assert!(short.warning(8).is_none());

        let fine = ExtractionResult {
            text: "x".repeat(100),
            method: ExtractionMethod::TextFile,
            is_pdf: false,
        };
        assert!(fine.warning(100).is_none());
        assert!(fine.warning(101).is_some());
    }
}
