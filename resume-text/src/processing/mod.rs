mod orchestrator;
mod pdf;
mod plain_text;
mod progress;
mod sanitize;
mod word;

pub use orchestrator::{Orchestrator, Step};
pub use pdf::{PdfDirectExtractor, PdfExtractTextLayer, TextLayerSource};
pub use plain_text::read_as_text;
pub use progress::{ExtractionContext, ProgressEvent, ProgressReporter};
pub use sanitize::{sanitize, sanitize_with_limit};
pub use word::{convert_to_text, WordExtractor};
