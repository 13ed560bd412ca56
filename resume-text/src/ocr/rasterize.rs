use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{ResumeError, Result};

/// One rendered PDF page, PNG encoded. `page_number` is 1-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_number: usize,
    pub png: Vec<u8>,
}

/// Renders the leading pages of a PDF to images.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render at most `max_pages` pages, in page order.
    async fn rasterize(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<PageImage>>;
}

/// Shells out to poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    binary: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.rasterizer.clone(),
            dpi: config.dpi,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8], max_pages: usize) -> Result<Vec<PageImage>> {
        if max_pages == 0 {
            return Ok(Vec::new());
        }

        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let last_page = max_pages.to_string();
        let dpi = self.dpi.to_string();
        let output = Command::new(&self.binary)
            .args(["-png", "-r", &dpi, "-f", "1", "-l", &last_page])
            .arg(&input)
            .arg(workdir.path().join("page"))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ResumeError::OcrUnavailable(format!(
                    "{} not found; install poppler-utils to enable OCR",
                    self.binary
                )),
                _ => ResumeError::Ocr(format!("Failed to run {}: {e}", self.binary)),
            })?;

        if !output.status.success() {
            return Err(ResumeError::Ocr(format!(
                "{} failed: {}",
                self.binary,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let pages = collect_pages(workdir.path(), max_pages).await?;
        debug!(pages = pages.len(), "Rasterized PDF pages");
        Ok(pages)
    }
}

/// pdftoppm names pages `page-N.png`, zero-padded to the width of the
/// document's page count.
fn page_number_from_file_name(name: &str) -> Option<usize> {
    name.strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

async fn collect_pages(dir: &Path, max_pages: usize) -> Result<Vec<PageImage>> {
    let mut numbered = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(page_number) = page_number_from_file_name(&name.to_string_lossy()) {
            numbered.push((page_number, entry.path()));
        }
    }
    numbered.sort_by_key(|(page_number, _)| *page_number);
    numbered.truncate(max_pages);

    let mut pages = Vec::with_capacity(numbered.len());
    for (page_number, path) in numbered {
        pages.push(PageImage {
            page_number,
            png: tokio::fs::read(&path).await?,
        });
    }
    Ok(pages)
}
