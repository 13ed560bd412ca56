use std::env;

/// Uploads above this size are rejected before any byte is read.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Direct PDF text shorter than this is treated as metadata noise and sent to OCR.
pub const DEFAULT_MIN_DIRECT_TEXT_CHARS: usize = 100;
/// Hard cap on stored text, in characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 100_000;
/// An enhanced completion must keep at least this share of the input length.
pub const DEFAULT_ENHANCE_MIN_RATIO: f64 = 0.5;
/// OCR never looks past this page.
pub const DEFAULT_OCR_MAX_PAGES: usize = 5;
/// Word text must be longer than this before enhancement is attempted.
pub const DEFAULT_WORD_ENHANCE_MIN_CHARS: usize = 100;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
    pub ocr: OcrConfig,
    pub llm: Option<LlmConfig>,
    pub enhancement: EnhancementConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Thresholds that drive the orchestrator's method selection.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub max_file_size: u64,
    pub min_direct_text_chars: usize,
    pub max_text_chars: usize,
    pub word_enhance_min_chars: usize,
    /// Read the PDF's embedded text layer before falling back to OCR.
    pub pdf_text_layer: bool,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// `local/tesseract`, or `disabled` to turn OCR off entirely.
    pub model: String,
    pub languages: String,
    /// Binary used to render PDF pages to PNG.
    pub rasterizer: String,
    pub dpi: u32,
    pub max_pages: usize,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

/// LLM configuration for the enhancement model
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct EnhancementConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub min_length_ratio: f64,
    pub max_input_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_direct_text_chars: DEFAULT_MIN_DIRECT_TEXT_CHARS,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            word_enhance_min_chars: DEFAULT_WORD_ENHANCE_MIN_CHARS,
            pdf_text_layer: true,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "local/tesseract".to_string(),
            languages: "eng".to_string(),
            rasterizer: "pdftoppm".to_string(),
            dpi: 300,
            max_pages: DEFAULT_OCR_MAX_PAGES,
            timeout_secs: 120,
            max_image_dimension: 4096,
            min_image_dimension: 50,
        }
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 45,
            min_length_ratio: DEFAULT_ENHANCE_MIN_RATIO,
            max_input_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

impl OcrConfig {
    pub fn is_disabled(&self) -> bool {
        self.model.eq_ignore_ascii_case("disabled") || self.model.eq_ignore_ascii_case("none")
    }
}

impl Default for Config {
    fn default() -> Self {
        let extraction_defaults = ExtractionConfig::default();
        let ocr_defaults = OcrConfig::default();
        let enhancement_defaults = EnhancementConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("RESUME_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("RESUME_PORT", 3000),
            },
            extraction: ExtractionConfig {
                max_file_size: parse_env_or("MAX_FILE_SIZE", extraction_defaults.max_file_size),
                min_direct_text_chars: parse_env_or(
                    "MIN_DIRECT_TEXT_CHARS",
                    extraction_defaults.min_direct_text_chars,
                ),
                max_text_chars: parse_env_or("MAX_TEXT_CHARS", extraction_defaults.max_text_chars),
                word_enhance_min_chars: parse_env_or(
                    "WORD_ENHANCE_MIN_CHARS",
                    extraction_defaults.word_enhance_min_chars,
                ),
                pdf_text_layer: parse_env_or("PDF_TEXT_LAYER", extraction_defaults.pdf_text_layer),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(ocr_defaults.model),
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr_defaults.languages),
                rasterizer: env::var("OCR_RASTERIZER").unwrap_or(ocr_defaults.rasterizer),
                dpi: parse_env_or("OCR_DPI", ocr_defaults.dpi),
                max_pages: parse_env_or("OCR_MAX_PAGES", ocr_defaults.max_pages),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    ocr_defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    ocr_defaults.min_image_dimension,
                ),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
            }),
            enhancement: EnhancementConfig {
                enabled: parse_env_or("ENHANCE_ENABLED", enhancement_defaults.enabled),
                timeout_secs: parse_env_or("ENHANCE_TIMEOUT", enhancement_defaults.timeout_secs),
                min_length_ratio: parse_env_opt::<f64>("ENHANCE_MIN_RATIO")
                    .filter(|ratio| (0.0..=1.0).contains(ratio))
                    .unwrap_or(enhancement_defaults.min_length_ratio),
                max_input_chars: parse_env_or(
                    "ENHANCE_MAX_INPUT_CHARS",
                    enhancement_defaults.max_input_chars,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}
