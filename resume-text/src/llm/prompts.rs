//! Prompt templates for resume text enhancement
//!
//! Plain `format!()` interpolation, so a missing variable is a compile error.

/// System prompt for the enhancement call.
pub const RESUME_ENHANCEMENT_SYSTEM_PROMPT: &str = "You are a meticulous resume text editor. \
You receive text extracted from a resume by OCR or document conversion. \
Return only the corrected resume text, with no commentary, no markdown fences and no preamble.";

/// Generate the user prompt for cleaning up extracted resume text
///
/// Asks the model to repair recognition errors and normalise section headers
/// while keeping every piece of information.
///
/// # Example
/// ```
/// use resume_text::llm::prompts::resume_enhancement_prompt;
///
/// let prompt = resume_enhancement_prompt("EXPER1ENCE\nAcme Corp 2019-2023");
/// assert!(prompt.contains("Acme Corp"));
/// ```
pub fn resume_enhancement_prompt(raw_text: &str) -> String {
    format!(
        r#"Clean up the following resume text.

Rules:
- Fix character recognition errors (for example "0" read as "O", "1" read as "l", split or merged words)
- Detect resume section headers (Summary, Experience, Education, Skills, Certifications, Projects, Languages) and put each on its own line in a consistent form
- Keep ALL information: names, contact details, dates, employers, titles, degrees, skills
- Do not summarise, reorder sections, translate, or invent content
- Output plain text only

Resume text:
{raw_text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_raw_text_verbatim() {
        let raw = "J0hn Doe | john@example.com\nSKlLLS: Rust, SQL";
        let prompt = resume_enhancement_prompt(raw);
        assert!(prompt.ends_with(raw));
        assert!(prompt.contains("Keep ALL information"));
    }

    #[test]
    fn test_system_prompt_forbids_commentary() {
        assert!(RESUME_ENHANCEMENT_SYSTEM_PROMPT.contains("no commentary"));
    }
}
