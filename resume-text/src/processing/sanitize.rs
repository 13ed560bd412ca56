use crate::config::DEFAULT_MAX_TEXT_CHARS;

/// Normalise extracted text for storage with the default length cap.
pub fn sanitize(raw: &str) -> String {
    sanitize_with_limit(raw, DEFAULT_MAX_TEXT_CHARS)
}

/// Strip control characters, collapse whitespace runs to one space, trim,
/// and cap the result at `max_chars` characters.
///
/// Whitespace controls (newline, tab, form feed and friends) act as
/// separators so neighbouring words never fuse. Idempotent.
pub fn sanitize_with_limit(raw: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(raw.len().min(max_chars.saturating_mul(4)));
    let mut chars = 0usize;
    let mut pending_space = false;

    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space {
            if chars == max_chars {
                break;
            }
            out.push(' ');
            chars += 1;
            pending_space = false;
        }
        if chars == max_chars {
            break;
        }
        out.push(c);
        chars += 1;
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}
