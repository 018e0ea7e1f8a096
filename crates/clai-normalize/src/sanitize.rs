use clai_types::MAX_CMD_RAW_BYTES;

/// Pre-normalize raw bytes from the wire: lossy UTF-8 decode, strip control
/// characters except tab, trim outer whitespace, cap at the raw size limit.
/// Returns the sanitized text and whether the cap truncated it.
pub fn sanitize_raw(raw: &[u8]) -> (String, bool) {
    let decoded = String::from_utf8_lossy(raw);

    let mut cleaned = String::with_capacity(decoded.len().min(MAX_CMD_RAW_BYTES));
    let mut truncated = false;

    for ch in decoded.chars() {
        if ch.is_control() && ch != '\t' {
            continue;
        }
        if cleaned.len() + ch.len_utf8() > MAX_CMD_RAW_BYTES {
            truncated = true;
            break;
        }
        cleaned.push(ch);
    }

    (cleaned.trim().to_string(), truncated)
}

/// Collapse interior runs of spaces and tabs into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}
