//! Log helpers for post bodies, which are multi-line and can be very long.

/// Cap on characters shown for a body in a log line.
pub const BODY_PREVIEW_CHARS: usize = 120;

/// Single-line, bounded rendering of user text for logs.
/// Newlines, tabs, carriage returns and backslashes are escaped, other control
/// characters become `\xNN`, and anything past `max_chars` is cut with `…`.
pub fn preview(s: &str, max_chars: usize) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(s.len().min(max_chars) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= max_chars {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// [`preview`] with the default body cap.
pub fn body_preview(body: &str) -> String {
    preview(body, BODY_PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_and_truncates() {
        assert_eq!(preview("@Jane\nDoe\t!", 50), "@Jane\\nDoe\\t!");
        assert_eq!(preview("abcdef", 3), "abc…");
        assert_eq!(preview("a\u{7}b", 10), "a\\x07b");
    }
}
