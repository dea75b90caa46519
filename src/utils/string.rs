//! UTF-8 safe string preview helpers.
//!
//! Chat text is routinely multibyte (Cyrillic, emoji), so log previews must
//! count characters rather than slice by byte index.

/// Number of characters shown when chat text or generated text is logged.
pub const LOG_PREVIEW_CHARS: usize = 50;

/// Return the first `n` characters of `s` as a `String` (no ellipsis).
pub fn prefix_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

/// Return a preview of `s` up to `n` characters. If `s` is longer than `n`
/// characters, the returned string will include a trailing ellipsis `...`.
pub fn preview(s: &str, n: usize) -> String {
    let mut prefix = prefix_chars(s, n);
    if s.chars().count() > n {
        prefix.push_str("...");
    }
    prefix
}

/// Preview of chat or generated text at the standard log length.
pub fn log_preview(s: &str) -> String {
    preview(s, LOG_PREVIEW_CHARS)
}
