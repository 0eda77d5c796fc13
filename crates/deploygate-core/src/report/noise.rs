//! Cleanup of raw CLI stdout before parsing.
//!
//! The deploy CLI prints colour codes and update warnings ahead of its JSON
//! document when stdout is captured in CI.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    /// ANSI CSI escape sequences (colours, cursor movement)
    static ref ANSI_ESCAPE: Regex = Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap();

    /// First line that opens a JSON object
    static ref JSON_START: Regex = Regex::new(r"(?m)^[ \t]*\{").unwrap();
}

/// Strip ANSI escapes and any lines preceding the JSON document.
///
/// Text that never opens an object is returned unchanged (minus escapes) so
/// that parsing still fails on it.
pub fn strip_cli_noise(output: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.replace_all(output, "") {
        Cow::Borrowed(text) => Cow::Borrowed(trim_to_document(text)),
        Cow::Owned(text) => Cow::Owned(trim_to_document(&text).to_string()),
    }
}

fn trim_to_document(text: &str) -> &str {
    JSON_START
        .find(text)
        .map_or(text, |start| &text[start.start()..])
}
