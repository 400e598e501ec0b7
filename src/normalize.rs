//! Newline stripping for platforms that turn every newline into `<br />`.
//!
//! Text inside `<pre>` and `<code>` regions is kept byte for byte; newlines
//! everywhere else are deleted.

use crate::error::{QuillError, Result};
use regex::Regex;
use tracing::debug;

/// Opening or closing `pre`/`code` tag. `.` stops at line ends, so a tag
/// spread over several lines is not a marker.
const MARKER_PATTERN: &str = r"<pre(?:\s.*?)?>|</pre>|<code(?:\s.*?)?>|</code>";

/// Preformatted regions open at the current scan position
#[derive(Debug, Default)]
struct ScanSpan<'a> {
    open: Vec<&'a str>,
}

impl<'a> ScanSpan<'a> {
    fn is_preformatted(&self) -> bool {
        !self.open.is_empty()
    }

    fn enter(&mut self, tag: &'a str) {
        self.open.push(tag);
    }

    fn leave(&mut self, tag: &str, position: usize) -> Result<()> {
        self.open
            .pop()
            .map(|_| ())
            .ok_or_else(|| QuillError::UnbalancedMarkup {
                tag: tag.to_string(),
                position,
            })
    }
}

/// Removes newlines outside of preformatted regions.
///
/// # Errors
///
/// Returns `QuillError::UnbalancedMarkup` when a closing tag appears with
/// no region open.
pub fn normalize(html: &str) -> Result<String> {
    let markers = Regex::new(MARKER_PATTERN)?;
    let mut span = ScanSpan::default();
    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;

    for marker in markers.find_iter(html) {
        push_chunk(&mut output, &html[cursor..marker.start()], &span);

        let tag = marker.as_str();
        output.push_str(tag);
        if tag.starts_with("</") {
            span.leave(tag, marker.start())?;
        } else {
            span.enter(tag);
        }
        cursor = marker.end();
    }
    push_chunk(&mut output, &html[cursor..], &span);

    if span.is_preformatted() {
        debug!(open = ?span.open, "preformatted regions left open at end of document");
    }

    Ok(output)
}

fn push_chunk(output: &mut String, chunk: &str, span: &ScanSpan<'_>) {
    if span.is_preformatted() {
        output.push_str(chunk);
    } else {
        output.extend(chunk.chars().filter(|&c| c != '\n'));
    }
}
