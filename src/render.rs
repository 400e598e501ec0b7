//! Source document → normalized HTML.

use crate::document::{HeaderMap, split};
use crate::error::Result;
use crate::fs_utils::read_file_contents;
use crate::normalize::normalize;
use crate::template::{ExpanderConfig, Variables, expand};
use std::path::Path;
use tracing::debug;

/// Headers and rendered, normalized body of a source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub headers: HeaderMap,
    pub body: String,
}

/// Splits, expands and normalizes a source document.
///
/// # Errors
///
/// Any error from splitting, expansion or normalization; nothing is
/// rendered partially.
pub fn render_source(raw: &str, config: &ExpanderConfig) -> Result<RenderedDocument> {
    let (headers, body) = split(raw)?;
    debug!(headers = headers.len(), body_bytes = body.len(), "split source document");

    let expanded = expand(body, &Variables::new(), config)?;
    let body = normalize(&expanded)?;
    debug!(bytes = body.len(), "rendered body");

    Ok(RenderedDocument { headers, body })
}

/// Reads and renders a source file.
///
/// # Errors
///
/// Same as [`render_source`], plus read failures, each wrapped in
/// `QuillError::InFile` naming `path`.
pub fn render_file(path: &Path, config: &ExpanderConfig) -> Result<RenderedDocument> {
    debug!(path = %path.display(), "rendering source file");
    read_file_contents(path)
        .and_then(|raw| render_source(&raw, config))
        .map_err(|e| e.in_file(path))
}
