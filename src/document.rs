use crate::error::{QuillError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Line separating the header block from the body
pub const SEPARATOR: &str = "\n---\n";

/// Header metadata of a source document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap(HashMap<String, String>);

impl HeaderMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of a header, exactly as written after the colon
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The `title` header with surrounding whitespace removed
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.get("title").map(str::trim)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Splits a raw source document into its headers and body.
///
/// Everything before the first `---` line is `key:value` metadata; the
/// body after it is returned untouched.
///
/// # Errors
///
/// Returns `QuillError::Format` if the separator is missing or a non-blank
/// header line has no colon.
pub fn split(raw: &str) -> Result<(HeaderMap, &str)> {
    let Some((header_block, body)) = raw.split_once(SEPARATOR) else {
        return Err(QuillError::Format {
            message: "missing header/body separator (a `---` line between headers and content)"
                .to_string(),
        });
    };

    Ok((parse_headers(header_block)?, body))
}

fn parse_headers(block: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (index, line) in block.split('\n').enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(QuillError::Format {
                message: format!("malformed header line {}: `{line}`", index + 1),
            });
        };
        headers.insert(key.trim(), value);
    }

    Ok(headers)
}
