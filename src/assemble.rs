use crate::document::HeaderMap;
use crate::error::{QuillError, Result};
use crate::template::{ExpanderConfig, Variables, expand};
use serde::Serialize;

/// Where an artifact is headed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Printed or saved locally
    Local,
    /// Submitted to the blog service
    Post,
}

/// Final output of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedArtifact {
    pub headers: HeaderMap,
    pub body: String,
}

impl RenderedArtifact {
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.headers.title()
    }
}

/// Builds the artifact for a rendered document.
///
/// With a base template, the body's newlines become `<br />` and the
/// template is expanded with `title` and `content`. Without one, the body
/// is used as is.
///
/// # Errors
///
/// - `QuillError::MissingTitle` when posting a document without a `title`.
/// - Any expansion error from the base template.
pub fn assemble(
    headers: HeaderMap,
    normalized_body: &str,
    base_template: Option<&str>,
    destination: Destination,
    config: &ExpanderConfig,
) -> Result<RenderedArtifact> {
    if destination == Destination::Post && headers.title().is_none() {
        return Err(QuillError::MissingTitle);
    }

    let body = match base_template {
        Some(template) => {
            let mut variables = Variables::new();
            if let Some(title) = headers.get("title") {
                variables.insert("title".to_string(), title.to_string());
            }
            variables.insert(
                "content".to_string(),
                normalized_body.replace('\n', "<br />"),
            );
            expand(template, &variables, config)?
        }
        None => normalized_body.to_string(),
    };

    Ok(RenderedArtifact { headers, body })
}
