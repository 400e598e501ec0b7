use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for quillpost operations
#[derive(Error, Debug)]
pub enum QuillError {
    /// IO error when reading files or talking to a subprocess
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// File not found error with specific path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Include name resolved outside of its search directory
    #[error("Path traversal detected (include escapes its search directory): {path}")]
    PathTraversal { path: PathBuf },

    /// Malformed source document
    #[error("Format error: {message}")]
    Format { message: String },

    /// Template syntax error
    #[error("Template parsing error on line {line}: {message}")]
    TemplateParse { line: usize, message: String },

    /// Code directive names a language without a registered syntax
    #[error("Unknown language `{language}` in code directive on line {line}")]
    UnknownLanguage { language: String, line: usize },

    /// Include could not be resolved against any include directory
    #[error("Template not found: {name} (searched: {searched})")]
    TemplateNotFound { name: String, searched: String },

    /// Shell directive could not be launched or its pipes failed
    #[error("Shell directive `{command}` on line {line} failed: {source}")]
    ShellExecution {
        command: String,
        line: usize,
        #[source]
        source: io::Error,
    },

    /// Syntax highlighter failed on otherwise valid input
    #[error("Highlighting `{language}` failed: {message}")]
    Highlight { language: String, message: String },

    /// Closing `</pre>` or `</code>` without a matching opening tag
    #[error("Unbalanced `{tag}` at byte {position}")]
    UnbalancedMarkup { tag: String, position: usize },

    /// Posting requires a `title` header
    #[error("Missing `title` header (required for posting)")]
    MissingTitle,

    /// No blog with the requested title
    #[error("No blog titled `{title}`")]
    BlogNotFound { title: String },

    /// Posts with the same title exist and updating was not requested
    #[error("{count} post(s) titled `{title}` already exist. Use --update if you want to replace it")]
    DuplicatePost { title: String, count: usize },

    /// No access token for the blog service
    #[error("No access token given. Use --token, BLOGGER_ACCESS_TOKEN or a `token:` line in the config file")]
    MissingToken,

    /// HTTP request failed (network error, timeout, etc)
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] ureq::Error),

    /// Server answered with an error status
    #[error("HTTP error: {status} - {body}")]
    HttpResponse { status: u16, body: String },

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any of the above, attributed to a source file
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<QuillError>,
    },
}

impl QuillError {
    /// Innermost error, looking through `InFile` wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuillError::FileNotFound {
            path: PathBuf::from("/test/file.txt"),
        };
        assert_eq!(format!("{err}"), "File not found: /test/file.txt");

        let err = QuillError::Format {
            message: "missing header/body separator".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Format error: missing header/body separator"
        );

        let err = QuillError::UnknownLanguage {
            language: "klingon".to_string(),
            line: 7,
        };
        assert_eq!(
            format!("{err}"),
            "Unknown language `klingon` in code directive on line 7"
        );

        let err = QuillError::TemplateParse {
            line: 3,
            message: "unclosed `shell` directive".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Template parsing error on line 3: unclosed `shell` directive"
        );

        let err = QuillError::DuplicatePost {
            title: "Hello".to_string(),
            count: 2,
        };
        assert!(format!("{err}").contains("--update"));
    }

    #[test]
    fn test_in_file_wrapping() {
        let err = QuillError::MissingTitle.in_file("posts/hello.txt");
        assert_eq!(
            format!("{err}"),
            "posts/hello.txt: Missing `title` header (required for posting)"
        );
        assert!(matches!(err.root(), QuillError::MissingTitle));

        let nested = err.in_file("outer.txt");
        assert!(matches!(nested.root(), QuillError::MissingTitle));
    }

    #[test]
    fn test_shell_error_keeps_source() {
        let err = QuillError::ShellExecution {
            command: "nope".to_string(),
            line: 1,
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no such file"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err: QuillError = io_err.into();
        assert!(matches!(err, QuillError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: QuillError = json_err.into();
        assert!(matches!(err, QuillError::Json(_)));
    }
}
