//! # quillpost
//!
//! A library and CLI tool for writing blog posts as plain text files with
//! syntax-highlighted code and captured shell output, rendered to compact
//! HTML and published to Blogger.
//!
//! ## Features
//!
//! - Source documents with `name: value` headers, a `---` line, then the body
//! - `{% code "lang", [2, 3] %}...{% endcode %}` highlighted code blocks
//! - `{% shell ["cmd", "arg"] %}stdin{% endshell %}` captured command output
//! - `{{ var }}`, `{# comments #}`, `{% include "file" %}` and `{% raw %}`
//! - Newlines removed outside `<pre>`/`<code>` regions
//! - Create-or-update publishing through the Blogger v3 API
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use quillpost::{Destination, ExpanderConfig, assemble, render_source};
//!
//! let source = "title: Hello\n---\n<p>Today:</p>\n{% shell 'date' %}{% endshell %}\n";
//! let config = ExpanderConfig::default();
//!
//! match render_source(source, &config)
//!     .and_then(|doc| assemble(doc.headers, &doc.body, None, Destination::Local, &config))
//! {
//!     Ok(artifact) => println!("{}", artifact.body),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Render a post to stdout
//! quillpost render post.txt
//!
//! # Render inside a base template
//! quillpost render post.txt -t base.html
//!
//! # Publish as a draft, replacing an earlier version
//! quillpost post post.txt -b "My Blog" --draft --update
//! ```

pub mod assemble;
pub mod blogger;
pub mod config;
pub mod directive;
pub mod document;
pub mod error;
pub mod fs_utils;
pub mod highlight;
pub mod normalize;
pub mod publish;
pub mod render;
pub mod shell;
pub mod template;

// Re-export main types and functions for convenience
pub use assemble::{Destination, RenderedArtifact, assemble};
pub use blogger::{Blog, BlogService, BloggerClient, PostHandle, PostSummary};
pub use config::RcConfig;
pub use document::{HeaderMap, split};
pub use error::{QuillError, Result};
pub use highlight::Highlighter;
pub use normalize::normalize;
pub use publish::{PublishAction, PublishOptions, PublishOutcome, find_blog, publish};
pub use render::{RenderedDocument, render_file, render_source};
pub use template::{ExpanderConfig, Variables, expand};
