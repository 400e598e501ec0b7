//! Syntax highlighting for `code` directives.

use crate::error::{QuillError, Result};
use syntect::html::{ClassStyle, line_tokens_to_classed_spans};
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// CSS class wrapped around emphasized lines
pub const EMPHASIS_CLASS: &str = "hll";

/// Pygments lexer names with no matching syntect token, and the syntax
/// each one maps to
const LEXER_ALIASES: &[(&str, &str)] = &[
    ("text", "Plain Text"),
    ("plain", "Plain Text"),
    ("console", "Bourne Again Shell (bash)"),
    ("shell-session", "Bourne Again Shell (bash)"),
    ("pycon", "Python"),
    ("python3", "Python"),
    ("py3", "Python"),
    ("golang", "Go"),
];

/// Syntax highlighter producing class-annotated HTML
#[derive(Debug, Clone)]
pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Whether `language` (a name, file extension or lexer alias) has a
    /// syntax.
    #[must_use]
    pub fn supports(&self, language: &str) -> bool {
        self.find(language).is_some()
    }

    fn find(&self, language: &str) -> Option<&SyntaxReference> {
        LEXER_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(language))
            .and_then(|(_, name)| self.syntaxes.find_syntax_by_name(name))
            .or_else(|| self.syntaxes.find_syntax_by_token(language))
    }

    /// Highlights `code` as `language`.
    ///
    /// The output is `<div class="code LANGUAGE"><pre>…</pre></div>`. Each
    /// 1-based line number in `emphasized` is wrapped in a
    /// `<span class="hll">`. Every line closes the scope spans it has open
    /// and the next line reopens them, so emphasis spans nest cleanly.
    ///
    /// # Errors
    ///
    /// - `QuillError::UnknownLanguage` if there is no syntax for `language`.
    /// - `QuillError::Highlight` if `syntect` fails while parsing.
    pub fn highlight(&self, language: &str, emphasized: &[usize], code: &str) -> Result<String> {
        let syntax = self
            .find(language)
            .ok_or_else(|| QuillError::UnknownLanguage {
                language: language.to_string(),
                line: 0,
            })?;
        let failed = |e: &dyn std::fmt::Display| QuillError::Highlight {
            language: language.to_string(),
            message: e.to_string(),
        };

        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut html = String::with_capacity(code.len() * 4);
        html.push_str(&format!("<div class=\"code {language}\"><pre>"));

        for (index, line) in LinesWithEndings::from(code).enumerate() {
            let ops = state
                .parse_line(line, &self.syntaxes)
                .map_err(|e| failed(&e))?;

            let emphasize = emphasized.contains(&(index + 1));
            if emphasize {
                html.push_str(&format!("<span class=\"{EMPHASIS_CLASS}\">"));
            }
            for scope in stack.as_slice() {
                html.push_str(&format!(
                    "<span class=\"{}\">",
                    scope.build_string().replace('.', " ")
                ));
            }
            let (spans, _) = line_tokens_to_classed_spans(line, &ops, ClassStyle::Spaced, &mut stack)
                .map_err(|e| failed(&e))?;
            html.push_str(&spans);
            for _ in 0..stack.len() {
                html.push_str("</span>");
            }
            if emphasize {
                html.push_str("</span>");
            }
        }

        html.push_str("</pre></div>\n");
        Ok(html)
    }
}
