//! Block directives: `{% code %}` and `{% shell %}`.
//!
//! A directive has an opening tag with literal arguments, a body, and a
//! closing `end<name>` tag. Each [`DirectiveKind`] maps to one executor.

use crate::error::{QuillError, Result};
use crate::shell;
use crate::template::{ExpanderConfig, Segment, Variables};
use tracing::debug;

/// The directive kinds the template language knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// Syntax-highlighted code block
    Code,
    /// Output of a shell command fed with the body
    Shell,
}

impl DirectiveKind {
    pub const ALL: [Self; 2] = [Self::Code, Self::Shell];

    /// Opening tag name
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Shell => "shell",
        }
    }

    /// Closing tag name
    #[must_use]
    pub const fn end_tag(self) -> &'static str {
        match self {
            Self::Code => "endcode",
            Self::Shell => "endshell",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    #[must_use]
    pub fn from_end_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.end_tag() == tag)
    }

    /// Builds the invocation from the opening tag's argument text.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::TemplateParse` when the arguments don't fit the
    /// directive, or `QuillError::UnknownLanguage` for a `code` block whose
    /// language has no syntax.
    pub fn parse_invocation(
        self,
        arguments: &str,
        line: usize,
        config: &ExpanderConfig,
    ) -> Result<Directive> {
        let bad = |message: String| QuillError::TemplateParse { line, message };
        let values = parse_args(arguments).map_err(bad)?;

        match self {
            Self::Code => {
                let mut values = values.into_iter();
                let language = match values.next() {
                    Some(ArgValue::Str(language)) => language,
                    _ => {
                        return Err(bad(
                            "`code` needs a language name as its first argument".to_string(),
                        ));
                    }
                };
                let highlight_lines = match values.next() {
                    None => Vec::new(),
                    Some(ArgValue::List(items)) => items
                        .into_iter()
                        .map(|item| match item {
                            ArgValue::Int(n) => Ok(n),
                            _ => Err(bad("`code` highlight lines must be integers".to_string())),
                        })
                        .collect::<Result<_>>()?,
                    Some(_) => {
                        return Err(bad(
                            "`code` takes a list of line numbers as its second argument"
                                .to_string(),
                        ));
                    }
                };
                if values.next().is_some() {
                    return Err(bad("`code` takes at most two arguments".to_string()));
                }
                if !config.highlighter.supports(&language) {
                    return Err(QuillError::UnknownLanguage { language, line });
                }
                Ok(Directive::Code {
                    language,
                    highlight_lines,
                })
            }
            Self::Shell => {
                let command = match <[ArgValue; 1]>::try_from(values) {
                    Ok([ArgValue::Str(program)]) => vec![program],
                    Ok([ArgValue::List(items)]) if !items.is_empty() => items
                        .into_iter()
                        .map(|item| match item {
                            ArgValue::Str(s) => Ok(s),
                            _ => Err(bad("`shell` command parts must be strings".to_string())),
                        })
                        .collect::<Result<_>>()?,
                    _ => {
                        return Err(bad(
                            "`shell` takes one argument: a command string or a list of strings \
                             such as `[\"sort\", \"-r\"]`"
                                .to_string(),
                        ));
                    }
                };
                Ok(Directive::Shell { command })
            }
        }
    }
}

/// A parsed directive invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Code {
        language: String,
        /// 1-based line numbers to emphasize
        highlight_lines: Vec<usize>,
    },
    Shell {
        /// Program followed by its arguments
        command: Vec<String>,
    },
}

impl Directive {
    #[must_use]
    pub const fn kind(&self) -> DirectiveKind {
        match self {
            Self::Code { .. } => DirectiveKind::Code,
            Self::Shell { .. } => DirectiveKind::Shell,
        }
    }
}

/// A directive with its body, as found in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveBlock {
    pub directive: Directive,
    pub body: Vec<Segment>,
    /// Line of the opening tag
    pub line: usize,
}

type Executor = fn(&Directive, &str, usize, &ExpanderConfig) -> Result<String>;

fn executor(kind: DirectiveKind) -> Executor {
    match kind {
        DirectiveKind::Code => execute_code,
        DirectiveKind::Shell => execute_shell,
    }
}

impl DirectiveBlock {
    /// Resolves variables in the body, then runs the directive on it.
    ///
    /// # Errors
    ///
    /// Whatever the kind's executor reports (`UnknownLanguage`,
    /// `Highlight` or `ShellExecution`).
    pub fn execute(&self, variables: &Variables, config: &ExpanderConfig) -> Result<String> {
        let body = crate::template::render_segments(&self.body, variables);
        debug!(
            kind = self.directive.kind().tag(),
            line = self.line,
            body_bytes = body.len(),
            "executing directive"
        );
        executor(self.directive.kind())(&self.directive, &body, self.line, config)
    }
}

fn execute_code(
    directive: &Directive,
    body: &str,
    line: usize,
    config: &ExpanderConfig,
) -> Result<String> {
    let Directive::Code {
        language,
        highlight_lines,
    } = directive
    else {
        return Err(QuillError::TemplateParse {
            line,
            message: "`code` executor called for another directive".to_string(),
        });
    };

    config
        .highlighter
        .highlight(language, highlight_lines, body)
        .map_err(|e| match e {
            QuillError::UnknownLanguage { language, .. } => {
                QuillError::UnknownLanguage { language, line }
            }
            other => other,
        })
}

fn execute_shell(
    directive: &Directive,
    body: &str,
    line: usize,
    _config: &ExpanderConfig,
) -> Result<String> {
    let Directive::Shell { command } = directive else {
        return Err(QuillError::TemplateParse {
            line,
            message: "`shell` executor called for another directive".to_string(),
        });
    };

    shell::run(command, body).map_err(|source| QuillError::ShellExecution {
        command: command.join(" "),
        line,
        source,
    })
}

/// Literal argument of a directive or `include` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Int(usize),
    List(Vec<ArgValue>),
}

/// Parses a comma-separated list of literals: quoted strings, integers
/// and bracketed lists of those.
///
/// # Errors
///
/// Returns a description of the first malformed argument.
pub fn parse_args(text: &str) -> std::result::Result<Vec<ArgValue>, String> {
    let mut parser = ArgParser {
        chars: text.chars().peekable(),
    };
    let values = parser.sequence(None)?;
    Ok(values)
}

struct ArgParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl ArgParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    /// Values separated by commas, up to `close` (or end of input).
    fn sequence(&mut self, close: Option<char>) -> std::result::Result<Vec<ArgValue>, String> {
        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            match (self.chars.peek().copied(), close) {
                (None, None) => return Ok(values),
                (None, Some(c)) => return Err(format!("missing closing `{c}`")),
                (Some(c), Some(expected)) if c == expected => {
                    self.chars.next();
                    return Ok(values);
                }
                _ => {}
            }

            values.push(self.value()?);

            self.skip_whitespace();
            match (self.chars.peek().copied(), close) {
                (Some(','), _) => {
                    self.chars.next();
                }
                (None, None) => return Ok(values),
                (Some(c), Some(expected)) if c == expected => {}
                (None, Some(c)) => return Err(format!("missing closing `{c}`")),
                (Some(c), _) => return Err(format!("unexpected `{c}` between arguments")),
            }
        }
    }

    fn value(&mut self) -> std::result::Result<ArgValue, String> {
        match self.chars.next() {
            Some(quote @ ('"' | '\'')) => self.string(quote).map(ArgValue::Str),
            Some('[') => self.sequence(Some(']')).map(ArgValue::List),
            Some(c) if c.is_ascii_digit() => {
                let mut digits = String::from(c);
                while let Some(d) = self.chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                digits
                    .parse()
                    .map(ArgValue::Int)
                    .map_err(|e| format!("bad integer `{digits}`: {e}"))
            }
            Some(c) => Err(format!(
                "unexpected `{c}`: arguments are quoted strings, integers or [lists]"
            )),
            None => Err("missing argument".to_string()),
        }
    }

    fn string(&mut self, quote: char) -> std::result::Result<String, String> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some('\\') => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err("unterminated string".to_string()),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }
}
