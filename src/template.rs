use crate::directive::{ArgValue, DirectiveBlock, DirectiveKind, parse_args};
use crate::error::{QuillError, Result};
use crate::fs_utils::{read_file_contents, resolve_include};
use crate::highlight::Highlighter;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// How deep `{% include %}` may nest before we assume a cycle
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// `{{ variable }}`, `{% statement %}` or `{# comment #}`
const TAG_PATTERN: &str = r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}|\{#.*?#\}";

/// Values for `{{ variable }}` substitution
pub type Variables = HashMap<String, String>;

/// Configuration for template expansion
#[derive(Debug, Clone)]
pub struct ExpanderConfig {
    /// Directive kinds recognised in templates
    pub directives: Vec<DirectiveKind>,
    /// Directories searched, in order, by `{% include %}`
    pub include_dirs: Vec<PathBuf>,
    /// Syntax highlighter used by `code` directives
    pub highlighter: Highlighter,
    /// Maximum nesting of includes
    pub max_include_depth: usize,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            directives: DirectiveKind::ALL.to_vec(),
            include_dirs: Vec::new(),
            highlighter: Highlighter::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl ExpanderConfig {
    #[must_use]
    pub fn with_include_dirs(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            include_dirs,
            ..Self::default()
        }
    }

    fn directive(&self, tag: &str) -> Option<DirectiveKind> {
        DirectiveKind::from_tag(tag).filter(|kind| self.directives.contains(kind))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Variable,
    Statement,
    Comment,
}

/// A tag found in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTag {
    pub kind: TagKind,
    /// Text between the delimiters, trimmed
    pub content: String,
    /// Starting byte offset in the template
    pub start: usize,
    /// Ending byte offset in the template
    pub end: usize,
    /// 1-based line of the opening delimiter
    pub line: usize,
}

impl TemplateTag {
    /// Tag name and argument text of a statement
    fn statement(&self) -> (&str, &str) {
        self.content
            .split_once(char::is_whitespace)
            .map_or((self.content.as_str(), ""), |(name, rest)| {
                (name, rest.trim())
            })
    }
}

/// Piece of a directive body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Variable(String),
}

/// Parsed template element, executed in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Variable { name: String, line: usize },
    Include { name: String, line: usize },
    Directive(DirectiveBlock),
}

/// Finds all tags in the given text
///
/// # Errors
///
/// Returns `QuillError::Regex` if there's an error compiling the regex pattern.
pub fn find_tags(template: &str) -> Result<Vec<TemplateTag>> {
    let pattern = Regex::new(TAG_PATTERN)?;
    let mut tags = Vec::new();
    let mut line = 1;
    let mut counted = 0;

    for capture in pattern.captures_iter(template) {
        let Some(full_match) = capture.get(0) else {
            continue;
        };
        line += template[counted..full_match.start()].matches('\n').count();
        counted = full_match.start();

        let (kind, content) = if let Some(variable) = capture.get(1) {
            (TagKind::Variable, variable.as_str().trim())
        } else if let Some(statement) = capture.get(2) {
            (TagKind::Statement, statement.as_str().trim())
        } else {
            (TagKind::Comment, "")
        };

        tags.push(TemplateTag {
            kind,
            content: content.to_string(),
            start: full_match.start(),
            end: full_match.end(),
            line,
        });
    }

    Ok(tags)
}

enum Token<'a> {
    Text(&'a str),
    Tag(TemplateTag),
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>> {
    let tags = find_tags(template)?;
    let mut tokens = Vec::with_capacity(tags.len() * 2 + 1);
    let mut cursor = 0;

    for tag in tags {
        if tag.start > cursor {
            tokens.push(Token::Text(&template[cursor..tag.start]));
        }
        cursor = tag.end;
        tokens.push(Token::Tag(tag));
    }
    if cursor < template.len() {
        tokens.push(Token::Text(&template[cursor..]));
    }

    Ok(tokens)
}

fn parse_error(line: usize, message: impl Into<String>) -> QuillError {
    QuillError::TemplateParse {
        line,
        message: message.into(),
    }
}

fn variable_name(tag: &TemplateTag) -> Result<String> {
    let name = tag.content.as_str();
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');

    if valid {
        Ok(name.to_string())
    } else {
        Err(parse_error(
            tag.line,
            format!("`{{{{ {name} }}}}` is not a variable name"),
        ))
    }
}

fn include_name(arguments: &str, line: usize) -> Result<String> {
    let values = parse_args(arguments).map_err(|message| parse_error(line, message))?;
    match values.as_slice() {
        [ArgValue::Str(name)] => Ok(name.clone()),
        _ => Err(parse_error(
            line,
            "`include` takes one quoted template name",
        )),
    }
}

/// Literal text up to the matching `{% endraw %}`
fn raw_text<'a>(
    template: &str,
    tokens: &mut impl Iterator<Item = Token<'a>>,
    open: &TemplateTag,
) -> Result<String> {
    for token in tokens {
        if let Token::Tag(tag) = token
            && tag.kind == TagKind::Statement
            && tag.statement() == ("endraw", "")
        {
            return Ok(template[open.end..tag.start].to_string());
        }
    }
    Err(parse_error(open.line, "unclosed `raw` block"))
}

/// Collects a directive body up to its closing tag. Only text, variables,
/// comments and raw blocks may appear inside.
fn directive_body<'a>(
    template: &str,
    tokens: &mut impl Iterator<Item = Token<'a>>,
    kind: DirectiveKind,
    line: usize,
) -> Result<Vec<Segment>> {
    let mut body = Vec::new();

    while let Some(token) = tokens.next() {
        let tag = match token {
            Token::Text(text) => {
                body.push(Segment::Text(text.to_string()));
                continue;
            }
            Token::Tag(tag) => tag,
        };

        match tag.kind {
            TagKind::Comment => {}
            TagKind::Variable => body.push(Segment::Variable(variable_name(&tag)?)),
            TagKind::Statement => match tag.statement() {
                (name, "") if name == kind.end_tag() => return Ok(body),
                ("raw", "") => body.push(Segment::Text(raw_text(template, tokens, &tag)?)),
                (name, _) => {
                    return Err(parse_error(
                        tag.line,
                        format!(
                            "`{name}` inside the `{}` directive opened on line {line}: \
                             directive bodies may only hold text and variables",
                            kind.tag()
                        ),
                    ));
                }
            },
        }
    }

    Err(parse_error(
        line,
        format!(
            "unclosed `{}` directive (expected `{{% {} %}}`)",
            kind.tag(),
            kind.end_tag()
        ),
    ))
}

/// Parses a whole template without executing anything.
///
/// # Errors
///
/// - `QuillError::TemplateParse` for unknown tags, bad arguments, unclosed or
///   nested directives.
/// - `QuillError::UnknownLanguage` for a `code` block with an unsupported
///   language.
pub fn parse(template: &str, config: &ExpanderConfig) -> Result<Vec<Node>> {
    let mut tokens = tokenize(template)?.into_iter();
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        let tag = match token {
            Token::Text(text) => {
                nodes.push(Node::Text(text.to_string()));
                continue;
            }
            Token::Tag(tag) => tag,
        };

        match tag.kind {
            TagKind::Comment => {}
            TagKind::Variable => nodes.push(Node::Variable {
                name: variable_name(&tag)?,
                line: tag.line,
            }),
            TagKind::Statement => {
                let (name, arguments) = tag.statement();
                if name == "include" {
                    nodes.push(Node::Include {
                        name: include_name(arguments, tag.line)?,
                        line: tag.line,
                    });
                } else if name == "raw" && arguments.is_empty() {
                    nodes.push(Node::Text(raw_text(template, &mut tokens, &tag)?));
                } else if let Some(kind) = config.directive(name) {
                    let directive = kind.parse_invocation(arguments, tag.line, config)?;
                    let body = directive_body(template, &mut tokens, kind, tag.line)?;
                    nodes.push(Node::Directive(DirectiveBlock {
                        directive,
                        body,
                        line: tag.line,
                    }));
                } else if let Some(kind) = DirectiveKind::from_end_tag(name) {
                    return Err(parse_error(
                        tag.line,
                        format!("`{name}` without an open `{}` directive", kind.tag()),
                    ));
                } else {
                    return Err(parse_error(tag.line, format!("unknown tag `{name}`")));
                }
            }
        }
    }

    Ok(nodes)
}

fn lookup<'v>(variables: &'v Variables, name: &str) -> &'v str {
    match variables.get(name) {
        Some(value) => value,
        None => {
            debug!(name, "undefined template variable renders empty");
            ""
        }
    }
}

pub(crate) fn render_segments(segments: &[Segment], variables: &Variables) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.as_str(),
            Segment::Variable(name) => lookup(variables, name),
        })
        .collect()
}

/// Expands a template: substitutes variables, resolves includes and runs
/// directives strictly in the order they appear.
///
/// The whole template is parsed before anything runs, and any failure
/// discards the output built so far.
///
/// # Errors
///
/// Returns parse errors from [`parse`], `QuillError::TemplateNotFound` for
/// unresolved includes, and whatever a directive reports.
pub fn expand(template: &str, variables: &Variables, config: &ExpanderConfig) -> Result<String> {
    expand_at_depth(template, variables, config, 0)
}

fn expand_at_depth(
    template: &str,
    variables: &Variables,
    config: &ExpanderConfig,
    depth: usize,
) -> Result<String> {
    let nodes = parse(template, config)?;
    debug!(nodes = nodes.len(), depth, "expanding template");

    let mut output = String::with_capacity(template.len());
    for node in &nodes {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Variable { name, .. } => output.push_str(lookup(variables, name)),
            Node::Include { name, line } => {
                if depth >= config.max_include_depth {
                    return Err(parse_error(
                        *line,
                        format!(
                            "includes nested deeper than {} levels at `{name}`",
                            config.max_include_depth
                        ),
                    ));
                }
                let path = resolve_include(name, &config.include_dirs)?;
                debug!(name, path = %path.display(), "including template");
                let source = read_file_contents(&path)?;
                let included = expand_at_depth(&source, variables, config, depth + 1)
                    .map_err(|e| e.in_file(&path))?;
                output.push_str(&included);
            }
            Node::Directive(block) => output.push_str(&block.execute(variables, config)?),
        }
    }

    Ok(output)
}
