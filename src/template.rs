//! Prompt template parser and renderer
//!
//! Templates are tokenized once, when a flow is defined, into a tree of
//! [`Node`]s and rendered against validated input:
//!
//! - `{{path}}` / `{{{path}}}` - field substitution (`recipe`, `this`, `this.title`)
//! - `{{#each path}}...{{/each}}` - repeat the body once per array element,
//!   with `{{this}}` bound to the current element
//! - `{{#unless @last}}SEP{{/unless}}` - separator, only as the last item of
//!   an `each` body; emitted between elements, never after the final one
//!
//! A referenced field that is absent from the input is an error, never an
//! empty string.

use crate::error::{ChefError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Dotted field path: `name`, `this`, `this.title`
static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid path pattern")
});

const THIS: &str = "this";

/// Parsed template node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(String),
    Field(FieldPath),
    Each(LoopRegion),
}

/// Iteration region over an array field
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRegion {
    pub path: FieldPath,
    pub body: Vec<Node>,
    /// Emitted between repetitions, never after the last one
    pub separator: Option<String>,
}

/// Reference to an input field, possibly relative to the loop element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    fn parse(raw: &str, position: usize) -> Result<Self> {
        if !PATH_PATTERN.is_match(raw) {
            return Err(ChefError::TemplateParse {
                position,
                details: format!("invalid field path '{}'", raw),
            });
        }
        Ok(Self {
            segments: raw.split('.').map(str::to_string).collect(),
        })
    }

    /// Path is relative to the current loop element
    pub fn is_relative(&self) -> bool {
        self.segments.first().map(String::as_str) == Some(THIS)
    }

    /// First segment, i.e. the input field this path starts from
    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or_default()
    }

    fn resolve<'v>(&self, root: &'v Value, this: Option<&'v Value>) -> Result<&'v Value> {
        let (start, rest) = if self.is_relative() {
            let this = this.ok_or_else(|| ChefError::TemplateError {
                details: format!("'{}' used outside of an {{{{#each}}}} region", self),
            })?;
            (this, &self.segments[1..])
        } else {
            let first = root.get(self.root()).ok_or_else(|| self.missing())?;
            (first, &self.segments[1..])
        };

        let mut current = start;
        for segment in rest {
            current = current.get(segment).ok_or_else(|| self.missing())?;
        }
        if current.is_null() {
            return Err(self.missing());
        }
        Ok(current)
    }

    fn missing(&self) -> ChefError {
        ChefError::TemplateError {
            details: format!("field '{}' is missing from the input", self),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// A parsed prompt template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template, failing on malformed syntax
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let nodes = {
            let mut parser = Parser {
                lexemes: lex(&source)?,
                pos: 0,
                end: source.len(),
            };
            parser.parse_sequence(0)?.0
        };
        Ok(Self { source, nodes })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Top-level input fields the template reads
    pub fn root_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        collect_roots(&self.nodes, &mut fields);
        fields
    }

    /// Render against a validated input value
    pub fn render(&self, input: &Value) -> Result<String> {
        let mut out = String::with_capacity(self.source.len() * 2);
        render_nodes(&self.nodes, input, None, &mut out)?;
        Ok(out)
    }
}

fn collect_roots(nodes: &[Node], fields: &mut BTreeSet<String>) {
    for node in nodes {
        match node {
            Node::Literal(_) => {}
            Node::Field(path) => {
                if !path.is_relative() {
                    fields.insert(path.root().to_string());
                }
            }
            Node::Each(region) => {
                if !region.path.is_relative() {
                    fields.insert(region.path.root().to_string());
                }
                collect_roots(&region.body, fields);
            }
        }
    }
}

fn render_nodes(nodes: &[Node], root: &Value, this: Option<&Value>, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Literal(text) => out.push_str(text),
            Node::Field(path) => push_value(out, path.resolve(root, this)?),
            Node::Each(region) => {
                let value = region.path.resolve(root, this)?;
                let items = value.as_array().ok_or_else(|| ChefError::TemplateError {
                    details: format!(
                        "{{{{#each {}}}}} needs an array, found {}",
                        region.path,
                        crate::schema::kind_name(value)
                    ),
                })?;
                for (i, item) in items.iter().enumerate() {
                    render_nodes(&region.body, root, Some(item), out)?;
                    if let Some(separator) = &region.separator {
                        if i + 1 < items.len() {
                            out.push_str(separator);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

// ============================================================================
// LEXER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tag<'a> {
    Field(&'a str),
    OpenEach(&'a str),
    CloseEach,
    OpenUnlessLast,
    CloseUnless,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lexeme<'a> {
    Text(&'a str),
    Tag { tag: Tag<'a>, position: usize },
}

fn lex(source: &str) -> Result<Vec<Lexeme<'_>>> {
    let mut lexemes = Vec::new();
    let mut pos = 0;

    while let Some(offset) = source[pos..].find("{{") {
        let start = pos + offset;
        if start > pos {
            lexemes.push(Lexeme::Text(&source[pos..start]));
        }

        let triple = source[start..].starts_with("{{{");
        let (open_len, close) = if triple { (3, "}}}") } else { (2, "}}") };
        let inner_start = start + open_len;
        let inner_len = source[inner_start..]
            .find(close)
            .ok_or_else(|| ChefError::TemplateParse {
                position: start,
                details: format!("unclosed tag, expected '{}'", close),
            })?;

        let inner = source[inner_start..inner_start + inner_len].trim();
        let tag = classify(inner, start)?;
        if triple && !matches!(tag, Tag::Field(_)) {
            return Err(ChefError::TemplateParse {
                position: start,
                details: "triple braces are only valid around a field".to_string(),
            });
        }
        lexemes.push(Lexeme::Tag {
            tag,
            position: start,
        });
        pos = inner_start + inner_len + close.len();
    }

    if pos < source.len() {
        lexemes.push(Lexeme::Text(&source[pos..]));
    }
    Ok(lexemes)
}

fn classify(inner: &str, position: usize) -> Result<Tag<'_>> {
    let unsupported = |what: &str| ChefError::TemplateParse {
        position,
        details: format!("unsupported tag '{}'", what),
    };

    if let Some(block) = inner.strip_prefix('#') {
        let mut words = block.split_whitespace();
        return match (words.next(), words.next(), words.next()) {
            (Some("each"), Some(path), None) => Ok(Tag::OpenEach(path)),
            (Some("unless"), Some("@last"), None) => Ok(Tag::OpenUnlessLast),
            _ => Err(unsupported(inner)),
        };
    }
    if let Some(closing) = inner.strip_prefix('/') {
        return match closing.trim() {
            "each" => Ok(Tag::CloseEach),
            "unless" => Ok(Tag::CloseUnless),
            _ => Err(unsupported(inner)),
        };
    }
    Ok(Tag::Field(inner))
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'a> {
    lexemes: Vec<Lexeme<'a>>,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<Lexeme<'a>> {
        let lexeme = self.lexemes.get(self.pos).copied();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn peek(&self) -> Option<Lexeme<'a>> {
        self.lexemes.get(self.pos).copied()
    }

    /// Parse until end of input (depth 0) or the matching `{{/each}}`
    fn parse_sequence(&mut self, depth: usize) -> Result<(Vec<Node>, Option<String>)> {
        let mut nodes = Vec::new();

        while let Some(lexeme) = self.next() {
            let (tag, position) = match lexeme {
                Lexeme::Text(text) => {
                    nodes.push(Node::Literal(text.to_string()));
                    continue;
                }
                Lexeme::Tag { tag, position } => (tag, position),
            };

            match tag {
                Tag::Field(raw) => {
                    let path = FieldPath::parse(raw, position)?;
                    check_scope(&path, depth, position)?;
                    nodes.push(Node::Field(path));
                }
                Tag::OpenEach(raw) => {
                    let path = FieldPath::parse(raw, position)?;
                    check_scope(&path, depth, position)?;
                    let (body, separator) = self.parse_sequence(depth + 1)?;
                    nodes.push(Node::Each(LoopRegion {
                        path,
                        body,
                        separator,
                    }));
                }
                Tag::CloseEach if depth > 0 => return Ok((nodes, None)),
                Tag::OpenUnlessLast if depth > 0 => {
                    let separator = self.parse_separator(position)?;
                    return Ok((nodes, Some(separator)));
                }
                Tag::CloseEach => return Err(stray(position, "{{/each}} without {{#each}}")),
                Tag::OpenUnlessLast => {
                    return Err(stray(position, "{{#unless @last}} outside of {{#each}}"))
                }
                Tag::CloseUnless => return Err(stray(position, "{{/unless}} without {{#unless}}")),
            }
        }

        if depth > 0 {
            return Err(ChefError::TemplateParse {
                position: self.end,
                details: "unclosed {{#each}} region".to_string(),
            });
        }
        Ok((nodes, None))
    }

    /// `{{#unless @last}}` already consumed; read `SEP{{/unless}}{{/each}}`
    fn parse_separator(&mut self, position: usize) -> Result<String> {
        let mut separator = String::new();
        if let Some(Lexeme::Text(text)) = self.peek() {
            separator.push_str(text);
            self.pos += 1;
        }

        match self.next() {
            Some(Lexeme::Tag {
                tag: Tag::CloseUnless,
                ..
            }) => {}
            _ => return Err(stray(position, "{{#unless @last}} may only contain literal text")),
        }
        match self.next() {
            Some(Lexeme::Tag {
                tag: Tag::CloseEach,
                ..
            }) => Ok(separator),
            _ => Err(stray(
                position,
                "{{#unless @last}} must be the last item of an {{#each}} body",
            )),
        }
    }
}

fn check_scope(path: &FieldPath, depth: usize, position: usize) -> Result<()> {
    if path.is_relative() && depth == 0 {
        return Err(stray(position, "'this' used outside of an {{#each}} region"));
    }
    Ok(())
}

fn stray(position: usize, details: &str) -> ChefError {
    ChefError::TemplateParse {
        position,
        details: details.to_string(),
    }
}
