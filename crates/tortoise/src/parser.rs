/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Builds the node tree from the token stream in a single pass. Open blocks
//! live on an explicit scope stack owned by one [`parse`] call: opening tags
//! push, closing tags pop and attach the finished block to its parent. The
//! stack bottom is the root, which is never popped by a closing tag.

use crate::ast::{Condition, Conditional, ElseBranch, ForLoop, Node, Root, Text, VariableRef};
use crate::error::{TemplateError, TemplateResult};
use crate::expr::{CompareOp, Path, evaluate, parse_literal};
use crate::lexer::{Token, TokenKind, tokenize};

/// Filename used in diagnostics when none is given.
pub const DEFAULT_FILENAME: &str = "<template>";

/// A compiled template ready for rendering.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed tree (always a [`Node::Root`]).
    pub(crate) root: Node,

    /// Template source (for error reporting).
    pub(crate) source: String,

    /// Name shown in diagnostics.
    pub(crate) filename: String,
}

impl Template {
    /// Compile a template from source text.
    ///
    /// # Arguments
    /// * `source` - The template source text
    ///
    /// # Returns
    /// A compiled template, or the first syntax error found.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_with_filename(source, DEFAULT_FILENAME)
    }

    /// Compile a template from source text with a filename for error reporting.
    pub fn compile_with_filename(source: &str, filename: &str) -> TemplateResult<Self> {
        let tokens = tokenize(source);
        let root = parse(&tokens)?;
        tracing::debug!(filename, nodes = root.count(), "Parsed template");

        Ok(Template {
            root,
            source: source.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Get the root node of this template.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Plain-text report for an error raised by this template.
    pub fn report(&self, error: &TemplateError) -> String {
        error.report(&self.source, &self.filename)
    }
}

/// Keywords that may not start a block tag on their own.
const MISPLACED_KEYWORDS: &[&str] = &["in"];

/// Keywords that are recognized but produce no node.
const INERT_KEYWORDS: &[&str] = &["block", "extends"];

/// An open block on the scope stack, with the tag that opened it.
struct Frame<'a> {
    node: Node,
    opener: Option<Token<'a>>,
}

/// Parse a token stream into a [`Node::Root`] tree.
pub fn parse(tokens: &[Token<'_>]) -> TemplateResult<Node> {
    let mut parser = Parser::new();
    for token in tokens {
        parser.consume(token)?;
    }
    parser.finish()
}

struct Parser<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Parser<'a> {
    fn new() -> Self {
        Self {
            stack: vec![Frame {
                node: Node::Root(Root::default()),
                opener: None,
            }],
        }
    }

    fn consume(&mut self, token: &Token<'a>) -> TemplateResult<()> {
        match token.kind {
            TokenKind::Text => {
                self.append(Node::Text(Text {
                    text: token.raw.to_string(),
                    location: token.location,
                }));
                Ok(())
            }
            TokenKind::Variable => {
                let node = parse_variable(token)?;
                self.append(Node::Variable(node));
                Ok(())
            }
            TokenKind::Comment => Ok(()),
            TokenKind::Block => self.open_block(token),
            TokenKind::BlockEnd => self.close_block(token),
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.node.push_child(node);
        }
    }

    fn push(&mut self, node: Node, opener: &Token<'a>) {
        self.stack.push(Frame {
            node,
            opener: Some(*opener),
        });
    }

    /// Pop the innermost block and attach it to its parent.
    fn pop(&mut self) {
        if self.stack.len() > 1 {
            if let Some(frame) = self.stack.pop() {
                self.append(frame.node);
            }
        }
    }

    fn top(&self) -> Option<&Node> {
        self.stack.last().map(|frame| &frame.node)
    }

    fn open_block(&mut self, token: &Token<'a>) -> TemplateResult<()> {
        match token.keyword() {
            "for" => {
                let node = parse_for(token)?;
                self.push(Node::ForLoop(node), token);
            }
            "if" => {
                let node = parse_if(token)?;
                self.push(Node::Conditional(node), token);
            }
            "else" => {
                if token.words().len() != 1 {
                    return Err(syntax_error(
                        token,
                        format!("unexpected content in else tag \"{}\"", token.raw),
                    ));
                }
                match self.top() {
                    Some(Node::Conditional(_)) => {}
                    Some(Node::ElseBranch(_)) => {
                        return Err(syntax_error(token, "duplicate {% else %} in if block"));
                    }
                    _ => return Err(syntax_error(token, "{% else %} outside of an if block")),
                }
                let branch = ElseBranch {
                    children: Vec::new(),
                    location: token.location,
                };
                self.push(Node::ElseBranch(branch), token);
            }
            "" => return Err(syntax_error(token, "empty block tag")),
            keyword if INERT_KEYWORDS.contains(&keyword) => {
                tracing::debug!(keyword, "Ignoring unsupported block tag");
            }
            keyword if MISPLACED_KEYWORDS.contains(&keyword) => {
                return Err(syntax_error(
                    token,
                    format!("misplaced keyword \"{keyword}\""),
                ));
            }
            keyword => {
                return Err(syntax_error(
                    token,
                    format!("invalid keyword \"{keyword}\""),
                ));
            }
        }
        Ok(())
    }

    fn close_block(&mut self, token: &Token<'a>) -> TemplateResult<()> {
        let closer = token.keyword();
        if closer == "endblock" {
            return Ok(());
        }
        if token.words().len() != 1 {
            return Err(syntax_error(
                token,
                format!("unexpected content in closing tag \"{}\"", token.raw),
            ));
        }

        let matches_top = match (closer, self.top()) {
            ("endfor", Some(Node::ForLoop(_))) => true,
            ("endif", Some(Node::Conditional(_) | Node::ElseBranch(_))) => true,
            ("endfor" | "endif", _) => false,
            _ => {
                return Err(syntax_error(
                    token,
                    format!("unknown closing tag \"{closer}\""),
                ));
            }
        };

        if self.stack.len() == 1 {
            return Err(syntax_error(
                token,
                format!("unbalanced blocks: {{% {closer} %}} has no opening tag"),
            ));
        }
        if !matches_top {
            let expected = self.expected_closer().unwrap_or("end");
            return Err(syntax_error(
                token,
                format!("unbalanced blocks: expected {{% {expected} %}}, found {{% {closer} %}}"),
            ));
        }

        // An else branch is closed together with its conditional.
        if matches!(self.top(), Some(Node::ElseBranch(_))) {
            self.pop();
        }
        self.pop();
        Ok(())
    }

    fn expected_closer(&self) -> Option<&'static str> {
        match self.top()? {
            Node::ForLoop(_) => Some("endfor"),
            Node::Conditional(_) | Node::ElseBranch(_) => Some("endif"),
            _ => None,
        }
    }

    fn finish(mut self) -> TemplateResult<Node> {
        if self.stack.len() > 1 {
            let expected = self.expected_closer().unwrap_or("end");
            if let Some(opener) = self.stack.last().and_then(|frame| frame.opener) {
                return Err(syntax_error(
                    &opener,
                    format!(
                        "unbalanced blocks: \"{}\" is never closed; expected {{% {expected} %}}",
                        opener.raw
                    ),
                ));
            }
        }
        Ok(self
            .stack
            .pop()
            .map_or_else(|| Node::Root(Root::default()), |frame| frame.node))
    }
}

fn syntax_error(token: &Token<'_>, message: impl Into<String>) -> TemplateError {
    TemplateError::syntax(message, token.location, token.raw.len())
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_variable(token: &Token<'_>) -> TemplateResult<VariableRef> {
    let content = token.content;
    if content.is_empty() {
        return Err(syntax_error(token, "empty variable tag"));
    }
    if content.contains(char::is_whitespace) || content.split('.').any(str::is_empty) {
        return Err(syntax_error(
            token,
            format!("invalid variable path \"{content}\""),
        ));
    }
    Ok(VariableRef {
        path: Path::parse(content),
        location: token.location,
    })
}

/// Split off up to `count` leading whitespace-separated words; the rest of
/// the content is returned untouched (apart from leading whitespace).
fn split_leading_words(content: &str, count: usize) -> (Vec<&str>, &str) {
    let mut words = Vec::with_capacity(count);
    let mut rest = content.trim_start();
    while words.len() < count && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        words.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (words, rest)
}

/// `for <name> in <iterable-expr>`. The iterable may contain spaces only
/// when it is a complete literal (`[1, 2, 3]`); a name is a single word.
fn parse_for(token: &Token<'_>) -> TemplateResult<ForLoop> {
    let (words, iterable) = split_leading_words(token.content, 3);
    let single_operand = !iterable.is_empty()
        && (!iterable.contains(char::is_whitespace) || parse_literal(iterable).is_some());
    match words.as_slice() {
        ["for", binding, "in"] if is_identifier(binding) && single_operand => Ok(ForLoop {
            binding: (*binding).to_string(),
            iterable: evaluate(iterable),
            children: Vec::new(),
            location: token.location,
        }),
        _ => Err(syntax_error(
            token,
            format!(
                "malformed for tag \"{}\"; expected {{% for <name> in <iterable> %}}",
                token.raw
            ),
        )),
    }
}

fn parse_if(token: &Token<'_>) -> TemplateResult<Conditional> {
    let words = token.words();
    let condition = match words.as_slice() {
        [_, expr] => Condition::Truthy(evaluate(expr)),
        [_, left, "is", right] => Condition::Identity {
            left: evaluate(left),
            negated: false,
            right: evaluate(right),
        },
        [_, left, op, right] => {
            let op = CompareOp::parse(op).ok_or_else(|| {
                syntax_error(token, format!("invalid comparison operator \"{op}\""))
            })?;
            Condition::Binary(evaluate(left), op, evaluate(right))
        }
        [_, left, "is", "not", right] => Condition::Identity {
            left: evaluate(left),
            negated: true,
            right: evaluate(right),
        },
        _ => {
            return Err(syntax_error(
                token,
                format!(
                    "malformed if tag \"{}\"; expected {{% if <expr> %}}, \
                     {{% if <left> <op> <right> %}} or {{% if <left> is [not] <right> %}}",
                    token.raw
                ),
            ));
        }
    };
    Ok(Conditional {
        condition,
        children: Vec::new(),
        location: token.location,
    })
}
