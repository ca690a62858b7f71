/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template tokenizer.
//!
//! Splits source text into literal text runs and tag runs. Three delimiter
//! pairs are recognized, tried in this order at every position:
//!
//! - `{{ ... }}` variable tags
//! - `{% ... %}` block tags
//! - `{# ... #}` comment tags
//!
//! Tags are matched non-greedily and never span a line break. Anything that
//! is not a complete tag, including a lone `{%` with no closer on its line,
//! is literal text. The tokenizer never fails; tag contents are validated by
//! the parser so that errors can point at a concrete token.

use crate::source::{LocationTracker, SourceLocation};
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{.*?\}\}|\{%.*?%\}|\{#.*?#\}").unwrap());

/// Prefix marking a block tag as a closing tag (`endfor`, `endif`, ...).
pub const END_PREFIX: &str = "end";

/// The lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text, emitted verbatim.
    Text,
    /// `{{ path }}`
    Variable,
    /// `{% keyword ... %}`
    Block,
    /// `{# ... #}`
    Comment,
    /// `{% end... %}`
    BlockEnd,
}

/// A single lexical token, borrowing from the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Verbatim source slice, delimiters included.
    pub raw: &'a str,
    /// Tag content with delimiters removed and whitespace trimmed.
    /// For text tokens this is the same as `raw`.
    pub content: &'a str,
    /// Where `raw` starts in the source.
    pub location: SourceLocation,
}

impl<'a> Token<'a> {
    fn text(raw: &'a str, location: SourceLocation) -> Self {
        Self {
            kind: TokenKind::Text,
            raw,
            content: raw,
            location,
        }
    }

    fn tag(raw: &'a str, location: SourceLocation) -> Self {
        let content = raw[2..raw.len() - 2].trim();
        let kind = match &raw[..2] {
            "{{" => TokenKind::Variable,
            "{#" => TokenKind::Comment,
            _ if first_word(content).starts_with(END_PREFIX) => TokenKind::BlockEnd,
            _ => TokenKind::Block,
        };
        Self {
            kind,
            raw,
            content,
            location,
        }
    }

    /// First whitespace-separated word of the content ("" if empty).
    pub fn keyword(&self) -> &'a str {
        first_word(self.content)
    }

    /// Whitespace-separated words of the content.
    pub fn words(&self) -> Vec<&'a str> {
        self.content.split_whitespace().collect()
    }
}

fn first_word(content: &str) -> &str {
    content.split_whitespace().next().unwrap_or("")
}

/// Tokenize template source.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut tracker = LocationTracker::new(source);
    let mut last_end = 0;

    for tag in TAG_PATTERN.find_iter(source) {
        if tag.start() > last_end {
            let location = tracker.locate(last_end);
            tokens.push(Token::text(&source[last_end..tag.start()], location));
        }
        let location = tracker.locate(tag.start());
        tokens.push(Token::tag(tag.as_str(), location));
        last_end = tag.end();
    }

    if last_end < source.len() {
        let location = tracker.locate(last_end);
        tokens.push(Token::text(&source[last_end..], location));
    }

    tracing::debug!(tokens = tokens.len(), "Tokenized template");
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds_and_raw(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source).iter().map(|t| (t.kind, t.raw)).collect()
    }

    #[test]
    fn test_plain_text_is_single_token() {
        assert_eq!(
            kinds_and_raw("Hello, 20% fun time!"),
            vec![(TokenKind::Text, "Hello, 20% fun time!")]
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_variable_tag() {
        let tokens = tokenize("Hello, {{ name }}!");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Variable);
        assert_eq!(tokens[1].raw, "{{ name }}");
        assert_eq!(tokens[1].content, "name");
        assert_eq!(tokens[2].raw, "!");
    }

    #[test]
    fn test_block_and_end_tags() {
        assert_eq!(
            kinds_and_raw("{% for x in xs %}{{x}}{% endfor %}"),
            vec![
                (TokenKind::Block, "{% for x in xs %}"),
                (TokenKind::Variable, "{{x}}"),
                (TokenKind::BlockEnd, "{% endfor %}"),
            ]
        );
    }

    #[test]
    fn test_comment_tag() {
        let tokens = tokenize("a{# note #}b");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].content, "note");
    }

    #[test]
    fn test_text_whitespace_is_preserved() {
        let tokens = tokenize("  \n{{ a }}\n\t ");
        assert_eq!(tokens[0].raw, "  \n");
        assert_eq!(tokens[2].raw, "\n\t ");
    }

    #[test]
    fn test_non_greedy_matching() {
        assert_eq!(
            kinds_and_raw("{{ a }} and {{ b }}"),
            vec![
                (TokenKind::Variable, "{{ a }}"),
                (TokenKind::Text, " and "),
                (TokenKind::Variable, "{{ b }}"),
            ]
        );
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        assert_eq!(
            kinds_and_raw("oops {% for x in xs"),
            vec![(TokenKind::Text, "oops {% for x in xs")]
        );
    }

    #[test]
    fn test_tags_do_not_span_lines() {
        assert_eq!(
            kinds_and_raw("{{ a\n}}"),
            vec![(TokenKind::Text, "{{ a\n}}")]
        );
    }

    #[test]
    fn test_content_is_trimmed_but_raw_is_not() {
        let tokens = tokenize("{%   if  x   %}");
        assert_eq!(tokens[0].raw, "{%   if  x   %}");
        assert_eq!(tokens[0].content, "if  x");
        assert_eq!(tokens[0].words(), vec!["if", "x"]);
        assert_eq!(tokens[0].keyword(), "if");
    }

    #[test]
    fn test_end_prefix_classification() {
        let tokens = tokenize("{% endif %}{% endblock name %}{% else %}");
        assert_eq!(tokens[0].kind, TokenKind::BlockEnd);
        assert_eq!(tokens[1].kind, TokenKind::BlockEnd);
        assert_eq!(tokens[2].kind, TokenKind::Block);
    }

    #[test]
    fn test_token_locations() {
        let tokens = tokenize("line one\n  {{ x }}");
        assert_eq!(tokens[1].location.row, 1);
        assert_eq!(tokens[1].location.column, 2);
        assert_eq!(tokens[1].location.offset, 11);
    }

    #[test]
    fn test_token_dump() {
        let dump: Vec<String> = tokenize("Hi {{ who }}{# c #}{% if x %}!{% endif %}")
            .iter()
            .map(|t| format!("{:?} {:?}", t.kind, t.content))
            .collect();
        insta::assert_snapshot!(dump.join("\n"), @r#"
        Text "Hi "
        Variable "who"
        Comment "c"
        Block "if x"
        Text "!"
        BlockEnd "endif"
        "#);
    }
}
