/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tortoise, a small text template engine.
//!
//! Templates are plain text with three kinds of tags:
//!
//! - Variable interpolation: `{{ user.name }}`
//! - Block tags: `{% for item in items %}...{% endfor %}` and
//!   `{% if cond %}...{% else %}...{% endif %}`
//! - Comments: `{# ignored #}`
//!
//! A template is compiled once into a node tree and can then be rendered any
//! number of times against different contexts. Output is never escaped.
//!
//! # Architecture
//!
//! Compilation runs the [`lexer`] over the source and feeds the tokens to the
//! [`parser`], which builds a tree of [`Node`]s. Rendering walks that tree
//! against a [`Scope`]. Tag operands go through [`expr::evaluate`], which
//! classifies each one as a literal or a dotted name to look up.
//!
//! # Example
//!
//! ```
//! use tortoise::{Context, Template};
//!
//! let template = Template::compile("Hello, {{ name }}!")?;
//!
//! let mut ctx = Context::new();
//! ctx.insert("name", "World");
//!
//! let output = template.render(&ctx)?;
//! assert_eq!(output, "Hello, World!");
//! # Ok::<(), tortoise::TemplateError>(())
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod value;

// Re-export main types at crate root
pub use ast::{Condition, Conditional, ElseBranch, ForLoop, Node, Root, Text, VariableRef};
pub use context::{Context, LayeredScope, Scope};
pub use error::{TemplateError, TemplateResult};
pub use expr::{CompareOp, Expr, Path};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::Template;
pub use source::SourceLocation;
pub use value::{Function, Object, Value};
