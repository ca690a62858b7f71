/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! This module defines the tree produced by the parser. The tree is
//! immutable once built and can be rendered any number of times.
//! Each node records where its tag or text starts in the source.

use crate::expr::{CompareOp, Expr, Path};
use crate::source::SourceLocation;

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The top of the tree.
    Root(Root),

    /// Literal text to be output as-is.
    Text(Text),

    /// Variable interpolation: `{{ user.name }}`
    Variable(VariableRef),

    /// For loop: `{% for item in items %}...{% endfor %}`
    ForLoop(ForLoop),

    /// Conditional block: `{% if cond %}...{% else %}...{% endif %}`
    Conditional(Conditional),

    /// The `{% else %}` part of a conditional. Only ever found among a
    /// [`Conditional`]'s children.
    ElseBranch(ElseBranch),
}

impl Node {
    /// Child nodes in document order. Leaves have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(Root { children })
            | Node::ForLoop(ForLoop { children, .. })
            | Node::Conditional(Conditional { children, .. })
            | Node::ElseBranch(ElseBranch { children, .. }) => children,
            Node::Text(_) | Node::Variable(_) => &[],
        }
    }

    /// Append a child. Leaves ignore it; the parser only calls this on
    /// containers.
    pub(crate) fn push_child(&mut self, node: Node) {
        match self {
            Node::Root(Root { children })
            | Node::ForLoop(ForLoop { children, .. })
            | Node::Conditional(Conditional { children, .. })
            | Node::ElseBranch(ElseBranch { children, .. }) => children.push(node),
            Node::Text(_) | Node::Variable(_) => {}
        }
    }

    /// Whether this node opens a block that must be closed by an end tag.
    pub fn creates_scope(&self) -> bool {
        matches!(
            self,
            Node::ForLoop(_) | Node::Conditional(_) | Node::ElseBranch(_)
        )
    }

    /// Where the node's token starts. The root starts at the beginning.
    pub fn location(&self) -> SourceLocation {
        match self {
            Node::Root(_) => SourceLocation::default(),
            Node::Text(Text { location, .. })
            | Node::Variable(VariableRef { location, .. })
            | Node::ForLoop(ForLoop { location, .. })
            | Node::Conditional(Conditional { location, .. })
            | Node::ElseBranch(ElseBranch { location, .. }) => *location,
        }
    }

    /// Total number of nodes in this subtree, this one included.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(Node::count).sum::<usize>()
    }
}

/// The root of a parsed template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
    pub children: Vec<Node>,
}

/// Literal text node.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub location: SourceLocation,
}

/// A `{{ dotted.path }}` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub path: Path,
    pub location: SourceLocation,
}

/// For loop: `{% for binding in iterable %}`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    /// Name the current element is bound to.
    pub binding: String,
    /// Evaluated once at parse time; a name is resolved on every render.
    pub iterable: Expr,
    pub children: Vec<Node>,
    pub location: SourceLocation,
}

/// The test of an `{% if %}` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `{% if expr %}`
    Truthy(Expr),
    /// `{% if left op right %}`
    Binary(Expr, CompareOp, Expr),
    /// `{% if left is right %}` / `{% if left is not right %}`
    Identity { left: Expr, negated: bool, right: Expr },
}

/// Conditional block.
///
/// The optional else branch is stored as the last [`Node::ElseBranch`]
/// among `children`, not as a separate field.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Condition,
    pub children: Vec<Node>,
    pub location: SourceLocation,
}

impl Conditional {
    /// The paired else branch, if any.
    pub fn else_branch(&self) -> Option<&ElseBranch> {
        self.children.iter().find_map(|child| match child {
            Node::ElseBranch(branch) => Some(branch),
            _ => None,
        })
    }
}

/// Body of an `{% else %}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseBranch {
    pub children: Vec<Node>,
    pub location: SourceLocation,
}
