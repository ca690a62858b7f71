/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! Renders a parsed tree against a [`Scope`]. The tree is never modified, so
//! one compiled template can be rendered any number of times. `for` loops
//! bind their variable and `index` into the scope they render with; those
//! bindings stay visible for the rest of the render call.

use crate::ast::{Condition, Conditional, ForLoop, Node, VariableRef};
use crate::context::{Context, LayeredScope, Scope, resolve};
use crate::error::{TemplateError, TemplateResult};
use crate::expr::{Expr, is_identical};
use crate::parser::Template;
use crate::value::Value;
use std::borrow::Cow;

/// Name bound to the zero-based iteration count inside `for` loops.
pub const INDEX_BINDING: &str = "index";

impl Template {
    /// Render this template with the given context.
    ///
    /// # Arguments
    /// * `context` - The variable context for evaluation
    ///
    /// # Returns
    /// The rendered output string, or the first error hit while rendering.
    /// The caller's context is left untouched.
    pub fn render(&self, context: &Context) -> TemplateResult<String> {
        let mut scope = LayeredScope::new(context);
        self.render_with_scope(&mut scope)
    }

    /// Render this template, writing loop bindings straight into `context`.
    ///
    /// After the call the context holds the last loop variable and `index`
    /// bound by any `for` loop that ran.
    pub fn render_in_place(&self, context: &mut Context) -> TemplateResult<String> {
        self.render_with_scope(context)
    }

    /// Render this template against any scope.
    pub fn render_with_scope(&self, scope: &mut dyn Scope) -> TemplateResult<String> {
        self.root.render(scope).inspect_err(|error| {
            tracing::debug!(filename = %self.filename, %error, "Template render failed");
        })
    }
}

impl Node {
    /// Render this subtree to a string.
    pub fn render(&self, scope: &mut dyn Scope) -> TemplateResult<String> {
        let mut out = String::new();
        render_node(self, scope, &mut out)?;
        Ok(out)
    }
}

/// Render a node, appending its output to `out`.
pub fn render_node(node: &Node, scope: &mut dyn Scope, out: &mut String) -> TemplateResult<()> {
    match node {
        Node::Root(root) => render_children(&root.children, scope, out),
        Node::Text(text) => {
            out.push_str(&text.text);
            Ok(())
        }
        Node::Variable(var) => render_variable(var, scope, out),
        Node::ForLoop(for_loop) => render_for_loop(for_loop, scope, out),
        Node::Conditional(conditional) => render_conditional(conditional, scope, out),
        // Only rendered through its conditional.
        Node::ElseBranch(_) => Ok(()),
    }
}

fn render_children(children: &[Node], scope: &mut dyn Scope, out: &mut String) -> TemplateResult<()> {
    for child in children {
        render_node(child, scope, out)?;
    }
    Ok(())
}

fn render_variable(var: &VariableRef, scope: &mut dyn Scope, out: &mut String) -> TemplateResult<()> {
    let value = resolve(&*scope, &var.path)?;
    out.push_str(&value.to_string());
    Ok(())
}

fn render_for_loop(for_loop: &ForLoop, scope: &mut dyn Scope, out: &mut String) -> TemplateResult<()> {
    let items = {
        let iterable = operand(&for_loop.iterable, &*scope)?;
        iterable.iter_items().ok_or_else(|| {
            TemplateError::type_error(format!(
                "cannot iterate over {}",
                iterable.type_name()
            ))
        })?
    };

    tracing::trace!(binding = %for_loop.binding, items = items.len(), "Rendering for loop");

    for (index, item) in items.into_iter().enumerate() {
        scope.bind(INDEX_BINDING, Value::from(index));
        scope.bind(&for_loop.binding, item);
        render_children(&for_loop.children, scope, out)?;
    }
    Ok(())
}

fn render_conditional(
    conditional: &Conditional,
    scope: &mut dyn Scope,
    out: &mut String,
) -> TemplateResult<()> {
    let holds = test_condition(&conditional.condition, &*scope)?;
    tracing::trace!(holds, "Evaluated condition");

    if holds {
        render_children(&conditional.children, scope, out)
    } else if let Some(else_branch) = conditional.else_branch() {
        render_children(&else_branch.children, scope, out)
    } else {
        Ok(())
    }
}

fn test_condition(condition: &Condition, scope: &dyn Scope) -> TemplateResult<bool> {
    match condition {
        Condition::Truthy(Expr::NameRef(path)) if scope.lookup(path.root()).is_none() => Ok(false),
        Condition::Truthy(expr) => Ok(operand(expr, scope)?.is_truthy()),
        Condition::Binary(left, op, right) => {
            let left = operand(left, scope)?;
            let right = operand(right, scope)?;
            op.apply(&left, &right)
        }
        Condition::Identity {
            left,
            negated,
            right,
        } => {
            let left = operand(left, scope)?;
            let right = operand(right, scope)?;
            Ok(is_identical(&left, &right) != *negated)
        }
    }
}

/// The value of an operand: literals as-is, names resolved in the scope.
fn operand<'a>(expr: &'a Expr, scope: &'a dyn Scope) -> TemplateResult<Cow<'a, Value>> {
    match expr {
        Expr::Literal(value) => Ok(Cow::Borrowed(value)),
        Expr::NameRef(path) => resolve(scope, path),
    }
}
