/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render contexts and dotted-path resolution.
//!
//! A [`Context`] is the caller's name-to-value mapping. Rendering reads names
//! through the [`Scope`] trait, which also lets `for` loops bind their loop
//! variable and `index`. [`Template::render`](crate::Template::render) binds
//! into a [`LayeredScope`] over the caller's context so the caller's map is
//! left untouched; [`Template::render_in_place`](crate::Template::render_in_place)
//! binds straight into the caller's context.

use crate::error::{TemplateError, TemplateResult};
use crate::expr::Path;
use crate::value::Value;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;

/// Name lookup and binding used while rendering.
pub trait Scope {
    /// Look up a root-level name.
    fn lookup(&self, name: &str) -> Option<&Value>;

    /// Bind a name for the rest of the render call.
    fn bind(&mut self, name: &str, value: Value);
}

/// Variable bindings supplied to a render call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    variables: HashMap<String, Value>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object; each key becomes a name.
    pub fn from_json(json: serde_json::Value) -> TemplateResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect()),
            other => Err(TemplateError::type_error(format!(
                "context must be a JSON object, got {}",
                Value::from(other).type_name()
            ))),
        }
    }

    /// Build a context from any serializable struct or map.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> TemplateResult<Self> {
        Self::from_json(serde_json::to_value(value)?)
    }

    /// Insert a variable, returning the previous value for that name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.variables.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.variables.remove(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve a dotted path (e.g. `"user.profile.name"`) against this context.
    pub fn resolve(&self, dotted: &str) -> TemplateResult<Value> {
        resolve(self, &Path::parse(dotted)).map(Cow::into_owned)
    }
}

impl Scope for Context {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        context.extend(iter);
        context
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// A scope whose bindings overlay a read-only base context.
///
/// Bindings shadow the base and stay in place until the scope is dropped.
#[derive(Debug)]
pub struct LayeredScope<'a> {
    base: &'a Context,
    locals: HashMap<String, Value>,
}

impl<'a> LayeredScope<'a> {
    pub fn new(base: &'a Context) -> Self {
        Self {
            base,
            locals: HashMap::new(),
        }
    }
}

impl Scope for LayeredScope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.base.get(name))
    }

    fn bind(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }
}

/// Resolve a dotted path.
///
/// The root segment is looked up in the scope. Each later segment tries
/// attribute access, then key/index access; if the result is a function it
/// is called with no arguments and resolution continues from its return
/// value. Values reached without copying stay borrowed from the scope.
pub fn resolve<'s, S: Scope + ?Sized>(scope: &'s S, path: &Path) -> TemplateResult<Cow<'s, Value>> {
    let root = scope
        .lookup(path.root())
        .ok_or_else(|| TemplateError::context(path.to_string()))?;
    let mut current = Cow::Borrowed(root);

    for segment in path.segments().iter().skip(1) {
        current = step(current, segment).ok_or_else(|| TemplateError::context(path.to_string()))?;
        if let Value::Function(function) = current.as_ref() {
            current = Cow::Owned(function.call());
        }
    }

    Ok(current)
}

fn step<'s>(current: Cow<'s, Value>, segment: &str) -> Option<Cow<'s, Value>> {
    if let Some(attr) = current.get_attr(segment) {
        return Some(Cow::Owned(attr));
    }
    match current {
        Cow::Borrowed(value) => value
            .get_item(segment)
            .map(Cow::Borrowed)
            .or_else(|| value.get_char(segment).map(Cow::Owned)),
        Cow::Owned(value) => value
            .get_item(segment)
            .cloned()
            .or_else(|| value.get_char(segment))
            .map(Cow::Owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Debug)]
    struct AnyOldObject {
        attrs: BTreeMap<String, Value>,
    }

    impl Object for AnyOldObject {
        fn get_attr(&self, name: &str) -> Option<Value> {
            self.attrs.get(name).cloned()
        }
    }

    fn object(attrs: Vec<(&str, Value)>) -> Value {
        Value::object(AnyOldObject {
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        })
    }

    #[test]
    fn test_direct_lookup() {
        let ctx: Context = [("name", "Manish")].into_iter().collect();
        assert_eq!(ctx.resolve("name").unwrap(), Value::from("Manish"));
    }

    #[test]
    fn test_missing_root_is_context_error() {
        let ctx = Context::new();
        let err = ctx.resolve("name").unwrap_err();
        assert!(matches!(err, TemplateError::Context { ref path } if path == "name"));

        let err = ctx.resolve("user.name").unwrap_err();
        assert!(matches!(err, TemplateError::Context { ref path } if path == "user.name"));
    }

    #[test]
    fn test_attribute_and_callable() {
        let obj = object(vec![
            ("a", Value::from("Any")),
            ("func", Value::function(|| Value::from("func!"))),
        ]);
        let mut ctx = Context::new();
        ctx.insert("obj", obj.clone());
        ctx.insert("obj2", object(vec![("obj", obj), ("b", Value::from("Bee"))]));

        assert_eq!(ctx.resolve("obj.a").unwrap(), Value::from("Any"));
        assert_eq!(ctx.resolve("obj.func").unwrap(), Value::from("func!"));
        assert_eq!(ctx.resolve("obj2.obj.a").unwrap(), Value::from("Any"));
        assert_eq!(ctx.resolve("obj2.b").unwrap(), Value::from("Bee"));
    }

    #[test]
    fn test_callable_result_is_traversed() {
        let inner = object(vec![("name", Value::from("inner"))]);
        let mut ctx = Context::new();
        ctx.insert(
            "obj",
            object(vec![("child", Value::function(move || inner.clone()))]),
        );
        assert_eq!(ctx.resolve("obj.child.name").unwrap(), Value::from("inner"));
    }

    #[test]
    fn test_root_function_is_not_called() {
        let mut ctx = Context::new();
        ctx.insert("f", Value::function(|| Value::Int(1)));
        assert!(matches!(ctx.resolve("f").unwrap(), Value::Function(_)));
    }

    #[test]
    fn test_map_keys_and_indexes() {
        let ctx = Context::from_json(serde_json::json!({
            "user": { "profile": { "name": "Ada" } },
            "items": ["x", "y"],
            "word": "hey"
        }))
        .unwrap();
        assert_eq!(ctx.resolve("user.profile.name").unwrap(), Value::from("Ada"));
        assert_eq!(ctx.resolve("items.1").unwrap(), Value::from("y"));
        assert_eq!(ctx.resolve("items.-2").unwrap(), Value::from("x"));
        assert_eq!(ctx.resolve("word.0").unwrap(), Value::from("h"));
    }

    #[test]
    fn test_missing_segment_is_context_error() {
        let ctx = Context::from_json(serde_json::json!({ "user": { "name": "Ada" } })).unwrap();
        let err = ctx.resolve("user.email").unwrap_err();
        assert!(matches!(err, TemplateError::Context { ref path } if path == "user.email"));
        assert!(ctx.resolve("user.name.first").is_err());
    }

    #[test]
    fn test_resolve_borrows_from_scope() {
        let ctx: Context = [("items", vec![1, 2])].into_iter().collect();
        let resolved = resolve(&ctx, &Path::parse("items")).unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));

        let obj = Arc::new(AnyOldObject {
            attrs: BTreeMap::new(),
        });
        let mut ctx = Context::new();
        ctx.insert("obj", Value::Object(obj));
        assert!(matches!(
            resolve(&ctx, &Path::parse("obj")).unwrap(),
            Cow::Borrowed(Value::Object(_))
        ));
    }

    #[test]
    fn test_layered_scope_shadows_without_touching_base() {
        let base: Context = [("x", "base"), ("y", "only-base")].into_iter().collect();
        let mut scope = LayeredScope::new(&base);
        scope.bind("x", Value::from("local"));

        assert_eq!(scope.lookup("x"), Some(&Value::from("local")));
        assert_eq!(scope.lookup("y"), Some(&Value::from("only-base")));
        assert_eq!(base.get("x"), Some(&Value::from("base")));
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct Page {
            title: String,
            tags: Vec<String>,
        }

        let ctx = Context::from_serialize(&Page {
            title: "Home".to_string(),
            tags: vec!["a".to_string()],
        })
        .unwrap();
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("title"), Some(&Value::from("Home")));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = Context::from_json(serde_json::json!([1, 2])).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Type error: context must be a JSON object, got list");
    }
}
