/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for tortoise using test fixtures.
 */

use pretty_assertions::assert_eq;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tortoise::{Context, Node, Object, Template, TemplateError, Value};

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Helper to load a template from fixtures
fn load_template(name: &str) -> Template {
    let path = fixture_path(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read fixture: {}", name));
    Template::compile_with_filename(&source, name)
        .unwrap_or_else(|e| panic!("Failed to compile template {}: {}", name, e))
}

#[test]
fn test_demo_page() {
    let template = load_template("demo.template");
    let ctx = Context::from_json(json!({
        "name": "Manish",
        "myList": [1, 1, 2, 3, 5, 8]
    }))
    .unwrap();

    let mut expected = String::from("Hello, Manish.\n");
    for (index, item) in [1, 2, 3].iter().enumerate() {
        expected.push_str(&format!(
            "\n    Index {index}: {item}\n    \n        do something here\n    \n"
        ));
    }
    expected.push('\n');

    assert_eq!(template.render(&ctx).unwrap(), expected);
}

#[test]
fn test_demo_page_else_branch() {
    let template = load_template("demo.template");
    let ctx = Context::from_json(json!({ "name": "Manish", "myList": [] })).unwrap();

    let output = template.render(&ctx).unwrap();
    assert_eq!(output.matches("do something else").count(), 3);
    assert!(!output.contains("do something here"));
}

#[derive(Serialize)]
struct Item {
    name: String,
    price: u32,
}

#[derive(Serialize)]
struct Page {
    title: String,
    items: Vec<Item>,
}

#[derive(Serialize)]
struct PageContext {
    page: Page,
}

#[test]
fn test_page_from_serialize() {
    let template = load_template("page.template");
    let ctx = Context::from_serialize(&PageContext {
        page: Page {
            title: "Shop".to_string(),
            items: vec![
                Item {
                    name: "Tea".to_string(),
                    price: 4,
                },
                Item {
                    name: "Gold".to_string(),
                    price: 99,
                },
            ],
        },
    })
    .unwrap();

    assert_eq!(
        template.render(&ctx).unwrap(),
        "<html>\n\n<h1>Shop</h1>\n<ul>\n  <li>Tea</li>\n  <li>Gold (premium)</li>\n</ul>\n</html>\n"
    );
}

#[test]
fn test_page_without_items() {
    let template = load_template("page.template");
    let ctx = Context::from_json(json!({ "page": { "title": "Shop", "items": [] } })).unwrap();

    assert_eq!(
        template.render(&ctx).unwrap(),
        "<html>\n\n<h1>Shop</h1>\n<p>No items.</p>\n</html>\n"
    );
}

#[test]
fn test_unclosed_block_reports_opener() {
    let path = fixture_path("unclosed.template");
    let source = std::fs::read_to_string(path).unwrap();
    let err = Template::compile_with_filename(&source, "unclosed.template").unwrap_err();

    insta::assert_snapshot!(
        err.to_string(),
        @r#"Syntax error at line 2, column 1: unbalanced blocks: "{% for item in items %}" is never closed; expected {% endfor %}"#
    );

    let report = err.report(&source, "unclosed.template");
    assert!(report.contains("unclosed.template"));
    assert!(report.contains("{% for item in items %}"));
}

#[test]
fn test_template_accessors() {
    let template = load_template("demo.template");
    assert_eq!(template.filename(), "demo.template");
    assert!(template.source().starts_with("Hello, {{ name }}."));
    assert!(matches!(template.root(), Node::Root(_)));
    assert!(template.root().children().iter().any(Node::creates_scope));

    let default = Template::compile("x").unwrap();
    assert_eq!(default.filename(), "<template>");
}

#[derive(Debug)]
struct AnyOldObject {
    a: &'static str,
    b: &'static str,
    inner: Option<Value>,
}

impl Object for AnyOldObject {
    fn get_attr(&self, name: &str) -> Option<Value> {
        match name {
            "a" => Some(Value::from(self.a)),
            "b" => Some(Value::from(self.b)),
            "func" => Some(Value::function(|| Value::from("func!"))),
            "obj" => self.inner.clone(),
            _ => None,
        }
    }
}

#[test]
fn test_object_paths() {
    let obj = Value::object(AnyOldObject {
        a: "Any",
        b: "Old",
        inner: None,
    });
    let obj2 = Value::object(AnyOldObject {
        a: "Second",
        b: "Bee",
        inner: Some(obj.clone()),
    });

    let mut ctx = Context::new();
    ctx.insert("obj", obj);
    ctx.insert("obj2", obj2);

    let render = |source: &str| Template::compile(source).unwrap().render(&ctx).unwrap();
    assert_eq!(render("{{ obj.a }}"), "Any");
    assert_eq!(render("{{ obj.func }}"), "func!");
    assert_eq!(render("{{ obj2.obj.a }}"), "Any");
    assert_eq!(render("{{ obj2.b }}"), "Bee");

    let err = Template::compile("{{ obj.missing }}")
        .unwrap()
        .render(&ctx)
        .unwrap_err();
    assert!(matches!(err, TemplateError::Context { ref path } if path == "obj.missing"));
}

#[test]
fn test_template_shared_across_threads() {
    let template = std::sync::Arc::new(Template::compile("{{ n }}").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let template = std::sync::Arc::clone(&template);
            std::thread::spawn(move || {
                let ctx: Context = [("n", n)].into_iter().collect();
                template.render(&ctx).unwrap()
            })
        })
        .collect();

    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outputs, vec!["0", "1", "2", "3"]);
}
