use serde::Serialize;
use std::path::PathBuf;
use webtpl::{Context, Renderer, RendererOptions, TemplateError, Value};

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources/templates")
}

fn renderer() -> Renderer {
    Renderer::new(RendererOptions::new(templates_dir()))
}

#[derive(Serialize)]
struct Article {
    title: &'static str,
    url: &'static str,
}

#[derive(Serialize)]
struct Page {
    title: &'static str,
    site_name: &'static str,
    articles: Vec<Article>,
}

#[test]
fn test_plain_text_renders_to_itself() {
    let text = "<p>no tags here</p>\n  <span>{ single braces }</span>\n";
    assert_eq!(renderer().render_string(text, &mut Context::new()).unwrap(), text);
}

#[test]
fn test_hello_if_else() {
    let mut ctx = Context::new();
    ctx.insert("name", "Ann");
    ctx.insert("flag", true);
    let text = "Hello {{name}}!\n{% if flag %}\nyes\n{% else %}\nno\n{% end %}";
    assert_eq!(renderer().render_string(text, &mut ctx).unwrap(), "Hello Ann!\nyes");

    ctx.insert("flag", false);
    assert_eq!(renderer().render_string(text, &mut ctx).unwrap(), "Hello Ann!\nno");
}

#[test]
fn test_for_renders_each_element_in_order() {
    let mut ctx = Context::new();
    ctx.insert("items", vec![1, 2, 3]);
    let text = "{% for n in items %}\n- {{n}}\n{% end %}";
    assert_eq!(
        renderer().render_string(text, &mut ctx).unwrap(),
        "- 1\n- 2\n- 3"
    );

    ctx.insert("items", Value::List(Vec::new()));
    assert_eq!(renderer().render_string(text, &mut ctx).unwrap(), "");
}

#[test]
fn test_filters_apply_left_to_right() {
    let mut ctx = Context::new();
    ctx.insert("name", "  Mixed Case  ");
    let r = renderer();
    assert_eq!(
        r.render_string("{{name|upper}}", &mut ctx).unwrap(),
        "  MIXED CASE  "
    );
    assert_eq!(
        r.render_string("[{{ name | lower | strip }}]", &mut ctx).unwrap(),
        "[mixed case]"
    );
}

#[test]
fn test_missing_token_is_brace_stripped() {
    assert_eq!(
        renderer()
            .render_string("<p>{{missing}}</p>", &mut Context::new())
            .unwrap(),
        "<p>{missing}</p>"
    );
}

#[test]
fn test_unknown_filter() {
    let mut ctx = Context::new();
    ctx.insert("name", "x");
    match renderer().render_string("{{name|frobnicate}}", &mut ctx) {
        Err(TemplateError::FilterNotFound(name)) => assert_eq!(name, "frobnicate"),
        other => panic!("Expected FilterNotFound, got {:?}", other),
    }
}

#[test]
fn test_tokens_in_block_headers() {
    let mut ctx = Context::new();
    ctx.insert("name", "Ann");
    let text = "{% if \"{{name}}\" == \"Ann\" %}\nyes\n{% else %}\nno\n{% end %}";
    assert_eq!(renderer().render_string(text, &mut ctx).unwrap(), "yes");

    ctx.insert("name", "Bob");
    assert_eq!(renderer().render_string(text, &mut ctx).unwrap(), "no");

    match renderer().render_string("{% if \"{{name|frobnicate}}\" %}\nyes\n{% end %}", &mut ctx) {
        Err(TemplateError::FilterNotFound(name)) => assert_eq!(name, "frobnicate"),
        other => panic!("Expected FilterNotFound, got {:?}", other),
    }
}

#[test]
fn test_include_inside_loop_is_spliced_before_the_loop_runs() {
    let mut ctx = Context::new();
    ctx.insert("items", vec![1, 2]);
    ctx.insert("section", "Blog");
    // the include is rendered once, before `a` is bound
    assert_eq!(
        renderer().render_file("loop_include.html", &mut ctx).unwrap(),
        "<ul>\n<li>{a} of Blog</li>\n<li>{a} of Blog</li>\n</ul>"
    );
}

#[test]
fn test_float_values_keep_their_fraction() {
    let mut ctx = Context::new();
    ctx.insert("x", 3.0);
    ctx.insert("y", 0.25);
    ctx.insert("flag", true);
    assert_eq!(
        renderer().render_string("{{x}} {{y}} {{flag}}", &mut ctx).unwrap(),
        "3.0 0.25 true"
    );
}

#[test]
fn test_grammar_error_before_output() {
    let err = renderer()
        .render_string("<p>before</p>\n{% if %}\n{% end %}", &mut Context::new())
        .unwrap_err();
    match err {
        TemplateError::Grammar { line, content, .. } => {
            assert_eq!(line, 2);
            assert_eq!(content, "{% if %}");
        }
        other => panic!("Expected Grammar, got {:?}", other),
    }
}

#[test]
fn test_page_with_include_and_loop() {
    let page = Page {
        title: "Blog",
        site_name: "My Site",
        articles: vec![
            Article {
                title: "First",
                url: "/a/one.html",
            },
            Article {
                title: "Second",
                url: "/a/two.html",
            },
        ],
    };
    let html = renderer().render_file_with("base.html", &page).unwrap();
    assert_eq!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Blog | my site</title>\n</head>\n<body>\n\
         <h1>Blog</h1>\n<ul>\n<li><a href=\"/a/one.html\">FIRST</a></li>\n\
         <li><a href=\"/a/two.html\">SECOND</a></li>\n</ul>\n</body>\n</html>"
    );

    let empty = Page {
        articles: Vec::new(),
        ..page
    };
    let html = renderer().render_file_with("base.html", &empty).unwrap();
    assert!(html.contains("<p>No articles yet.</p>"));
    assert!(!html.contains("<ul>"));
}

#[test]
fn test_includes_share_the_context() {
    let mut ctx = Context::new();
    ctx.insert("title", "Shared");
    ctx.insert("site_name", "Site");
    ctx.insert("timestamp", "stale");

    let html = renderer().render_file("base.html", &mut ctx).unwrap();
    assert!(html.contains("<title>Shared | site</title>"));
    // the caller's context is refreshed in place by the render
    assert!(matches!(ctx.get("timestamp"), Some(Value::Float(_))));
    assert_eq!(ctx.get("title"), Some(&Value::from("Shared")));
}

#[test]
fn test_self_include() {
    match renderer().render_file("self_include.html", &mut Context::new()) {
        Err(TemplateError::Include { name, .. }) => assert_eq!(name, "self_include.html"),
        other => panic!("Expected Include, got {:?}", other),
    }
}

#[test]
fn test_missing_templates() {
    let r = renderer();
    assert!(matches!(
        r.render_file("nowhere.html", &mut Context::new()),
        Err(TemplateError::TemplateNotFound(n)) if n == "nowhere.html"
    ));
    assert!(matches!(
        r.render_file("missing_include.html", &mut Context::new()),
        Err(TemplateError::TemplateNotFound(n)) if n == "partials/nowhere.html"
    ));
}

#[test]
fn test_multiline_value_with_template_syntax() {
    let mut ctx = Context::new();
    ctx.insert("title", "Hello");
    ctx.insert("body", "<p>{{ title | lower }}</p>\n<p>second</p>");
    ctx.merge_serialize(&std::collections::BTreeMap::from([(
        "author",
        std::collections::BTreeMap::from([("name", "Ann")]),
    )]))
    .unwrap();

    assert_eq!(
        renderer().render_file("article.html", &mut ctx).unwrap(),
        "<article>\n<h2>Hello</h2>\n<p>hello</p>\n<p>second</p>\n<footer>Ann</footer>\n</article>"
    );
}

#[test]
fn test_render_file_to() {
    let dir = tempfile::tempdir().unwrap();
    let r = renderer();

    let failed = dir.path().join("broken/index.html");
    let err = r.render_file_to("broken.html", &mut Context::new(), &failed);
    assert!(matches!(err, Err(TemplateError::Grammar { .. })));
    assert!(!failed.exists());

    let target = dir.path().join("blog/hello/index.html");
    let mut ctx = Context::new();
    ctx.insert("title", "Hello");
    ctx.insert("body", "<p>text</p>");
    let html = r.render_file_to("article.html", &mut ctx, &target).unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), html);
    assert!(html.contains("<footer>{author.name}</footer>"));
}

#[test]
fn test_date_fields() {
    let out = renderer()
        .render_string("{{date}}|{{iso_date}}", &mut Context::new())
        .unwrap();
    let (date, iso) = out.split_once('|').unwrap();
    assert_eq!(date.len(), 8);
    assert!(date.chars().all(|c| c.is_ascii_digit()));
    assert!(iso.starts_with(&format!("{}-{}-{}T", &date[..4], &date[4..6], &date[6..])));
}

#[test]
fn test_formatter() {
    let r = Renderer::new(RendererOptions::new(templates_dir()).format_output(true))
        .formatter(|html: &str| -> webtpl::Result<String> { Ok(format!("{}\n", html.trim())) });
    assert_eq!(
        r.render_string("  <p>x</p>  ", &mut Context::new()).unwrap(),
        "<p>x</p>\n"
    );

    let r = Renderer::new(RendererOptions::new(templates_dir()).format_output(true));
    assert!(matches!(
        r.render_string("<p>x</p>", &mut Context::new()),
        Err(TemplateError::Format(_))
    ));
}
