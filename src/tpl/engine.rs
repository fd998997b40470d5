use crate::config::RendererOptions;
use crate::error::{Result, TemplateError};
use crate::format::HtmlFormatter;
use crate::store::{DirectoryStore, TemplateSource};
use crate::tpl::ast::{Node, Program, Step};
use crate::tpl::cache;
use crate::tpl::compiler::compile_lines;
use crate::tpl::context::Context;
use crate::tpl::render;
use crate::tpl::statement::{Compiled, ControlStatement};
use crate::tpl::substitute::substitute;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, trace};

const INCLUDE_OPEN: &str = "{% include ";
const INCLUDE_CLOSE: &str = " %}";
const STRING_TEMPLATE: &str = "<string>";

/// Loads, compiles and evaluates templates.
pub struct Renderer {
    options: RendererOptions,
    source: Box<dyn TemplateSource>,
    formatter: Option<Box<dyn HtmlFormatter>>,
}

impl Renderer {
    /// Renderer reading templates from `options.templates_path`.
    pub fn new(options: RendererOptions) -> Self {
        let source = DirectoryStore::new(options.templates_path.clone());
        Self::with_source(options, source)
    }

    pub fn with_source(options: RendererOptions, source: impl TemplateSource + 'static) -> Self {
        Self {
            options,
            source: Box::new(source),
            formatter: None,
        }
    }

    pub fn formatter(mut self, formatter: impl HtmlFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Renders the named template against `ctx`. Included templates see and
    /// may change the same context.
    pub fn render_file(&self, name: &str, ctx: &mut Context) -> Result<String> {
        info!("Rendering file {} ...", name);
        let text = self.source.load(name)?;
        info!("Template loaded from {}.", name);
        let page = self.render_source(name, &text, ctx, &mut Vec::new())?;
        info!("Rendered file {}.", name);
        self.finish(page)
    }

    /// Renders the named template against a fresh context built from `data`.
    pub fn render_file_with<T: ?Sized + Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let mut ctx = Context::from_serialize(data)?;
        debug!("Rendering with data: {:?}", ctx);
        self.render_file(name, &mut ctx)
    }

    /// Renders the named template and saves it to `path`, creating parent
    /// directories. Nothing is written when rendering fails.
    pub fn render_file_to(
        &self,
        name: &str,
        ctx: &mut Context,
        path: impl AsRef<Path>,
    ) -> Result<String> {
        let page = self.render_file(name, ctx)?;
        let path = path.as_ref();
        info!("Saving rendered page to {}...", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TemplateError::io(parent, e))?;
        }
        fs::write(path, &page).map_err(|e| TemplateError::io(path, e))?;
        info!("Saved.");
        Ok(page)
    }

    /// Renders template text supplied by the caller.
    pub fn render_string(&self, text: &str, ctx: &mut Context) -> Result<String> {
        let page = self.render_source(STRING_TEMPLATE, text, ctx, &mut Vec::new())?;
        self.finish(page)
    }

    pub fn render_string_with<T: ?Sized + Serialize>(&self, text: &str, data: &T) -> Result<String> {
        let mut ctx = Context::from_serialize(data)?;
        self.render_string(text, &mut ctx)
    }

    fn finish(&self, page: String) -> Result<String> {
        if !self.options.format_output {
            return Ok(page);
        }
        match &self.formatter {
            Some(formatter) => formatter.format(&page),
            None => Err(TemplateError::Format(
                "output formatting requested but no formatter is configured".into(),
            )),
        }
    }

    /// One template, start to end. `chain` holds the names of the templates
    /// currently being rendered, outermost first.
    fn render_source(
        &self,
        name: &str,
        text: &str,
        ctx: &mut Context,
        chain: &mut Vec<String>,
    ) -> Result<String> {
        ctx.refresh_clock();
        chain.push(name.to_string());
        let resolved = self.resolve_includes(text, ctx, chain);
        chain.pop();
        let resolved = resolved?;

        let buffer = self.options.buffer_name.as_str();
        let statements = cache::get_statements(name, &resolved, buffer)?;
        let steps = self.substitute_all(&statements, ctx, 0)?;
        let program = Program::assemble(steps)?;
        trace!("Program for {}:\n{}", name, program.listing(buffer));

        let lines = render::evaluate(&program, ctx, buffer)?;
        Ok(lines.join("\n"))
    }

    /// Replaces every include directive with the rendered sub-template.
    fn resolve_includes(
        &self,
        text: &str,
        ctx: &mut Context,
        chain: &mut Vec<String>,
    ) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(INCLUDE_OPEN) {
            let after = &rest[start + INCLUDE_OPEN.len()..];
            let Some(end) = after.find(INCLUDE_CLOSE) else {
                break;
            };
            let name = after[..end].trim();
            out.push_str(&rest[..start]);
            out.push_str(&self.include(name, ctx, chain)?);
            rest = &after[end + INCLUDE_CLOSE.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn include(&self, name: &str, ctx: &mut Context, chain: &mut Vec<String>) -> Result<String> {
        let include_error = |reason: String| TemplateError::Include {
            name: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(include_error("missing template name".into()));
        }
        if chain.iter().any(|n| n == name) {
            return Err(include_error(format!(
                "include cycle: {} -> {}",
                chain.join(" -> "),
                name
            )));
        }
        if chain.len() > self.options.max_include_depth {
            return Err(include_error(format!(
                "nesting deeper than {} includes",
                self.options.max_include_depth
            )));
        }
        debug!("Including {} into {}", name, chain.join(" -> "));
        let text = self.source.load(name)?;
        self.render_source(name, &text, ctx, chain)
    }

    /// Substitutes every statement, block headers included. A value spanning
    /// several lines is compiled again and spliced in as a nested block.
    fn substitute_all(
        &self,
        statements: &[Compiled],
        ctx: &Context,
        depth: usize,
    ) -> Result<Vec<Step>> {
        let mut steps = Vec::with_capacity(statements.len());
        for statement in statements {
            let step = match statement {
                Compiled::Control(control) => Step::Control(substitute_header(control, ctx)?),
                Compiled::Literal(literal) => {
                    let sub = substitute(literal.content(), ctx)?;
                    if sub.multiline {
                        trace!("Expanding multi-line value {:?}", sub.last_value);
                        Step::Block(self.expand(&sub.source(), ctx, depth + 1)?)
                    } else {
                        Step::Emit(sub.segments)
                    }
                }
            };
            steps.push(step);
        }
        Ok(steps)
    }

    fn expand(&self, source: &str, ctx: &Context, depth: usize) -> Result<Vec<Node>> {
        if depth > self.options.max_include_depth {
            return Err(TemplateError::Evaluation(format!(
                "multi-line values nested deeper than {} levels",
                self.options.max_include_depth
            )));
        }
        let statements = compile_lines(source.split('\n'), &self.options.buffer_name)?;
        let steps = self.substitute_all(&statements, ctx, depth)?;
        Ok(Program::assemble(steps)?.into_nodes())
    }
}

/// Header tokens resolve against the context like any other line. Tokens
/// still unresolved keep their brace-stripped form.
fn substitute_header(control: &ControlStatement, ctx: &Context) -> Result<ControlStatement> {
    let Some(condition) = control.condition() else {
        return Ok(control.clone());
    };
    let sub = substitute(condition, ctx)?;
    Ok(ControlStatement::new(
        control.keyword(),
        Some(sub.text()),
        control.indent(),
        control.next_indent(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn renderer(templates: &[(&str, &str)]) -> Renderer {
        let store = MemoryStore::new();
        for (name, text) in templates {
            store.insert(*name, *text);
        }
        Renderer::with_source(RendererOptions::default(), store)
    }

    #[test]
    fn test_plain_text_renders_to_itself() {
        let r = renderer(&[]);
        let mut ctx = Context::new();
        let text = "<html>\n  <body></body>\n</html>";
        assert_eq!(r.render_string(text, &mut ctx).unwrap(), text);
    }

    #[test]
    fn test_include_is_spliced() {
        let r = renderer(&[
            ("engine_page.html", "<main>\n{% include engine_nav.html %}\n</main>"),
            ("engine_nav.html", "<nav>{{title}}</nav>"),
        ]);
        let mut ctx = Context::new();
        ctx.insert("title", "Home");
        assert_eq!(
            r.render_file("engine_page.html", &mut ctx).unwrap(),
            "<main>\n<nav>Home</nav>\n</main>"
        );
    }

    #[test]
    fn test_include_cycle() {
        let r = renderer(&[
            ("engine_a.html", "{% include engine_b.html %}"),
            ("engine_b.html", "{% include engine_a.html %}"),
        ]);
        let err = r.render_file("engine_a.html", &mut Context::new()).unwrap_err();
        match err {
            TemplateError::Include { name, reason } => {
                assert_eq!(name, "engine_a.html");
                assert!(reason.contains("engine_a.html -> engine_b.html"), "{}", reason);
            }
            other => panic!("Expected Include, got {:?}", other),
        }
    }

    #[test]
    fn test_include_depth_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(
                format!("engine_d{}.html", i),
                format!("{{% include engine_d{}.html %}}", i + 1),
            );
        }
        store.insert("engine_d5.html", "bottom");
        let options = RendererOptions::default().max_include_depth(3);
        let r = Renderer::with_source(options, store);
        assert!(matches!(
            r.render_file("engine_d0.html", &mut Context::new()),
            Err(TemplateError::Include { .. })
        ));

        let r = Renderer::with_source(RendererOptions::default(), {
            let s = MemoryStore::new();
            s.insert("engine_d0.html", "{% include engine_d1.html %}");
            s.insert("engine_d1.html", "bottom");
            s
        });
        assert_eq!(r.render_file("engine_d0.html", &mut Context::new()).unwrap(), "bottom");
    }

    #[test]
    fn test_header_tokens_are_substituted() {
        let r = renderer(&[]);
        let mut ctx = Context::new();
        ctx.insert("field", "tags");
        ctx.insert("tags", vec!["rust", "web"]);
        let text = "{% for t in {{field}} %}\n#{{t}}\n{% end %}";
        assert_eq!(r.render_string(text, &mut ctx).unwrap(), "#rust\n#web");
    }

    #[test]
    fn test_multiline_value_is_rendered() {
        let r = renderer(&[]);
        let mut ctx = Context::new();
        ctx.insert("body", "<p>{{author}}</p>\n{% if show %}\n<p>shown</p>\n{% end %}");
        ctx.insert("author", "Ann");
        ctx.insert("show", true);
        assert_eq!(
            r.render_string("<div>\n{{body}}\n</div>", &mut ctx).unwrap(),
            "<div>\n<p>Ann</p>\n<p>shown</p>\n</div>"
        );
    }

    #[test]
    fn test_self_referencing_value_is_bounded() {
        let r = Renderer::with_source(RendererOptions::default().max_include_depth(4), MemoryStore::new());
        let mut ctx = Context::new();
        ctx.insert("loop", "{{loop}}\nx");
        assert!(matches!(
            r.render_string("{{loop}}", &mut ctx),
            Err(TemplateError::Evaluation(_))
        ));
    }

    #[test]
    fn test_format_without_formatter() {
        let options = RendererOptions::default().format_output(true);
        let r = Renderer::with_source(options, MemoryStore::new());
        assert!(matches!(
            r.render_string("x", &mut Context::new()),
            Err(TemplateError::Format(_))
        ));

        let r = Renderer::with_source(RendererOptions::default().format_output(true), MemoryStore::new())
            .formatter(|html: &str| -> Result<String> { Ok(html.to_uppercase()) });
        assert_eq!(r.render_string("<p>x</p>", &mut Context::new()).unwrap(), "<P>X</P>");
    }
}
