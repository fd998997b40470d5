use crate::error::{Result, TemplateError};
use crate::tpl::ast::{Node, Program};
use crate::tpl::context::Context;
use crate::tpl::expr::ForHeader;
use crate::tpl::render_context::Scope;
use crate::tpl::substitute::{Segment, resolve_token};
use crate::value::Value;

/// Runs `program` in a fresh scope over `ctx` and returns the buffer entries.
pub(crate) fn evaluate(program: &Program, ctx: &Context, buffer_name: &str) -> Result<Vec<String>> {
    let mut scope = Scope::new(ctx, buffer_name);
    render(program.nodes(), &mut scope)?;
    Ok(scope.into_output())
}

pub(crate) fn render(nodes: &[Node], scope: &mut Scope) -> Result<()> {
    for node in nodes {
        match node {
            Node::Emit(segments) => {
                let line = emit_line(segments, scope);
                scope.append(line);
            }
            Node::Block(children) => render(children, scope)?,
            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = None;
                for (cond, body) in branches {
                    if cond.eval(scope)?.is_truthy() {
                        taken = Some(body);
                        break;
                    }
                }
                if let Some(body) = taken.or(otherwise.as_ref()) {
                    render(body, scope)?;
                }
            }
            Node::For { header, body } => {
                let items = iterate(header, scope)?;
                for item in items {
                    bind(header, item, scope)?;
                    let result = render(body, scope);
                    for _ in &header.targets {
                        scope.pop();
                    }
                    result?;
                }
            }
        }
    }
    Ok(())
}

fn emit_line(segments: &[Segment], scope: &Scope) -> String {
    let mut line = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) => line.push_str(t),
            Segment::Deferred(d) => match scope.lookup(&d.name) {
                Some(v) => line.push_str(&resolve_token(v, d.attribute.as_deref(), &d.filters)),
                None => line.push_str(d.stripped()),
            },
        }
    }
    line
}

fn iterate(header: &ForHeader, scope: &Scope) -> Result<Vec<Value>> {
    match header.seq.eval(scope)? {
        Value::List(items) => Ok(items),
        Value::Map(m) => Ok(m.into_keys().map(Value::Str).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(TemplateError::Evaluation(format!(
            "{} is not iterable",
            other.type_name()
        ))),
    }
}

fn bind(header: &ForHeader, item: Value, scope: &mut Scope) -> Result<()> {
    if let [target] = header.targets.as_slice() {
        scope.push(target, item);
        return Ok(());
    }
    match item {
        Value::List(parts) if parts.len() == header.targets.len() => {
            for (target, part) in header.targets.iter().zip(parts) {
                scope.push(target, part);
            }
            Ok(())
        }
        other => Err(TemplateError::Evaluation(format!(
            "cannot unpack {} into {} names",
            other.type_name(),
            header.targets.len()
        ))),
    }
}
