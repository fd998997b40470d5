use crate::tpl::context::Context;
use crate::value::Value;

/// Execution scope of one evaluation: the context, the loop variables bound
/// so far, and the output buffer under its reserved name.
pub struct Scope<'a> {
    root: &'a Context,
    locals: Vec<(String, Value)>,
    buffer_name: &'a str,
    output: Value,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a Context, buffer_name: &'a str) -> Self {
        Self {
            root,
            locals: Vec::new(),
            buffer_name,
            output: Value::List(Vec::new()),
        }
    }

    pub fn push(&mut self, key: &str, value: Value) {
        self.locals.push((key.to_string(), value));
    }

    pub fn pop(&mut self) {
        self.locals.pop();
    }

    pub fn append(&mut self, line: String) {
        if let Value::List(lines) = &mut self.output {
            lines.push(Value::Str(line));
        }
    }

    /// Buffer entries in append order.
    pub fn into_output(self) -> Vec<String> {
        match self.output {
            Value::List(lines) => lines.into_iter().map(|v| v.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&Value> {
        // locals, then the output buffer, then the context
        if let Some(v) = self.get_from_scope(key) {
            return Some(v);
        }

        // dotted path, e.g. "article.title"
        let (head, rest) = key.split_once('.')?;
        Self::resolve_path(self.get_from_scope(head)?, rest)
    }

    fn get_from_scope(&self, key: &str) -> Option<&Value> {
        // innermost loop variable wins
        if let Some((_, v)) = self.locals.iter().rev().find(|(k, _)| k == key) {
            return Some(v);
        }
        if key == self.buffer_name {
            return Some(&self.output);
        }
        self.root.get(key)
    }

    fn resolve_path<'v>(mut current: &'v Value, path: &str) -> Option<&'v Value> {
        for part in path.split('.') {
            current = current.attr(part)?;
        }
        Some(current)
    }
}
