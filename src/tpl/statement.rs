use std::fmt;

/// Name the evaluator binds the output buffer to unless configured otherwise.
pub const DEFAULT_BUFFER: &str = "output";

/// Content of an `end` statement: it emits nothing.
pub const NOOP: &str = "...";

/// A literal line that appends its (substituted) content to the output buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    content: String,
    indent: i32,
    next_indent: i32,
    buffer: String,
}

impl Statement {
    pub fn new(
        content: impl Into<String>,
        indent: i32,
        next_indent: Option<i32>,
        buffer: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            indent,
            next_indent: next_indent.unwrap_or(indent),
            buffer: buffer.into(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn indent(&self) -> i32 {
        self.indent
    }

    pub fn next_indent(&self) -> i32 {
        self.next_indent
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Elif,
    Else,
    For,
    End,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::End => "end",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{% keyword [condition] %}` line.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStatement {
    keyword: Keyword,
    condition: Option<String>,
    indent: i32,
    next_indent: i32,
}

impl ControlStatement {
    pub fn new(keyword: Keyword, condition: Option<String>, indent: i32, next_indent: i32) -> Self {
        Self {
            keyword,
            condition,
            indent,
            next_indent,
        }
    }

    pub fn keyword(&self) -> Keyword {
        self.keyword
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn indent(&self) -> i32 {
        self.indent
    }

    pub fn next_indent(&self) -> i32 {
        self.next_indent
    }

    /// Header text of the block this statement opens, or [`NOOP`] for `end`.
    pub fn content(&self) -> String {
        match (self.keyword, &self.condition) {
            (Keyword::End, _) => NOOP.to_string(),
            (kw, Some(cond)) => format!("{} {}:", kw, cond),
            (kw, None) => format!("{}:", kw),
        }
    }
}

/// One compiled template line.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    Literal(Statement),
    Control(ControlStatement),
}

impl Compiled {
    pub fn indent(&self) -> i32 {
        match self {
            Compiled::Literal(s) => s.indent(),
            Compiled::Control(c) => c.indent(),
        }
    }

    pub fn next_indent(&self) -> i32 {
        match self {
            Compiled::Literal(s) => s.next_indent(),
            Compiled::Control(c) => c.next_indent(),
        }
    }
}

pub(crate) fn pad(indent: i32) -> String {
    " ".repeat(indent.max(0) as usize)
}

pub(crate) fn quote(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 2);
    out.push('"');
    for c in content.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Literal(s) => write!(
                f,
                "{}{}.append({})",
                pad(s.indent()),
                s.buffer(),
                quote(s.content())
            ),
            Compiled::Control(c) => write!(f, "{}{}", pad(c.indent()), c.content()),
        }
    }
}
