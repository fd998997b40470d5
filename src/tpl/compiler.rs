use crate::error::{Result, TemplateError};
use crate::tpl::statement::{Compiled, ControlStatement, Keyword, Statement};

struct KeywordRule {
    keyword: Keyword,
    requires_condition: bool,
    indent_delta: i32,
    next_indent_delta: i32,
}

const KEYWORDS: [(&str, KeywordRule); 5] = [
    (
        "if",
        KeywordRule {
            keyword: Keyword::If,
            requires_condition: true,
            indent_delta: 0,
            next_indent_delta: 2,
        },
    ),
    (
        "elif",
        KeywordRule {
            keyword: Keyword::Elif,
            requires_condition: true,
            indent_delta: -2,
            next_indent_delta: 0,
        },
    ),
    (
        "else",
        KeywordRule {
            keyword: Keyword::Else,
            requires_condition: false,
            indent_delta: -2,
            next_indent_delta: 0,
        },
    ),
    (
        "for",
        KeywordRule {
            keyword: Keyword::For,
            requires_condition: true,
            indent_delta: 0,
            next_indent_delta: 2,
        },
    ),
    (
        "end",
        KeywordRule {
            keyword: Keyword::End,
            requires_condition: false,
            indent_delta: -2,
            next_indent_delta: -2,
        },
    ),
];

pub fn is_control_line(line: &str) -> bool {
    line.contains("{%") && line.contains("%}")
}

/// Compiles one line at the running `indent`. `line_no` is 1-based and only
/// used for error reporting.
pub fn compile_line(line: &str, line_no: usize, indent: i32, buffer: &str) -> Result<Compiled> {
    if !is_control_line(line) {
        return Ok(Compiled::Literal(Statement::new(
            line,
            indent,
            Some(indent),
            buffer,
        )));
    }

    let (name, condition) = split_tag(line)
        .ok_or_else(|| TemplateError::grammar(line_no, line, "statement not found"))?;

    let rule = KEYWORDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, r)| r)
        .ok_or_else(|| {
            TemplateError::grammar(line_no, line, format!("statement `{}` not found", name))
        })?;

    if rule.requires_condition != condition.is_some() {
        let reason = if rule.requires_condition {
            format!("statement `{}` requires a condition", name)
        } else {
            format!("statement `{}` does not take a condition", name)
        };
        return Err(TemplateError::grammar(line_no, line, reason));
    }

    Ok(Compiled::Control(ControlStatement::new(
        rule.keyword,
        condition.map(str::to_string),
        indent + rule.indent_delta,
        indent + rule.next_indent_delta,
    )))
}

/// Compiles `lines` in order, carrying the indent of each statement into the next.
pub fn compile_lines<'a, I>(lines: I, buffer: &str) -> Result<Vec<Compiled>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut indent = 0;
    let mut out = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        let compiled = compile_line(line, i + 1, indent, buffer)?;
        indent = compiled.next_indent();
        out.push(compiled);
    }
    Ok(out)
}

/// Splits `{% keyword condition %}` into its keyword and optional condition.
fn split_tag(line: &str) -> Option<(&str, Option<&str>)> {
    let start = line.find("{% ")?;
    let rest = &line[start + 3..];
    let end = rest.rfind(" %}")?;
    let inner = &rest[..end];

    let kw_len = inner
        .bytes()
        .take_while(|b| b.is_ascii_lowercase())
        .count();
    if kw_len == 0 {
        return None;
    }
    let (keyword, condition) = inner.split_at(kw_len);
    let condition = condition.trim();
    Some((keyword, (!condition.is_empty()).then_some(condition)))
}
