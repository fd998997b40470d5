use crate::error::Result;
use crate::tpl::context::Context;
use crate::tpl::filters::{Filter, apply_all};
use crate::tpl::lexer::{Piece, tokenize};
use crate::value::Value;

/// A token whose name was not in the context at substitution time.
///
/// It is re-resolved during evaluation (loop variables live only there) and
/// otherwise prints as its raw text minus the first and last character.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredToken {
    pub raw: String,
    pub name: String,
    pub attribute: Option<String>,
    pub filters: Vec<Filter>,
}

impl DeferredToken {
    pub fn stripped(&self) -> &str {
        &self.raw[1..self.raw.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Deferred(DeferredToken),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    pub segments: Vec<Segment>,
    /// Last value written in place of a token.
    pub last_value: Option<String>,
    /// Whether any substituted value contained a line break.
    pub multiline: bool,
}

impl Substitution {
    /// The substituted line, with deferred tokens in their brace-stripped form.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Deferred(d) => out.push_str(d.stripped()),
            }
        }
        out
    }

    /// The substituted line as template source again: deferred tokens keep
    /// their original `{{...}}` form so a recompilation still sees them.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Deferred(d) => out.push_str(&d.raw),
            }
        }
        out
    }
}

/// String form of a token's value: the attribute when the value exposes it,
/// else the whole value, then the filters left to right.
pub fn resolve_token(value: &Value, attribute: Option<&str>, filters: &[Filter]) -> String {
    let target = attribute.and_then(|a| value.attr(a)).unwrap_or(value);
    apply_all(target.to_string(), filters)
}

/// Replaces every `{{...}}` token of `line` with its value from `ctx`.
pub fn substitute(line: &str, ctx: &Context) -> Result<Substitution> {
    let mut sub = Substitution::default();

    for piece in tokenize(line) {
        match piece {
            Piece::Text(t) => push_text(&mut sub.segments, t),
            Piece::Token(token) => {
                let filters = token
                    .filters
                    .iter()
                    .map(|f| Filter::lookup(f))
                    .collect::<Result<Vec<_>>>()?;

                match ctx.get(token.name) {
                    Some(value) => {
                        let text = resolve_token(value, token.attribute, &filters);
                        sub.multiline |= text.contains('\n');
                        push_text(&mut sub.segments, &text);
                        sub.last_value = Some(text);
                    }
                    None => sub.segments.push(Segment::Deferred(DeferredToken {
                        raw: token.raw.to_string(),
                        name: token.name.to_string(),
                        attribute: token.attribute.map(str::to_string),
                        filters,
                    })),
                }
            }
        }
    }
    Ok(sub)
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}
