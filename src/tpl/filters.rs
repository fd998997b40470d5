use crate::error::{Result, TemplateError};
use std::fmt;
use std::str::FromStr;

/// A named pure text transform usable as `{{ name | filter }}`.
///
/// The set is closed: names outside [`FILTERS`] are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Lower,
    Upper,
    Escape,
    AsString,
    Strip,
}

pub static FILTERS: [(&str, Filter); 5] = [
    ("lower", Filter::Lower),
    ("upper", Filter::Upper),
    ("escape", Filter::Escape),
    ("as_string", Filter::AsString),
    ("strip", Filter::Strip),
];

impl Filter {
    pub fn lookup(name: &str) -> Result<Filter> {
        FILTERS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, f)| *f)
            .ok_or_else(|| TemplateError::FilterNotFound(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Filter::Lower => "lower",
            Filter::Upper => "upper",
            Filter::Escape => "escape",
            Filter::AsString => "as_string",
            Filter::Strip => "strip",
        }
    }

    pub fn apply(self, input: &str) -> String {
        match self {
            Filter::Lower => input.to_lowercase(),
            Filter::Upper => input.to_uppercase(),
            Filter::Escape => input.replace('<', "&lt;").replace('>', "&gt;"),
            Filter::AsString => input.to_string(),
            Filter::Strip => input.trim().to_string(),
        }
    }
}

/// Applies `filters` left to right.
pub fn apply_all(input: String, filters: &[Filter]) -> String {
    filters.iter().fold(input, |acc, f| f.apply(&acc))
}

impl FromStr for Filter {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Filter::lookup(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
