use crate::error::Result;

/// Pretty-printer applied to a rendered page when formatting is requested.
pub trait HtmlFormatter: Send + Sync {
    fn format(&self, html: &str) -> Result<String>;
}

impl<F> HtmlFormatter for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn format(&self, html: &str) -> Result<String> {
        self(html)
    }
}
