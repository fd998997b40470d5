use crate::error::{Result, TemplateError};
use crate::tpl::statement::DEFAULT_BUFFER;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Renderer settings. Usually read from the `[Renderer]` section of the
/// site's `settings.toml`; missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Directory templates are read from.
    pub templates_path: PathBuf,
    /// Name the output buffer is bound to during evaluation.
    pub buffer_name: String,
    /// Bound on nested includes and on recursive expansion of multi-line values.
    pub max_include_depth: usize,
    /// Pass rendered pages through the configured HTML formatter.
    pub format_output: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from("templates"),
            buffer_name: DEFAULT_BUFFER.to_string(),
            max_include_depth: 16,
            format_output: false,
        }
    }
}

impl RendererOptions {
    pub fn new(templates_path: impl Into<PathBuf>) -> Self {
        Self {
            templates_path: templates_path.into(),
            ..Self::default()
        }
    }

    pub fn buffer_name(mut self, buffer_name: impl Into<String>) -> Self {
        self.buffer_name = buffer_name.into();
        self
    }

    pub fn max_include_depth(mut self, max_include_depth: usize) -> Self {
        self.max_include_depth = max_include_depth;
        self
    }

    pub fn format_output(mut self, format_output: bool) -> Self {
        self.format_output = format_output;
        self
    }

    /// Parses options from TOML text, optionally from one `section` of it.
    pub fn from_toml(text: &str, section: Option<&str>) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(text).map_err(|e| TemplateError::Config(e.to_string()))?;
        let value = match section {
            Some(name) => table
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::Config(format!("section {} not found", name)))?,
            None => toml::Value::Table(table),
        };
        let options: Self = value
            .try_into()
            .map_err(|e: toml::de::Error| TemplateError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_toml_file(path: impl AsRef<Path>, section: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| TemplateError::io(path, e))?;
        Self::from_toml(&text, section)
    }

    fn validate(&self) -> Result<()> {
        let valid_name = !self.buffer_name.is_empty()
            && self
                .buffer_name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b == b'_');
        if !valid_name {
            return Err(TemplateError::Config(format!(
                "buffer_name `{}` must match [a-z_]+",
                self.buffer_name
            )));
        }
        if self.max_include_depth == 0 {
            return Err(TemplateError::Config(
                "max_include_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
