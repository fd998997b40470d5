use crate::error::{Result, TemplateError};
use anyhow::Context as _;
use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// Where the renderer reads template text from, by name.
pub trait TemplateSource: Send + Sync {
    fn load(&self, name: &str) -> Result<String>;
}

/// Templates read from files under one root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(TemplateError::TemplateNotFound(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateSource for DirectoryStore {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.resolve(name)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TemplateError::TemplateNotFound(name.to_string()))
            }
            Err(e) => Err(TemplateError::io(path, e)),
        }
    }
}

/// Templates held in memory, by name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    templates: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template and returns the previous text.
    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) -> Option<String> {
        self.templates.insert(name.into(), text.into())
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.templates.remove(name).map(|(_, text)| text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Loads every file under `dir_path`, named by its `/`-separated relative path.
    pub fn from_dir(dir_path: &Path) -> anyhow::Result<Self> {
        let store = Self::new();
        for entry in WalkDir::new(dir_path).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read template {}", path.display()))?;
            let name = relative_name(dir_path, path)?;
            store.insert(name, text);
        }
        Ok(store)
    }
}

impl TemplateSource for MemoryStore {
    fn load(&self, name: &str) -> Result<String> {
        self.templates
            .get(name)
            .map(|t| t.value().clone())
            .ok_or_else(|| TemplateError::TemplateNotFound(name.to_string()))
    }
}

fn relative_name(root: &Path, path: &Path) -> anyhow::Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

static ASSETS: LazyLock<MemoryStore> = LazyLock::new(MemoryStore::new);

/// Registers templates embedded at compile time by `template_assets!`.
pub fn load_assets(assets: Vec<(&str, &str)>) -> anyhow::Result<()> {
    for (name, text) in assets {
        if ASSETS.insert(name, text).is_some() {
            anyhow::bail!("duplicate embedded template: '{}'", name);
        }
    }
    Ok(())
}

/// The process-wide store filled by `template_assets!`.
pub fn embedded() -> &'static MemoryStore {
    &ASSETS
}

/// [`TemplateSource`] over the embedded templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedStore;

impl TemplateSource for EmbeddedStore {
    fn load(&self, name: &str) -> Result<String> {
        ASSETS.load(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("partials")).unwrap();
        fs::write(dir.path().join("partials/nav.html"), "<nav></nav>").unwrap();

        let store = DirectoryStore::new(dir.path());
        assert_eq!(store.load("partials/nav.html").unwrap(), "<nav></nav>");
        assert!(matches!(
            store.load("missing.html"),
            Err(TemplateError::TemplateNotFound(n)) if n == "missing.html"
        ));
        assert!(matches!(
            store.load("../etc/passwd"),
            Err(TemplateError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_memory_store_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.html"), "top").unwrap();
        fs::write(dir.path().join("a/b/deep.html"), "deep").unwrap();

        let store = MemoryStore::from_dir(dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load("top.html").unwrap(), "top");
        assert_eq!(store.load("a/b/deep.html").unwrap(), "deep");

        assert_eq!(store.remove("top.html").as_deref(), Some("top"));
        assert!(!store.contains("top.html"));
    }

    #[test]
    fn test_load_assets_rejects_duplicates() {
        load_assets(vec![("store_test/one.html", "1")]).unwrap();
        assert_eq!(EmbeddedStore.load("store_test/one.html").unwrap(), "1");
        assert!(load_assets(vec![("store_test/one.html", "again")]).is_err());
        assert!(embedded().contains("store_test/one.html"));
    }
}
