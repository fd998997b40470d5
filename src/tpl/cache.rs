use crate::error::Result;
use crate::tpl::compiler::compile_lines;
use crate::tpl::statement::Compiled;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

#[derive(Clone)]
pub struct CachedTemplate {
    pub statements: Arc<Vec<Compiled>>,
    pub content_hash: u64,
}

/// Compiled statement streams by template name.
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

/// Compiled statements of `content`, reused while the template's content
/// (after include resolution) and buffer name stay the same.
pub(crate) fn get_statements(
    template_name: &str,
    content: &str,
    buffer: &str,
) -> Result<Arc<Vec<Compiled>>> {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    buffer.hash(&mut hasher);
    let new_hash = hasher.finish();

    if let Some(cached) = TEMPLATE_CACHE.get(template_name) {
        if cached.content_hash == new_hash {
            return Ok(cached.statements.clone());
        }
    }

    let statements = Arc::new(compile_lines(content.split('\n'), buffer)?);
    TEMPLATE_CACHE.insert(
        template_name.to_string(),
        CachedTemplate {
            statements: statements.clone(),
            content_hash: new_hash,
        },
    );
    Ok(statements)
}

/// Drops the compiled form of a template.
pub fn remove_template(template_name: &str) {
    TEMPLATE_CACHE.remove(template_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tpl::statement::DEFAULT_BUFFER;

    #[test]
    fn test_reuses_until_content_changes() {
        let a = get_statements("cache_test.html", "a\nb", DEFAULT_BUFFER).unwrap();
        let b = get_statements("cache_test.html", "a\nb", DEFAULT_BUFFER).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = get_statements("cache_test.html", "a\nc", DEFAULT_BUFFER).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.len(), 2);

        remove_template("cache_test.html");
        assert!(TEMPLATE_CACHE.get("cache_test.html").is_none());
    }

    #[test]
    fn test_compile_errors_are_not_cached() {
        assert!(get_statements("cache_bad.html", "{% if %}", DEFAULT_BUFFER).is_err());
        assert!(TEMPLATE_CACHE.get("cache_bad.html").is_none());
    }
}
