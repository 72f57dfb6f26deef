//! Session configuration with nested scopes
//!
//! The deparser must not observe ambient search-path state, so the bridge
//! clears `search_path` inside a scope whose guard restores the prior value
//! unconditionally on drop, including on early error return and unwind.

use std::cell::RefCell;
use std::collections::HashMap;

const DEFAULT_SEARCH_PATH: &str = "\"$user\", public";

#[derive(Debug, Default)]
struct Inner {
    options: HashMap<String, String>,
    /// One frame per open scope; each records `(name, prior value)` for
    /// every option set while the scope was innermost.
    scopes: Vec<Vec<(String, Option<String>)>>,
}

/// Session-scoped option store. Single-threaded, like the planning call
/// it participates in.
#[derive(Debug)]
pub struct SessionConfig {
    inner: RefCell<Inner>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        let config = Self { inner: RefCell::new(Inner::default()) };
        config.set("search_path", DEFAULT_SEARCH_PATH);
        config
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.borrow().options.get(name).cloned()
    }

    /// Set an option. Inside a scope the prior value is recorded so the
    /// scope guard can restore it.
    pub fn set(&self, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let prior = inner.options.insert(name.to_string(), value.to_string());
        if let Some(frame) = inner.scopes.last_mut() {
            frame.push((name.to_string(), prior));
        }
    }

    /// Open a nested scope. Dropping the guard restores every option the
    /// scope touched, innermost first.
    pub fn scope(&self) -> ConfigScope<'_> {
        self.inner.borrow_mut().scopes.push(Vec::new());
        ConfigScope { config: self }
    }

    /// Schemas on the active search path. `$user` entries are skipped: the
    /// bridge has no session user to resolve them against.
    pub fn search_path(&self) -> Vec<String> {
        self.get("search_path")
            .unwrap_or_default()
            .split(',')
            .map(|part| part.trim().trim_matches('"').to_string())
            .filter(|part| !part.is_empty() && part != "$user")
            .collect()
    }

    fn pop_scope(&self) {
        let mut inner = self.inner.borrow_mut();
        let frame = inner.scopes.pop().unwrap_or_default();
        for (name, prior) in frame.into_iter().rev() {
            match prior {
                Some(value) => inner.options.insert(name, value),
                None => inner.options.remove(&name),
            };
        }
    }
}

/// RAII guard for one configuration scope.
pub struct ConfigScope<'a> {
    config: &'a SessionConfig,
}

impl ConfigScope<'_> {
    pub fn set(&self, name: &str, value: &str) {
        self.config.set(name, value);
    }
}

impl Drop for ConfigScope<'_> {
    fn drop(&mut self) {
        self.config.pop_scope();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_restores_on_drop() {
        let config = SessionConfig::new();
        assert_eq!(config.get("search_path").as_deref(), Some(DEFAULT_SEARCH_PATH));

        {
            let scope = config.scope();
            scope.set("search_path", "");
            assert_eq!(config.get("search_path").as_deref(), Some(""));
        }

        assert_eq!(config.get("search_path").as_deref(), Some(DEFAULT_SEARCH_PATH));
    }

    #[test]
    fn test_scope_restores_unset_option() {
        let config = SessionConfig::new();
        {
            let scope = config.scope();
            scope.set("work_mem", "64MB");
            assert_eq!(config.get("work_mem").as_deref(), Some("64MB"));
        }
        assert!(config.get("work_mem").is_none());
    }

    #[test]
    fn test_nested_scopes_restore_in_order() {
        let config = SessionConfig::new();
        config.set("search_path", "app");

        let outer = config.scope();
        outer.set("search_path", "outer");
        {
            let inner = config.scope();
            inner.set("search_path", "inner");
            assert_eq!(config.get("search_path").as_deref(), Some("inner"));
        }
        assert_eq!(config.get("search_path").as_deref(), Some("outer"));
        drop(outer);
        assert_eq!(config.get("search_path").as_deref(), Some("app"));
    }

    #[test]
    fn test_scope_restores_on_unwind() {
        let config = SessionConfig::new();
        config.set("search_path", "app");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let scope = config.scope();
            scope.set("search_path", "");
            panic!("rendering failed");
        }));

        assert!(result.is_err());
        assert_eq!(config.get("search_path").as_deref(), Some("app"));
    }

    #[test]
    fn test_search_path_parsing() {
        let config = SessionConfig::new();
        assert_eq!(config.search_path(), vec!["public".to_string()]);

        config.set("search_path", "app, public");
        assert_eq!(config.search_path(), vec!["app".to_string(), "public".to_string()]);

        config.set("search_path", "");
        assert!(config.search_path().is_empty());
    }
}
