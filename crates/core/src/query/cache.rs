//! Parsed-query cache, keyed by raw query string.

use std::collections::HashMap;
use std::sync::Arc;

use chronarc_domain::errors::ChronarcError;
use chronarc_domain::types::classification::Expr;
use parking_lot::RwLock;

use super::parser::parse;

#[derive(Default)]
pub struct QueryCache {
    parsed: RwLock<HashMap<String, Arc<Expr>>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `raw`, reusing a cached tree when the exact string has been
    /// seen before.
    pub fn get_or_parse(&self, raw: &str) -> Result<Arc<Expr>, ChronarcError> {
        if let Some(expr) = self.parsed.read().get(raw) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(parse(raw)?);
        self.parsed.write().insert(raw.to_string(), Arc::clone(&expr));
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_identical_strings() {
        let cache = QueryCache::new();
        let a = cache.get_or_parse("title:acme").unwrap();
        let b = cache.get_or_parse("title:acme").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn propagates_parse_errors() {
        let cache = QueryCache::new();
        assert!(cache.get_or_parse("bogus:value").is_err());
    }
}
