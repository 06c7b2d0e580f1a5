//! Memoization of compiled expressions

use super::error::CompileError;
use super::expression::CompiledExpression;
use rustc_hash::FxHashMap;

/// Compiled expressions keyed by their text
///
/// Failures are cached too, so a malformed rule shared by many types is parsed
/// only once.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: FxHashMap<String, Result<CompiledExpression, CompileError>>,
    hits: usize,
}

impl ExpressionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the compiled form of `text`, compiling it on first use
    pub fn get_or_compile(&mut self, text: &str) -> Result<CompiledExpression, CompileError> {
        if let Some(entry) = self.entries.get(text) {
            self.hits += 1;
            return entry.clone();
        }
        let entry = super::compile(text);
        self.entries.insert(text.to_string(), entry.clone());
        entry
    }

    /// Number of distinct texts seen
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been compiled yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered without compiling
    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_compile_once() {
        let mut cache = ExpressionCache::new();
        assert!(cache.is_empty());

        cache.get_or_compile("name.exists()").unwrap();
        cache.get_or_compile("name.exists()").unwrap();
        assert!(cache.get_or_compile("name.exists(").is_err());
        assert!(cache.get_or_compile("name.exists(").is_err());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 2);
    }
}
