//! Regular expressions for `matches`
//!
//! Patterns match the whole string with `.` spanning newlines. Literal patterns
//! are compiled with the expression; patterns computed during evaluation go
//! through a process-wide cache.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Entries kept before the dynamic pattern cache is cleared
const PATTERN_CACHE_LIMIT: usize = 1024;

static PATTERN_CACHE: Lazy<DashMap<String, Arc<Regex>>> = Lazy::new(DashMap::new);

/// Wrap a pattern so it must match the entire input
pub fn anchored(pattern: &str) -> String {
    format!("^(?s:{pattern})$")
}

/// Compile a pattern for `matches`
pub fn compile_pattern(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    Regex::new(&anchored(pattern)).map(Arc::new)
}

/// Compile a pattern through the shared cache
pub fn cached_pattern(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    if let Some(regex) = PATTERN_CACHE.get(pattern) {
        return Ok(Arc::clone(regex.value()));
    }

    let regex = compile_pattern(pattern)?;
    if PATTERN_CACHE.len() >= PATTERN_CACHE_LIMIT {
        log::debug!("dynamic pattern cache reached {PATTERN_CACHE_LIMIT} entries, clearing");
        PATTERN_CACHE.clear();
    }
    PATTERN_CACHE.insert(pattern.to_string(), Arc::clone(&regex));
    Ok(regex)
}
