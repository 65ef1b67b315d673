use std::sync::{Arc, PoisonError, RwLock};

use ahash::AHashMap;

use crate::ast::CompiledExpression;
use crate::config::EngineConfig;
use crate::error::CompileError;
use crate::parser::parse_source;

/// Compiled expressions keyed by their exact source text.
///
/// Entries are only added on successful compiles and only removed by [`ExpressionCache::clear`].
/// Compilation runs outside the lock; when two callers race on the same source the first
/// inserted entry wins and the other compile is discarded.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    config: EngineConfig,
    entries: RwLock<AHashMap<Arc<str>, Arc<CompiledExpression>>>,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            entries: RwLock::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // The map only holds immutable `Arc`s, so a writer that panicked cannot have left it
    // half-updated; recover the guard instead of propagating the poison.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, AHashMap<Arc<str>, Arc<CompiledExpression>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, AHashMap<Arc<str>, Arc<CompiledExpression>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, source: &str) -> Option<Arc<CompiledExpression>> {
        self.read().get(source).cloned()
    }

    pub fn get_or_compile(&self, source: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        if let Some(hit) = self.get(source) {
            log::trace!("expression cache hit: {source:?}");
            return Ok(hit);
        }

        let root = parse_source(source, &self.config).map_err(|err| {
            log::debug!("expression failed to compile: {source:?}: {err}");
            err
        })?;
        let key: Arc<str> = Arc::from(source);
        let compiled = Arc::new(CompiledExpression::new(Arc::clone(&key), root));

        let mut entries = self.write();
        let stored = entries.entry(key).or_insert(compiled);
        log::debug!("expression cache miss, compiled {source:?}");
        Ok(Arc::clone(stored))
    }

    pub fn clear(&self) {
        let mut entries = self.write();
        let dropped = entries.len();
        entries.clear();
        log::debug!("expression cache cleared ({dropped} entries)");
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
