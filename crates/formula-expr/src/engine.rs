use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::ast::CompiledExpression;
use crate::cache::ExpressionCache;
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{CompileError, EvalError, ExprError};
use crate::eval::Evaluator;
use crate::functions::{self, FunctionDescriptor};
use crate::parallel::filter_indices;
use crate::sql::{self, SqlPredicate};
use crate::value::Value;

/// Outcome of a syntax check, shaped for the expression editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Process-wide entry point: compiles through a shared cache and evaluates against contexts.
///
/// `Engine` is `Send + Sync`; share one instance (for example behind an `Arc`) across threads.
#[derive(Debug, Default)]
pub struct Engine {
    cache: ExpressionCache,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            cache: ExpressionCache::with_config(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.cache.config()
    }

    /// Parses `source` (or fetches it from the cache) without evaluating it.
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledExpression>, CompileError> {
        self.cache.get_or_compile(source)
    }

    pub fn evaluate(&self, source: &str, context: &Context) -> Result<Value, ExprError> {
        let compiled = self.compile(source)?;
        Ok(self.evaluate_compiled(&compiled, context)?)
    }

    pub fn evaluate_compiled(
        &self,
        compiled: &CompiledExpression,
        context: &Context,
    ) -> Result<Value, EvalError> {
        Evaluator::new(context).eval(&compiled.root)
    }

    /// Evaluates a condition, treating every failure as `false`.
    ///
    /// Used for visibility rules and guards where an unusable condition must not grant access.
    pub fn evaluate_as_bool(&self, source: &str, context: &Context) -> bool {
        match self.evaluate(source, context) {
            Ok(value) => value.is_truthy(),
            Err(err) => {
                log::debug!("condition {source:?} evaluated to false after error: {err}");
                false
            }
        }
    }

    pub fn validate(&self, source: &str) -> Validation {
        match self.compile(source) {
            Ok(_) => Validation {
                valid: true,
                error: None,
            },
            Err(err) => Validation {
                valid: false,
                error: Some(err.to_string()),
            },
        }
    }

    /// Indices of the records for which `source` is truthy, in input order.
    ///
    /// Compiles once; the first evaluation error aborts the whole batch. All records see the
    /// same `NOW()`.
    pub fn filter_records(
        &self,
        source: &str,
        records: &[Context],
    ) -> Result<Vec<usize>, ExprError> {
        let compiled = self.compile(source)?;
        let now = Utc::now();
        let kept = filter_indices(records, |record| {
            Evaluator::with_clock(record, now)
                .eval(&compiled.root)
                .map(|value| value.is_truthy())
        })?;
        log::debug!(
            "filter {source:?} kept {} of {} records",
            kept.len(),
            records.len()
        );
        Ok(kept)
    }

    /// Translates a filter into a parameterized SQL `WHERE` fragment.
    pub fn to_sql(&self, source: &str) -> Result<SqlPredicate, ExprError> {
        let compiled = self.compile(source)?;
        Ok(sql::to_sql(&compiled.root)?)
    }

    pub fn list_functions(&self) -> &'static [FunctionDescriptor] {
        functions::list_functions()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
