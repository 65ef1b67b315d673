//! Built-in function table.
//!
//! Every built-in is declared with `inventory::submit!` next to its implementation; the table is
//! materialized once on first use and never changes afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::{EvalError, EvalErrorKind};
use crate::value::Value;

mod date_time;
mod logical;
mod math;
mod text;

// `inventory` registrations live in modules that nothing else references, so the linker is free
// to drop them (reliably on wasm, occasionally with LTO elsewhere). Touch each module's
// `__force_link()` before reading the table.
fn force_link_inventory_modules() {
    let builtins: &[fn()] = &[
        date_time::__force_link,
        logical::__force_link,
        math::__force_link,
        text::__force_link,
    ];

    for f in builtins {
        let f = std::hint::black_box(*f);
        f();
    }
}

/// Services available to function implementations during one evaluation.
pub trait FunctionContext {
    /// Wall-clock time, captured once per evaluation so `NOW()` is stable within an expression.
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionCategory {
    Text,
    Math,
    Logic,
    Date,
}

pub type FunctionImpl = fn(&dyn FunctionContext, &[Value]) -> Result<Value, EvalError>;

/// A registered built-in.
///
/// `name` is the canonical upper-case spelling; calls match it case-insensitively.
#[derive(Debug)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub category: FunctionCategory,
    pub description: &'static str,
    pub usage: &'static str,
    pub implementation: FunctionImpl,
}

inventory::collect!(FunctionSpec);

impl FunctionSpec {
    pub fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            name: self.name,
            min_args: self.min_args,
            max_args: self.max_args,
            category: self.category,
            description: self.description,
            usage: self.usage,
        }
    }

    pub fn accepts(&self, arg_count: usize) -> bool {
        (self.min_args..=self.max_args).contains(&arg_count)
    }
}

/// Public, serializable view of a built-in (the editor's function list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub category: FunctionCategory,
    pub description: &'static str,
    pub usage: &'static str,
}

fn registry() -> &'static HashMap<String, &'static FunctionSpec> {
    static REGISTRY: OnceLock<HashMap<String, &'static FunctionSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        force_link_inventory_modules();

        let mut map = HashMap::new();
        for spec in inventory::iter::<FunctionSpec> {
            map.insert(spec.name.to_ascii_uppercase(), spec);
        }
        log::debug!("function registry initialized with {} built-ins", map.len());
        map
    })
}

pub fn lookup_function(name: &str) -> Option<&'static FunctionSpec> {
    registry().get(&name.to_ascii_uppercase()).copied()
}

/// Looks up `name` and checks that it accepts `arg_count` arguments.
pub fn resolve_function(name: &str, arg_count: usize) -> Result<&'static FunctionSpec, EvalError> {
    let spec = lookup_function(name).ok_or_else(|| {
        EvalError::new(
            EvalErrorKind::UnknownFunction,
            format!("unknown function '{name}'"),
        )
    })?;

    if !spec.accepts(arg_count) {
        let expected = if spec.min_args == spec.max_args {
            format!("{}", spec.min_args)
        } else {
            format!("{} to {}", spec.min_args, spec.max_args)
        };
        return Err(EvalError::new(
            EvalErrorKind::ArityMismatch,
            format!(
                "{} expects {expected} argument(s), got {arg_count}",
                spec.name
            ),
        ));
    }
    Ok(spec)
}

pub fn call_function(
    ctx: &dyn FunctionContext,
    name: &str,
    args: &[Value],
) -> Result<Value, EvalError> {
    let spec = resolve_function(name, args.len())?;
    (spec.implementation)(ctx, args)
}

/// Descriptors of every built-in, sorted by name. Computed once.
pub fn list_functions() -> &'static [FunctionDescriptor] {
    static LIST: OnceLock<Vec<FunctionDescriptor>> = OnceLock::new();
    LIST.get_or_init(|| {
        let mut list: Vec<FunctionDescriptor> =
            registry().values().map(|spec| spec.descriptor()).collect();
        list.sort_by(|a, b| a.name.cmp(b.name));
        list
    })
}

pub(crate) fn number_arg(fname: &str, args: &[Value], idx: usize) -> Result<f64, EvalError> {
    let value = args.get(idx).unwrap_or(&Value::Null);
    value.to_number().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "{fname} argument {} must be a number, got {}",
            idx + 1,
            value.kind_name()
        ))
    })
}

pub(crate) fn text_arg(args: &[Value], idx: usize) -> String {
    args.get(idx).map(Value::to_text).unwrap_or_default()
}
