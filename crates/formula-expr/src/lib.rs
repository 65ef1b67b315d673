#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Embedded expression engine for record filters, validation rules, visibility conditions and
//! formula fields.
//!
//! ```text
//! amount > 1000 && stage == 'Closed Won'
//! contains(name, 'Acme') || STARTS_WITH(code, 'EU-')
//! IF(prior__stage != stage, DATE_ADD(TODAY(), 7), due_date)
//! ```
//!
//! Source text is lexed and parsed into an immutable [`Node`] tree, cached by exact source in
//! the [`Engine`], and evaluated against a [`Context`] of field values. The language is pure:
//! no assignments, no loops, no I/O. Unknown fields read as `Null`.
//!
//! ## Conditions
//!
//! [`Engine::evaluate_as_bool`] is fail-closed: syntax errors, type errors and unknown
//! functions all yield `false`. Use [`Engine::evaluate`] when the error matters.
//!
//! ## SQL
//!
//! [`Engine::to_sql`] renders a filter as a parameterized `WHERE` fragment so that the same
//! expression can be pushed down to the database.

mod ast;
mod cache;
mod config;
mod context;
mod engine;
mod error;
mod eval;
pub mod functions;
mod lexer;
mod parallel;
mod parser;
mod sql;
mod value;

pub use crate::ast::{BinaryOp, CompiledExpression, Node, UnaryOp};
pub use crate::cache::ExpressionCache;
pub use crate::config::{ConfigError, EngineConfig};
pub use crate::context::{Context, ContextBuilder, ContextError, KEY_SEPARATOR};
pub use crate::engine::{Engine, Validation};
pub use crate::error::{
    CompileError, EvalError, EvalErrorKind, ExprError, LexError, ParseError, SqlError,
};
pub use crate::eval::{evaluate, values_equal, Evaluator};
pub use crate::functions::{FunctionCategory, FunctionDescriptor};
pub use crate::lexer::{tokenize, Operator, Punct, Token, TokenKind};
pub use crate::parser::{parse, parse_source};
pub use crate::sql::{to_sql, SqlPredicate};
pub use crate::value::Value;
