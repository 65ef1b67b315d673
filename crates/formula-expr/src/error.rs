use serde::Serialize;
use thiserror::Error;

/// The source text contains a character sequence that is not a token.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} (at {position})")]
pub struct LexError {
    /// Byte offset into the source.
    pub position: usize,
    pub message: String,
}

impl LexError {
    #[must_use]
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// The token stream does not reduce to a single complete expression.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} (at {position})")]
pub struct ParseError {
    /// Byte offset into the source.
    pub position: usize,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Errors raised while turning source text into an AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl CompileError {
    pub fn position(&self) -> usize {
        match self {
            CompileError::Lex(e) => e.position,
            CompileError::Parse(e) => e.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EvalErrorKind {
    TypeMismatch,
    DivisionByZero,
    UnknownFunction,
    ArityMismatch,
}

impl EvalErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EvalErrorKind::TypeMismatch => "type mismatch",
            EvalErrorKind::DivisionByZero => "division by zero",
            EvalErrorKind::UnknownFunction => "unknown function",
            EvalErrorKind::ArityMismatch => "arity mismatch",
        }
    }
}

impl std::fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ill-typed operation, unknown function, wrong arity or division by zero met while
/// evaluating against a specific context.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
}

impl EvalError {
    #[must_use]
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::TypeMismatch, message)
    }

    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "cannot divide by zero")
    }
}

/// A filter that has no SQL rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot translate to SQL: {0}")]
pub struct SqlError(pub String);

/// Any failure surfaced by [`crate::Engine`] entry points that return errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Sql(#[from] SqlError),
}

impl From<LexError> for ExprError {
    fn from(err: LexError) -> Self {
        ExprError::Compile(CompileError::Lex(err))
    }
}

impl From<ParseError> for ExprError {
    fn from(err: ParseError) -> Self {
        ExprError::Compile(CompileError::Parse(err))
    }
}
