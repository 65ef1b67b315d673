use chrono::{DateTime, Utc};

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::context::Context;
use crate::error::EvalError;
use crate::functions::{resolve_function, FunctionContext};
use crate::value::{parse_number, Value};

/// Walks an AST against one context.
///
/// The wall clock is sampled once when the evaluator is created.
pub struct Evaluator<'c> {
    context: &'c Context,
    now: DateTime<Utc>,
}

impl<'c> Evaluator<'c> {
    pub fn new(context: &'c Context) -> Self {
        Self::with_clock(context, Utc::now())
    }

    pub fn with_clock(context: &'c Context, now: DateTime<Utc>) -> Self {
        Self { context, now }
    }

    pub fn eval(&self, node: &Node) -> Result<Value, EvalError> {
        match node {
            Node::Literal { value } => Ok(value.clone()),
            Node::FieldRef { name } => Ok(self.context.get(name).cloned().unwrap_or(Value::Null)),
            Node::Group { inner } => self.eval(inner),
            Node::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => value.to_number().map(|n| Value::Number(-n)).ok_or_else(|| {
                        EvalError::type_mismatch(format!(
                            "cannot negate a {}",
                            value.kind_name()
                        ))
                    }),
                }
            }
            Node::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                if !self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            Node::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                if self.eval(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }
            Node::Binary { op, left, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                binary(*op, &lhs, &rhs)
            }
            Node::Call { name, args } => {
                let spec = resolve_function(name, args.len())?;
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                (spec.implementation)(self, &values)
            }
        }
    }
}

impl FunctionContext for Evaluator<'_> {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Evaluates `node` against `context` using the current time.
pub fn evaluate(node: &Node, context: &Context) -> Result<Value, EvalError> {
    Evaluator::new(context).eval(node)
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let arithmetic = |f: fn(f64, f64) -> f64| -> Result<Value, EvalError> {
        let (a, b) = numeric_operands(op, lhs, rhs)?;
        Ok(Value::Number(f(a, b)))
    };
    let relational = |f: fn(&f64, &f64) -> bool| -> Result<Value, EvalError> {
        let (a, b) = numeric_operands(op, lhs, rhs)?;
        Ok(Value::Bool(f(&a, &b)))
    };

    match op {
        // `eval` short-circuits these; with both operands in hand the result is the same.
        BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Lt => relational(f64::lt),
        BinaryOp::Le => relational(f64::le),
        BinaryOp::Gt => relational(f64::gt),
        BinaryOp::Ge => relational(f64::ge),
        BinaryOp::Add => arithmetic(|a, b| a + b),
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Div => {
            let (a, b) = numeric_operands(op, lhs, rhs)?;
            if b == 0.0 {
                return Err(EvalError::division_by_zero());
            }
            Ok(Value::Number(a / b))
        }
    }
}

fn numeric_operands(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64), EvalError> {
    match (lhs.to_number(), rhs.to_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EvalError::type_mismatch(format!(
            "cannot apply '{}' to {} and {}",
            op.as_str(),
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

/// Equality across the value union. Never fails.
///
/// Same-kind values compare directly and `Null` equals only `Null`. A number compared with a
/// string parses the string as a number; every other pairing of different kinds is unequal.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            parse_number(s) == Some(*n)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn run(src: &str, ctx: &Context) -> Result<Value, EvalError> {
        let node = parse(&tokenize(src).unwrap(), 64).unwrap();
        evaluate(&node, ctx)
    }

    fn record() -> Context {
        Context::new()
            .with("amount", 1500.0)
            .with("stage", "Closed Won")
            .with("name", "Acme Corp")
            .with("qty", "3")
            .with("active", true)
    }

    #[test]
    fn filter_expressions() {
        let ctx = record();
        assert_eq!(
            run("amount > 1000 && stage == 'Closed Won'", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(run("contains(name, 'Corp')", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(run("amount * 2 - qty", &ctx).unwrap(), Value::Number(2997.0));
    }

    #[test]
    fn missing_fields_are_null() {
        let ctx = Context::new();
        assert_eq!(run("missing", &ctx).unwrap(), Value::Null);
        assert_eq!(run("missing == missing", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(run("missing == 0", &ctx).unwrap(), Value::Bool(false));
        assert_eq!(run("missing != 'x'", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(
            run("missing + 1", &ctx).unwrap_err().kind,
            EvalErrorKind::TypeMismatch
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let ctx = Context::new();
        assert_eq!(run("false && NOPE()", &ctx).unwrap(), Value::Bool(false));
        assert_eq!(run("true || 1 / 0", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(
            run("true && NOPE()", &ctx).unwrap_err().kind,
            EvalErrorKind::UnknownFunction
        );
        assert_eq!(run("'yes' && 2", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(run("!0", &ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn arithmetic_errors_are_typed() {
        let ctx = record();
        assert_eq!(
            run("amount / 0", &ctx).unwrap_err().kind,
            EvalErrorKind::DivisionByZero
        );
        assert_eq!(
            run("name * 2", &ctx).unwrap_err().kind,
            EvalErrorKind::TypeMismatch
        );
        assert_eq!(
            run("name < 2", &ctx).unwrap_err().kind,
            EvalErrorKind::TypeMismatch
        );
        assert_eq!(run("-qty", &ctx).unwrap(), Value::Number(-3.0));
        assert_eq!(
            run("-name", &ctx).unwrap_err().kind,
            EvalErrorKind::TypeMismatch
        );
    }

    #[test]
    fn arity_is_checked_before_arguments_run() {
        let ctx = Context::new();
        let err = run("LEN(1 / 0, 2)", &ctx).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::ArityMismatch);
        let err = run("LEN(1 / 0)", &ctx).unwrap_err();
        assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
    }

    #[test]
    fn cross_kind_equality() {
        let cases = [
            (Value::Number(5.0), Value::from("5"), true),
            (Value::Number(5.0), Value::from(" 5.0 "), true),
            (Value::Number(5.0), Value::from("five"), false),
            (Value::Bool(true), Value::from("true"), false),
            (Value::Bool(true), Value::from("TRUE"), false),
            (Value::Bool(false), Value::from("0"), false),
            (Value::Bool(true), Value::Number(1.0), false),
            (Value::Bool(false), Value::Number(0.0), false),
            (Value::Null, Value::from(""), false),
            (Value::Null, Value::Number(0.0), false),
            (Value::from("a"), Value::from("A"), false),
        ];
        for (a, b, expected) in cases {
            assert_eq!(values_equal(&a, &b), expected, "{a:?} == {b:?}");
            assert_eq!(values_equal(&b, &a), expected, "{b:?} == {a:?}");
        }
    }

    #[test]
    fn bools_only_equal_bools() {
        let ctx = Context::new().with("active", true).with("n", 1.0);
        for src in ["active == 'true'", "active == 'TRUE'", "n == true", "active == 1"] {
            assert_eq!(run(src, &ctx).unwrap(), Value::Bool(false), "{src}");
        }
        assert_eq!(run("active == true", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(run("n == '1'", &ctx).unwrap(), Value::Bool(true));
        assert_eq!(run("active != 'true'", &ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn operators_on_evaluated_operands() {
        let t = Value::Bool(true);
        let zero = Value::Number(0.0);
        assert_eq!(binary(BinaryOp::And, &t, &zero).unwrap(), Value::Bool(false));
        assert_eq!(binary(BinaryOp::Or, &zero, &t).unwrap(), Value::Bool(true));
        assert_eq!(
            binary(BinaryOp::Le, &Value::from("2"), &Value::Number(2.0)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Div, &t, &zero).unwrap_err().kind,
            EvalErrorKind::DivisionByZero
        );
    }

    #[test]
    fn now_is_stable_within_one_evaluation() {
        let ctx = Context::new();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let node = parse(&tokenize("NOW() == NOW() && TODAY() == '2024-06-01'").unwrap(), 64)
            .unwrap();
        let out = Evaluator::with_clock(&ctx, now).eval(&node).unwrap();
        assert_eq!(out, Value::Bool(true));
    }
}
