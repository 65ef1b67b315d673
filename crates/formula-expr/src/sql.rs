//! Translation of filter expressions into parameterized SQL `WHERE` fragments.
//!
//! Every literal becomes a `?` placeholder with its value appended to
//! [`SqlPredicate::args`]; field references are emitted as bare column names (the lexer only
//! admits `[A-Za-z_][A-Za-z0-9_]*`). A field named `null` or `nil` (any case) stands for SQL
//! `NULL`.

use std::fmt::Write as _;

use serde::Serialize;

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::error::SqlError;
use crate::functions::lookup_function;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlPredicate {
    pub clause: String,
    pub args: Vec<Value>,
}

pub fn to_sql(node: &Node) -> Result<SqlPredicate, SqlError> {
    let mut writer = SqlWriter::default();
    writer.node(node)?;
    Ok(SqlPredicate {
        clause: writer.out,
        args: writer.args,
    })
}

fn is_null_ref(node: &Node) -> bool {
    matches!(node.ungrouped(), Node::FieldRef { name }
        if name.eq_ignore_ascii_case("null") || name.eq_ignore_ascii_case("nil"))
}

fn sql_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "=",
        BinaryOp::And => "AND",
        BinaryOp::Or => "OR",
        other => other.as_str(),
    }
}

/// Escapes LIKE wildcards so the literal matches verbatim.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Default)]
struct SqlWriter {
    out: String,
    args: Vec<Value>,
}

impl SqlWriter {
    fn placeholder(&mut self, value: Value) {
        self.out.push('?');
        self.args.push(value);
    }

    fn node(&mut self, node: &Node) -> Result<(), SqlError> {
        match node {
            Node::Literal { value } => self.placeholder(value.clone()),
            Node::FieldRef { .. } if is_null_ref(node) => self.out.push_str("NULL"),
            Node::FieldRef { name } => self.out.push_str(name),
            Node::Group { inner } => self.node(inner)?,
            Node::Unary { op, operand } => {
                self.out.push_str(match op {
                    UnaryOp::Not => "(NOT ",
                    UnaryOp::Neg => "(-",
                });
                self.node(operand)?;
                self.out.push(')');
            }
            Node::Binary { op, left, right } => self.binary(*op, left, right)?,
            Node::Call { name, args } => self.call(name, args)?,
        }
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp, left: &Node, right: &Node) -> Result<(), SqlError> {
        let (left_null, right_null) = (is_null_ref(left), is_null_ref(right));
        if left_null || right_null {
            let suffix = match op {
                BinaryOp::Eq => " IS NULL)",
                BinaryOp::Ne => " IS NOT NULL)",
                other => {
                    return Err(SqlError(format!(
                        "operator '{}' cannot be applied to null",
                        other.as_str()
                    )))
                }
            };
            let field = if right_null { left } else { right };
            self.out.push('(');
            self.node(field)?;
            self.out.push_str(suffix);
            return Ok(());
        }

        self.out.push('(');
        self.node(left)?;
        let _ = write!(self.out, " {} ", sql_operator(op));
        self.node(right)?;
        self.out.push(')');
        Ok(())
    }

    fn args(&mut self, args: &[Node]) -> Result<(), SqlError> {
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                self.out.push_str(", ");
            }
            self.node(arg)?;
        }
        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Node]) -> Result<(), SqlError> {
        let spec = lookup_function(name)
            .ok_or_else(|| SqlError(format!("function '{name}' has no SQL equivalent")))?;
        if !spec.accepts(args.len()) {
            return Err(SqlError(format!(
                "{} expects {} to {} argument(s), got {}",
                spec.name,
                spec.min_args,
                spec.max_args,
                args.len()
            )));
        }

        match spec.name {
            "UPPER" | "LOWER" | "ROUND" | "IF" => {
                let _ = write!(self.out, "{}(", spec.name);
                self.args(args)?;
                self.out.push(')');
            }
            "LEN" => {
                self.out.push_str("CHAR_LENGTH(");
                self.args(args)?;
                self.out.push(')');
            }
            "TODAY" => self.out.push_str("CURDATE()"),
            "NOW" => self.out.push_str("NOW()"),
            "DATE_ADD" => {
                self.out.push_str("DATE_ADD(");
                self.node(&args[0])?;
                self.out.push_str(", INTERVAL ");
                self.node(&args[1])?;
                self.out.push_str(" DAY)");
            }
            "CONTAINS" | "STARTS_WITH" | "ENDS_WITH" => {
                let Node::Literal {
                    value: Value::String(raw),
                } = args[1].ungrouped()
                else {
                    return Err(SqlError(format!(
                        "{} second argument must be a string literal",
                        spec.name
                    )));
                };
                let escaped = escape_like(raw);
                let pattern = match spec.name {
                    "CONTAINS" => format!("%{escaped}%"),
                    "STARTS_WITH" => format!("{escaped}%"),
                    _ => format!("%{escaped}"),
                };
                self.out.push('(');
                self.node(&args[0])?;
                self.out.push_str(" LIKE ");
                self.placeholder(Value::String(pattern));
                self.out.push(')');
            }
            other => {
                return Err(SqlError(format!(
                    "function '{other}' has no SQL equivalent"
                )))
            }
        }
        Ok(())
    }
}
