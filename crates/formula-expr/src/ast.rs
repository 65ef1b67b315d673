use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Parsed expression tree. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Literal {
        value: Value,
    },
    /// Context key, looked up verbatim. Relationship keys such as `owner_id__name` are opaque.
    FieldRef {
        name: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        name: String,
        args: Vec<Node>,
    },
    /// Explicit parentheses; semantically transparent.
    Group {
        inner: Box<Node>,
    },
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Self {
        Node::Literal {
            value: value.into(),
        }
    }

    pub fn field(name: impl Into<String>) -> Self {
        Node::FieldRef { name: name.into() }
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Call {
            name: name.into(),
            args,
        }
    }

    pub fn group(inner: Node) -> Self {
        Node::Group {
            inner: Box::new(inner),
        }
    }

    /// Strips any number of enclosing [`Node::Group`] wrappers.
    pub fn ungrouped(&self) -> &Node {
        let mut node = self;
        while let Node::Group { inner } = node {
            node = &**inner;
        }
        node
    }

    /// Distinct field names referenced by the expression, in first-occurrence order.
    pub fn field_refs(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Literal { .. } => {}
                Node::FieldRef { name } => {
                    if !out.contains(&name.as_str()) {
                        out.push(name.as_str());
                    }
                }
                Node::Unary { operand, .. } => stack.push(operand),
                Node::Binary { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                Node::Call { args, .. } => stack.extend(args.iter().rev()),
                Node::Group { inner } => stack.push(inner),
            }
        }
        out
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "'{s}'"),
        other => write!(f, "{other}"),
    }
}

/// Re-stringifies the tree with canonical spacing. Parsing the output yields an equal tree.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal { value } => write_literal(f, value),
            Node::FieldRef { name } => f.write_str(name),
            Node::Unary { op: UnaryOp::Not, operand } => write!(f, "!{operand}"),
            Node::Unary { op: UnaryOp::Neg, operand } => write!(f, "-{operand}"),
            Node::Binary { op, left, right } => write!(f, "{left} {} {right}", op.as_str()),
            Node::Call { name, args } => {
                write!(f, "{name}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Node::Group { inner } => write!(f, "({inner})"),
        }
    }
}

/// A source string paired with its parsed tree.
///
/// Instances live in the engine cache behind an `Arc` and are shared read-only across threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledExpression {
    #[serde(serialize_with = "serialize_shared_str")]
    pub source: Arc<str>,
    pub root: Node,
}

fn serialize_shared_str<S: serde::Serializer>(value: &Arc<str>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value)
}

impl CompiledExpression {
    pub fn new(source: impl Into<Arc<str>>, root: Node) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    /// Context keys read by this expression.
    pub fn field_refs(&self) -> Vec<&str> {
        self.root.field_refs()
    }
}
