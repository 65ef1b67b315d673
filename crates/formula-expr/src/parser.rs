//! Pratt parser producing [`Node`] trees from a token stream.
//!
//! Binding powers, lowest first:
//!
//! | level | operators |
//! |---|---|
//! | 10 | `\|\|` |
//! | 20 | `&&` |
//! | 30 | prefix `!` |
//! | 40 | `==` `!=` |
//! | 50 | `<` `<=` `>` `>=` |
//! | 60 | `+` `-` |
//! | 70 | `*` `/` |
//! | 80 | prefix `-` |
//!
//! All binary operators are left-associative. Prefix `!` sits between `&&` and equality, so
//! `!a == b` parses as `!(a == b)` and a `!` in a tighter-binding operand position (for example
//! `a == !b`) is rejected.

use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::config::EngineConfig;
use crate::error::{CompileError, ParseError};
use crate::lexer::{tokenize, Operator, Punct, Token, TokenKind};
use crate::value::Value;

const NOT_BP: u8 = 30;
const NEG_BP: u8 = 80;

fn infix_binding_power(kind: TokenKind) -> Option<(BinaryOp, u8, u8)> {
    let TokenKind::Operator(op) = kind else {
        return None;
    };
    let (op, l_bp) = match op {
        Operator::OrOr => (BinaryOp::Or, 10),
        Operator::AndAnd => (BinaryOp::And, 20),
        Operator::EqEq => (BinaryOp::Eq, 40),
        Operator::NotEq => (BinaryOp::Ne, 40),
        Operator::Lt => (BinaryOp::Lt, 50),
        Operator::Le => (BinaryOp::Le, 50),
        Operator::Gt => (BinaryOp::Gt, 50),
        Operator::Ge => (BinaryOp::Ge, 50),
        Operator::Plus => (BinaryOp::Add, 60),
        Operator::Minus => (BinaryOp::Sub, 60),
        Operator::Star => (BinaryOp::Mul, 70),
        Operator::Slash => (BinaryOp::Div, 70),
        Operator::Bang => return None,
    };
    Some((op, l_bp, l_bp + 1))
}

/// Parses a complete token stream (as produced by [`tokenize`]) into a single expression.
///
/// `max_depth` bounds the height of the resulting tree, counting every operator, call and group
/// level, so long flat chains such as `a + a + ... + a` are limited the same way as nested
/// parentheses. Taller input is rejected with a [`ParseError`].
pub fn parse(tokens: &[Token], max_depth: usize) -> Result<Node, ParseError> {
    match tokens.first() {
        None => return Err(ParseError::new(0, "empty expression")),
        Some(first) if first.kind == TokenKind::Eof => {
            return Err(ParseError::new(first.position, "empty expression"))
        }
        Some(_) => {}
    }
    if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
        let end = tokens.last().map_or(0, |t| t.position + t.text.len());
        return Err(ParseError::new(end, "token stream is not terminated"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let (node, _) = parser.parse_expr(0)?;
    let next = parser.peek();
    if next.kind != TokenKind::Eof {
        return Err(ParseError::new(
            next.position,
            format!("unexpected token {next}"),
        ));
    }
    Ok(node)
}

/// Lexes and parses `source` under the resource limits in `config`.
pub fn parse_source(source: &str, config: &EngineConfig) -> Result<Node, CompileError> {
    if source.len() > config.max_expression_len {
        return Err(ParseError::new(
            config.max_expression_len,
            format!(
                "expression is {} bytes long; the limit is {}",
                source.len(),
                config.max_expression_len
            ),
        )
        .into());
    }
    let tokens = tokenize(source)?;
    Ok(parse(&tokens, config.max_nesting_depth)?)
}

struct Parser<'t> {
    /// Non-empty and terminated by an `Eof` token.
    tokens: &'t [Token],
    pos: usize,
    /// Current `parse_expr` recursion depth.
    depth: usize,
    max_depth: usize,
}

/// A parsed subtree together with its height (a leaf has height 1).
type Parsed = (Node, usize);

impl<'t> Parser<'t> {
    fn peek(&self) -> &'t Token {
        let tokens = self.tokens;
        &tokens[self.pos.min(tokens.len() - 1)]
    }

    fn bump(&mut self) -> &'t Token {
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn at_punct(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn unexpected(&self) -> ParseError {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Eof => ParseError::new(tok.position, "unexpected end of expression"),
            _ => ParseError::new(tok.position, format!("unexpected token {tok}")),
        }
    }

    fn too_deep(&self, position: usize) -> ParseError {
        ParseError::new(
            position,
            format!("expression is nested more than {} levels deep", self.max_depth),
        )
    }

    /// Height of a node built on top of children of height `child`.
    fn wrap_height(&self, child: usize, position: usize) -> Result<usize, ParseError> {
        let height = child + 1;
        if height > self.max_depth {
            return Err(self.too_deep(position));
        }
        Ok(height)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Parsed, ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.too_deep(self.peek().position));
        }

        let tok = self.peek();
        let (mut lhs, mut height) = match tok.kind {
            TokenKind::Operator(Operator::Bang) => {
                if min_bp > NOT_BP {
                    return Err(ParseError::new(
                        tok.position,
                        "'!' cannot appear here; wrap the negation in parentheses",
                    ));
                }
                self.bump();
                let (operand, h) = self.parse_expr(NOT_BP)?;
                (Node::unary(UnaryOp::Not, operand), self.wrap_height(h, tok.position)?)
            }
            TokenKind::Operator(Operator::Minus) => {
                self.bump();
                let (operand, h) = self.parse_expr(NEG_BP)?;
                (Node::unary(UnaryOp::Neg, operand), self.wrap_height(h, tok.position)?)
            }
            _ => self.parse_primary()?,
        };

        // Left-associative chains grow the tree without recursing, so the height check here is
        // what bounds `1 + 1 + ... + 1`.
        while let Some((op, l_bp, r_bp)) = infix_binding_power(self.peek().kind) {
            if l_bp < min_bp {
                break;
            }
            let op_tok = self.bump();
            let (rhs, rhs_height) = self.parse_expr(r_bp)?;
            height = self.wrap_height(height.max(rhs_height), op_tok.position)?;
            lhs = Node::binary(op, lhs, rhs);
        }

        self.depth -= 1;
        Ok((lhs, height))
    }

    fn parse_primary(&mut self) -> Result<Parsed, ParseError> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Number => {
                self.bump();
                match tok.text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok((Node::literal(n), 1)),
                    _ => Err(ParseError::new(
                        tok.position,
                        format!("number literal '{}' is out of range", tok.text),
                    )),
                }
            }
            TokenKind::String => {
                self.bump();
                Ok((Node::literal(Value::String(tok.text.clone())), 1))
            }
            TokenKind::Bool => {
                self.bump();
                Ok((Node::literal(tok.text == "true"), 1))
            }
            TokenKind::Ident => {
                self.bump();
                if self.at_punct(Punct::LParen) {
                    self.bump();
                    let (args, h) = self.parse_args()?;
                    let height = self.wrap_height(h, tok.position)?;
                    Ok((Node::call(tok.text.clone(), args), height))
                } else {
                    Ok((Node::field(tok.text.clone()), 1))
                }
            }
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                if self.at_punct(Punct::RParen) {
                    return Err(ParseError::new(
                        self.peek().position,
                        "empty parentheses",
                    ));
                }
                let (inner, h) = self.parse_expr(0)?;
                if !self.at_punct(Punct::RParen) {
                    let next = self.peek();
                    return Err(ParseError::new(
                        next.position,
                        format!(
                            "expected ')' to close '(' at {}, found {next}",
                            tok.position
                        ),
                    ));
                }
                self.bump();
                Ok((Node::group(inner), self.wrap_height(h, tok.position)?))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parses call arguments after the opening parenthesis, consuming the closing one. Also
    /// returns the tallest argument's height (0 without arguments).
    fn parse_args(&mut self) -> Result<(Vec<Node>, usize), ParseError> {
        let mut args = Vec::new();
        let mut height = 0;
        if self.at_punct(Punct::RParen) {
            self.bump();
            return Ok((args, height));
        }
        loop {
            let (arg, h) = self.parse_expr(0)?;
            args.push(arg);
            height = height.max(h);
            let tok = self.peek();
            match tok.kind {
                TokenKind::Punct(Punct::Comma) => {
                    self.bump();
                    if self.at_punct(Punct::RParen) {
                        return Err(ParseError::new(
                            tok.position,
                            "trailing comma in argument list",
                        ));
                    }
                }
                TokenKind::Punct(Punct::RParen) => {
                    self.bump();
                    return Ok((args, height));
                }
                TokenKind::Eof => {
                    return Err(ParseError::new(
                        tok.position,
                        "unclosed argument list; expected ')'",
                    ))
                }
                _ => {
                    return Err(ParseError::new(
                        tok.position,
                        format!("expected ',' or ')' in argument list, found {tok}"),
                    ))
                }
            }
        }
    }
}
