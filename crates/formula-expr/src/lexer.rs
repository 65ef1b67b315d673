//! Single-pass tokenizer for the expression language.

use std::fmt;

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    EqEq,
    NotEq,
    Le,
    Ge,
    Lt,
    Gt,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::EqEq => "==",
            Operator::NotEq => "!=",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::AndAnd => "&&",
            Operator::OrOr => "||",
            Operator::Bang => "!",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    Comma,
}

impl Punct {
    pub fn as_char(self) -> char {
        match self {
            Punct::LParen => '(',
            Punct::RParen => ')',
            Punct::Comma => ',',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Bool,
    Operator(Operator),
    Punct(Punct),
    Eof,
}

/// A lexed token.
///
/// `text` holds the identifier name, the number's digits, the string body without quotes,
/// `true`/`false`, or the operator/punctuation spelling. `position` is the byte offset of the
/// token's first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of expression"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.chars.next()
    }

    /// Byte offset of the next unread character (or the end of the source).
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.src.len(), |&(idx, _)| idx)
    }

    fn take_while(&mut self, start: usize, mut pred: impl FnMut(char) -> bool) -> &'a str {
        while matches!(self.peek_char(), Some(c) if pred(c)) {
            self.bump();
        }
        let end = self.offset();
        let src = self.src;
        &src[start..end]
    }

    fn push_op(&mut self, op: Operator, start: usize) {
        self.tokens
            .push(Token::new(TokenKind::Operator(op), op.as_str(), start));
    }

    /// Consumes a second character if it matches `next`, producing the two-character operator;
    /// otherwise produces `single` (or errors when the lone character is not an operator).
    fn lex_pair(
        &mut self,
        start: usize,
        first: char,
        next: char,
        pair: Operator,
        single: Option<Operator>,
    ) -> Result<(), LexError> {
        if self.peek_char() == Some(next) {
            self.bump();
            self.push_op(pair, start);
            return Ok(());
        }
        match single {
            Some(op) => {
                self.push_op(op, start);
                Ok(())
            }
            None => Err(LexError::new(
                start,
                format!(
                    "unexpected character '{first}'; did you mean '{}'?",
                    pair.as_str()
                ),
            )),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, LexError> {
        while let Some((start, ch)) = self.bump() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {}
                '(' => self
                    .tokens
                    .push(Token::new(TokenKind::Punct(Punct::LParen), "(", start)),
                ')' => self
                    .tokens
                    .push(Token::new(TokenKind::Punct(Punct::RParen), ")", start)),
                ',' => self
                    .tokens
                    .push(Token::new(TokenKind::Punct(Punct::Comma), ",", start)),
                '+' => self.push_op(Operator::Plus, start),
                '-' => self.push_op(Operator::Minus, start),
                '*' => self.push_op(Operator::Star, start),
                '/' => self.push_op(Operator::Slash, start),
                '=' => self.lex_pair(start, '=', '=', Operator::EqEq, None)?,
                '!' => self.lex_pair(start, '!', '=', Operator::NotEq, Some(Operator::Bang))?,
                '<' => self.lex_pair(start, '<', '=', Operator::Le, Some(Operator::Lt))?,
                '>' => self.lex_pair(start, '>', '=', Operator::Ge, Some(Operator::Gt))?,
                '&' => self.lex_pair(start, '&', '&', Operator::AndAnd, None)?,
                '|' => self.lex_pair(start, '|', '|', Operator::OrOr, None)?,
                '\'' => {
                    let body_start = start + 1;
                    loop {
                        match self.bump() {
                            Some((end, '\'')) => {
                                let src = self.src;
                                let body = &src[body_start..end];
                                self.tokens.push(Token::new(TokenKind::String, body, start));
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(LexError::new(start, "unterminated string literal"))
                            }
                        }
                    }
                }
                c if c.is_ascii_digit() => self.lex_number(start)?,
                c if is_ident_start(c) => {
                    let ident = self.take_while(start, is_ident_cont);
                    let kind = match ident {
                        "true" | "false" => TokenKind::Bool,
                        _ => TokenKind::Ident,
                    };
                    self.tokens.push(Token::new(kind, ident, start));
                }
                other => {
                    return Err(LexError::new(
                        start,
                        format!("unexpected character {other:?}"),
                    ))
                }
            }
        }

        let end = self.src.len();
        self.tokens.push(Token::new(TokenKind::Eof, "", end));
        Ok(self.tokens)
    }

    fn lex_number(&mut self, start: usize) -> Result<(), LexError> {
        self.take_while(start, |c| c.is_ascii_digit());
        if self.peek_char() == Some('.') {
            let dot = self.offset();
            self.bump();
            if !matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                return Err(LexError::new(
                    dot,
                    "expected digits after decimal point",
                ));
            }
            self.take_while(start, |c| c.is_ascii_digit());
        }
        let end = self.offset();
        let src = self.src;
        let raw = &src[start..end];
        self.tokens.push(Token::new(TokenKind::Number, raw, start));
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Splits `source` into tokens, always ending with a [`TokenKind::Eof`] token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).lex()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_filter_expression() {
        let tokens = tokenize("amount >= 1000 && stage == 'Closed Won'").unwrap();
        let summary: Vec<(TokenKind, &str, usize)> = tokens
            .iter()
            .map(|t| (t.kind, t.text.as_str(), t.position))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Ident, "amount", 0),
                (TokenKind::Operator(Operator::Ge), ">=", 7),
                (TokenKind::Number, "1000", 10),
                (TokenKind::Operator(Operator::AndAnd), "&&", 15),
                (TokenKind::Ident, "stage", 18),
                (TokenKind::Operator(Operator::EqEq), "==", 24),
                (TokenKind::String, "Closed Won", 27),
                (TokenKind::Eof, "", 39),
            ]
        );
    }

    #[test]
    fn keywords_and_relationship_identifiers() {
        assert_eq!(
            kinds("true false changed_by_id__name _x1"),
            vec![
                TokenKind::Bool,
                TokenKind::Bool,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
        // Keywords are case-sensitive; `TRUE` is a field reference.
        assert_eq!(kinds("TRUE"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn decimal_numbers() {
        let tokens = tokenize("3.25 + 10").unwrap();
        assert_eq!(tokens[0].text, "3.25");
        assert_eq!(tokens[2].text, "10");

        let err = tokenize("1.").unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn strings_keep_body_verbatim() {
        let tokens = tokenize(r"'a\b, (c)'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, r"a\b, (c)");
    }

    #[test]
    fn unterminated_string_reports_opening_quote() {
        let err = tokenize("name == 'Acme").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn unknown_characters_are_errors() {
        assert_eq!(tokenize("a = b").unwrap_err().position, 2);
        assert_eq!(tokenize("a & b").unwrap_err().position, 2);
        assert_eq!(tokenize("a | b").unwrap_err().position, 2);
        assert_eq!(tokenize("\"x\"").unwrap_err().position, 0);
        assert_eq!(tokenize("a.b").unwrap_err().position, 1);
        assert_eq!(tokenize("é").unwrap_err().position, 0);
    }

    #[test]
    fn shift_lexes_as_two_comparisons() {
        assert_eq!(
            kinds("a >> 5"),
            vec![
                TokenKind::Ident,
                TokenKind::Operator(Operator::Gt),
                TokenKind::Operator(Operator::Gt),
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
