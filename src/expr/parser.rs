//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, lowest first:
//!
//! ```text
//! ternary  ?:        (right associative)
//! ||
//! &&
//! |
//! &
//! == != === !==
//! < <= > >=
//! + -
//! * / %
//! unary ! - +
//! ```

use crate::core::DefinitionError;

use super::lexer::{lex, Spanned, Token};

/// Binary arithmetic and comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    /// Eager logical and (`&`).
    And,
    /// Eager logical or (`|`).
    Or,
}

/// Short-circuiting operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    AndAnd,
    OrOr,
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Expression AST.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(f64),
    Text(String),
    Variable(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Logical(LogicalOp, Box<Node>, Box<Node>),
    Ternary(Box<Node>, Box<Node>, Box<Node>),
    Call { name: String, args: Vec<Node> },
}

/// Parse expression source into an AST.
pub fn parse(source: &str) -> Result<Node, DefinitionError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let node = parser.ternary()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(parser.error(format!(
            "unexpected {:?} at {}",
            extra.token, extra.span.start
        )));
    }
    Ok(node)
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<Token<'src>>>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn error(&self, message: impl Into<String>) -> DefinitionError {
        DefinitionError::Syntax {
            source_text: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn eat(&mut self, expected: &Token<'_>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token<'_>, what: &str) -> Result<(), DefinitionError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(match self.tokens.get(self.pos) {
                Some(found) => format!("expected {what}, found {:?} at {}", found.token, found.span.start),
                None => format!("expected {what}, found end of input"),
            }))
        }
    }

    fn ternary(&mut self) -> Result<Node, DefinitionError> {
        let condition = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.ternary()?;
        self.expect(Token::Colon, "`:`")?;
        let otherwise = self.ternary()?;
        Ok(Node::Ternary(
            Box::new(condition),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn logical_or(&mut self) -> Result<Node, DefinitionError> {
        let mut left = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.logical_and()?;
            left = Node::Logical(LogicalOp::OrOr, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Node, DefinitionError> {
        let mut left = self.bit_or()?;
        while self.eat(&Token::AndAnd) {
            let right = self.bit_or()?;
            left = Node::Logical(LogicalOp::AndAnd, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> Result<Node, DefinitionError> {
        let mut left = self.bit_and()?;
        while self.eat(&Token::Or) {
            let right = self.bit_and()?;
            left = Node::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn bit_and(&mut self) -> Result<Node, DefinitionError> {
        let mut left = self.equality()?;
        while self.eat(&Token::And) {
            let right = self.equality()?;
            left = Node::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// One left-associative precedence level driven by a token → op table.
    fn binary_level(
        &mut self,
        ops: &[(Token<'static>, BinaryOp)],
        next: fn(&mut Self) -> Result<Node, DefinitionError>,
    ) -> Result<Node, DefinitionError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Node::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Node, DefinitionError> {
        self.binary_level(
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Node, DefinitionError> {
        self.binary_level(
            &[
                (Token::LessEq, BinaryOp::LessEq),
                (Token::Less, BinaryOp::Less),
                (Token::GreaterEq, BinaryOp::GreaterEq),
                (Token::Greater, BinaryOp::Greater),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Node, DefinitionError> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Node, DefinitionError> {
        self.binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Node, DefinitionError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.primary(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Node::Unary(op, Box::new(operand)))
    }

    fn primary(&mut self) -> Result<Node, DefinitionError> {
        let Some(spanned) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("unexpected end of input"));
        };
        self.pos += 1;

        match spanned.token {
            Token::Number(value) => Ok(Node::Number(value)),
            Token::Str(text) => Ok(Node::Text(text)),
            Token::Ident(name) => {
                if !self.eat(&Token::ParenOpen) {
                    return Ok(Node::Variable(name.to_string()));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::ParenClose) {
                    loop {
                        args.push(self.ternary()?);
                        if self.eat(&Token::ParenClose) {
                            break;
                        }
                        self.expect(Token::Comma, "`,` or `)`")?;
                    }
                }
                Ok(Node::Call {
                    name: name.to_string(),
                    args,
                })
            }
            Token::ParenOpen => {
                let inner = self.ternary()?;
                self.expect(Token::ParenClose, "`)`")?;
                Ok(inner)
            }
            other => Err(self.error(format!(
                "unexpected {:?} at {}",
                other, spanned.span.start
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> Box<Node> {
        Box::new(Node::Number(v))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Node::Binary(
                BinaryOp::Add,
                num(1.0),
                Box::new(Node::Binary(BinaryOp::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(
            parse("8 - 4 - 2").unwrap(),
            Node::Binary(
                BinaryOp::Sub,
                Box::new(Node::Binary(BinaryOp::Sub, num(8.0), num(4.0))),
                num(2.0)
            )
        );
    }

    #[test]
    fn test_ternary_right_associative() {
        let node = parse("a ? 1 : b ? 2 : 3").unwrap();
        match node {
            Node::Ternary(_, then, otherwise) => {
                assert_eq!(*then, Node::Number(1.0));
                assert!(matches!(*otherwise, Node::Ternary(..)));
            }
            other => panic!("expected ternary, got {other:?}"),
        }
    }

    #[test]
    fn test_call_with_arguments() {
        assert_eq!(
            parse("max(a, 2)").unwrap(),
            Node::Call {
                name: "max".to_string(),
                args: vec![Node::Variable("a".to_string()), Node::Number(2.0)],
            }
        );
        assert_eq!(
            parse("f()").unwrap(),
            Node::Call { name: "f".to_string(), args: vec![] }
        );
    }

    #[test]
    fn test_unary_chain() {
        assert_eq!(
            parse("!-x").unwrap(),
            Node::Unary(
                UnaryOp::Not,
                Box::new(Node::Unary(UnaryOp::Neg, Box::new(Node::Variable("x".into()))))
            )
        );
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["", "1 +", "(1", "1 2", "a ? 1", "f(1,", ")"] {
            assert!(
                matches!(parse(source), Err(DefinitionError::Syntax { .. })),
                "expected syntax error for {source:?}"
            );
        }
    }
}
