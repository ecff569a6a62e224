//! Tokenizer for the expression language.
//!
//! Uses Logos for compile-time generated tokenization.

use logos::{Logos, Span};

use crate::core::DefinitionError;

/// Expression token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'src> {
    // === Literals ===
    /// Decimal number, with optional fraction and exponent.
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[token("Infinity", |_| f64::INFINITY)]
    #[token("NaN", |_| f64::NAN)]
    Number(f64),

    /// Quoted string, single or double quotes, with backslash escapes.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    Str(String),

    /// Name, possibly dotted (`player.hope`).
    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*", |lex| lex.slice())]
    Ident(&'src str),

    // === Arithmetic ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // === Comparison ===
    #[token("<")]
    Less,
    #[token("<=")]
    LessEq,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEq,
    #[token("==")]
    #[token("===")]
    Eq,
    #[token("!=")]
    #[token("!==")]
    NotEq,

    // === Logic ===
    #[token("&&")]
    AndAnd,
    #[token("&")]
    And,
    #[token("||")]
    OrOr,
    #[token("|")]
    Or,
    #[token("!")]
    Bang,

    // === Punctuation ===
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// A token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

/// Tokenize expression source.
pub fn lex(source: &str) -> Result<Vec<Spanned<Token<'_>>>, DefinitionError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                span: lexer.span(),
            }),
            Err(()) => {
                return Err(DefinitionError::Lex {
                    source_text: source.to_string(),
                    slice: lexer.slice().to_string(),
                    offset: lexer.span().start,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        lex(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.5 .25 1e3 2.5E-1"),
            vec![
                Token::Number(42.0),
                Token::Number(3.5),
                Token::Number(0.25),
                Token::Number(1000.0),
                Token::Number(0.25),
            ]
        );
    }

    #[test]
    fn test_special_numbers() {
        assert_eq!(tokens("Infinity"), vec![Token::Number(f64::INFINITY)]);
        match &tokens("NaN")[..] {
            [Token::Number(n)] => assert!(n.is_nan()),
            other => panic!("unexpected tokens {other:?}"),
        }
        // A longer name is still a name
        assert_eq!(tokens("Infinityx"), vec![Token::Ident("Infinityx")]);
    }

    #[test]
    fn test_dotted_names() {
        assert_eq!(
            tokens("player.hope + world.day_count"),
            vec![
                Token::Ident("player.hope"),
                Token::Plus,
                Token::Ident("world.day_count"),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#"item("rope") + item('it\'s')"#),
            vec![
                Token::Ident("item"),
                Token::ParenOpen,
                Token::Str("rope".to_string()),
                Token::ParenClose,
                Token::Plus,
                Token::Ident("item"),
                Token::ParenOpen,
                Token::Str("it's".to_string()),
                Token::ParenClose,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("< <= > >= == === != !== && & || | ! ? : % ,"),
            vec![
                Token::Less,
                Token::LessEq,
                Token::Greater,
                Token::GreaterEq,
                Token::Eq,
                Token::Eq,
                Token::NotEq,
                Token::NotEq,
                Token::AndAnd,
                Token::And,
                Token::OrOr,
                Token::Or,
                Token::Bang,
                Token::Question,
                Token::Colon,
                Token::Percent,
                Token::Comma,
            ]
        );
    }

    #[test]
    fn test_lex_error() {
        let err = lex("1 # 2").unwrap_err();
        match err {
            DefinitionError::Lex { slice, offset, .. } => {
                assert_eq!(slice, "#");
                assert_eq!(offset, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
