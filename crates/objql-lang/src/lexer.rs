//! Lexer for DSQL using logos.
//!
//! All keywords are case-insensitive. String literals accept both quote
//! styles; bare `YYYY-MM-DD` tokens lex as dates.

use chrono::NaiveDate;
use logos::Logos;

use crate::error::ParseError;
use crate::span::Span;

/// Token types for DSQL.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Clause keywords
    #[token("SELECT", ignore(ascii_case))]
    Select,
    #[token("FROM", ignore(ascii_case))]
    From,
    #[token("WHERE", ignore(ascii_case))]
    Where,
    #[token("GROUP", ignore(ascii_case))]
    Group,
    #[token("BY", ignore(ascii_case))]
    By,
    #[token("HAVING", ignore(ascii_case))]
    Having,
    #[token("ORDER", ignore(ascii_case))]
    Order,
    #[token("LIMIT", ignore(ascii_case))]
    Limit,
    #[token("OFFSET", ignore(ascii_case))]
    Offset,

    // Logical and predicate keywords
    #[token("AND", ignore(ascii_case))]
    And,
    #[token("OR", ignore(ascii_case))]
    Or,
    #[token("NOT", ignore(ascii_case))]
    Not,
    #[token("IN", ignore(ascii_case))]
    In,
    #[token("IS", ignore(ascii_case))]
    Is,
    #[token("LIKE", ignore(ascii_case))]
    Like,
    #[token("AS", ignore(ascii_case))]
    As,
    #[token("DISTINCT", ignore(ascii_case))]
    Distinct,

    // Ordering keywords
    #[token("ASC", ignore(ascii_case))]
    Asc,
    #[token("DESC", ignore(ascii_case))]
    Desc,
    #[token("NULLS", ignore(ascii_case))]
    Nulls,
    #[token("FIRST", ignore(ascii_case))]
    First,
    #[token("LAST", ignore(ascii_case))]
    Last,

    // Literal keywords
    #[token("NULL", ignore(ascii_case))]
    Null,
    #[token("TRUE", ignore(ascii_case))]
    True,
    #[token("FALSE", ignore(ascii_case))]
    False,

    // Comparison operators
    #[token("=")]
    Eq,
    #[token("!=")]
    #[token("<>")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,

    // Identifier
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Date literal (bare ISO date; wins over Int by match length)
    #[regex(r"[0-9]{4}-[0-9]{2}-[0-9]{2}", |lex| {
        NaiveDate::parse_from_str(lex.slice(), "%Y-%m-%d").ok()
    })]
    Date(NaiveDate),

    // Numeric literals
    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // String literal (double- or single-quoted)
    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    #[regex(r#"'([^'\\]|\\.)*'"#, unquote)]
    QuotedString(String),
}

fn unquote(lex: &mut logos::Lexer<Token>) -> String {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    unescape_string(inner)
}

/// Unescape a string literal, handling common escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('\'') => result.push('\''),
                Some('"') => result.push('"'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// A token together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Byte span in the source.
    pub span: Span,
}

/// Tokenize the full source, failing on the first unrecognized input.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                return Err(ParseError::new(
                    format!("unrecognized input '{}'", lexer.slice()),
                    span,
                ))
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("select FROM WhErE"),
            vec![Token::Select, Token::From, Token::Where]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= != <> < <= > >="),
            vec![
                Token::Eq,
                Token::Ne,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("42 -7 3.25 'Acme' \"Acme\" true NULL"),
            vec![
                Token::Int(42),
                Token::Int(-7),
                Token::Float(3.25),
                Token::QuotedString("Acme".into()),
                Token::QuotedString("Acme".into()),
                Token::True,
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_bare_date_literal() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(kinds("2024-01-15"), vec![Token::Date(date)]);
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            kinds("Account.Name"),
            vec![
                Token::Ident("Account".into()),
                Token::Dot,
                Token::Ident("Name".into())
            ]
        );
    }

    #[test]
    fn test_escaped_string() {
        assert_eq!(
            kinds(r#"'O\'Brien'"#),
            vec![Token::QuotedString("O'Brien".into())]
        );
    }

    #[test]
    fn test_unrecognized_input_fails() {
        let err = tokenize("SELECT ; FROM x").unwrap_err();
        assert!(err.message.contains("unrecognized"));
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("SELECT Id").unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 6));
        assert_eq!(tokens[1].span, Span::new(7, 9));
    }
}
