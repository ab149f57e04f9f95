use logos::Logos;
use std::fmt;

/// Token types for the formula language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    // Literals
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // Identifiers (field identifiers, function names, lambda parameters)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    // String literals
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    // Numbers (unsigned; negation is a prefix operator)
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    // Symbols
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    // Operators
    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("!")]
    Bang,

    #[token("==")]
    EqualsEquals,

    #[token("!=")]
    NotEquals,

    #[token("<")]
    LessThan,

    #[token("<=")]
    LessThanEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterThanEquals,

    #[token("&&")]
    AndAnd,

    #[token("||")]
    OrOr,

    #[token("->")]
    #[token("=>")]
    #[token("→")]
    Arrow,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Colon => write!(f, ":"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Bang => write!(f, "!"),
            Token::EqualsEquals => write!(f, "=="),
            Token::NotEquals => write!(f, "!="),
            Token::LessThan => write!(f, "<"),
            Token::LessThanEquals => write!(f, "<="),
            Token::GreaterThan => write!(f, ">"),
            Token::GreaterThanEquals => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Arrow => write!(f, "->"),
        }
    }
}

/// Tokenize a formula, failing on the first character the lexer rejects
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, std::ops::Range<usize>)>, usize> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .map(|(result, span)| result.map(|token| (token, span.clone())).map_err(|_| span.start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token<'_>> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_literals() {
        let tokens = kinds(r#"true false null 42 3.14 "hi \"there\"""#);

        assert_eq!(tokens[0], Token::True);
        assert_eq!(tokens[1], Token::False);
        assert_eq!(tokens[2], Token::Null);
        assert_eq!(tokens[3], Token::Number("42"));
        assert_eq!(tokens[4], Token::Number("3.14"));
        assert!(matches!(tokens[5], Token::String(_)));
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("a >= 1 && b != 2 || !c <= d");

        assert_eq!(tokens[1], Token::GreaterThanEquals);
        assert_eq!(tokens[3], Token::AndAnd);
        assert_eq!(tokens[5], Token::NotEquals);
        assert_eq!(tokens[7], Token::OrOr);
        assert_eq!(tokens[8], Token::Bang);
        assert_eq!(tokens[10], Token::LessThanEquals);
    }

    #[test]
    fn test_dotted_reference() {
        let tokens = kinds("collection1.0.children.schemaA.1.text1");

        assert_eq!(tokens[0], Token::Ident("collection1"));
        assert_eq!(tokens[1], Token::Dot);
        // "0.children" is not a number
        assert_eq!(tokens[2], Token::Number("0"));
        assert_eq!(tokens[4], Token::Ident("children"));
    }

    #[test]
    fn test_lambda_arrows() {
        assert_eq!(kinds("(x) -> x")[3], Token::Arrow);
        assert_eq!(kinds("(x) => x")[3], Token::Arrow);
        assert_eq!(kinds("(x) → x")[3], Token::Arrow);
    }

    #[test]
    fn test_rejects_unknown_characters() {
        assert_eq!(tokenize("1 @ 2"), Err(2));
        assert!(tokenize("$").is_err());
        assert!(tokenize(r#""unterminated"#).is_err());
    }
}
