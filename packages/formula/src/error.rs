use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of formula at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },

    #[error("Formula nests deeper than {limit} levels at {pos}")]
    TooDeep { pos: usize, limit: usize },

    #[error("Empty formula")]
    Empty,
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    pub fn too_deep(pos: usize, limit: usize) -> Self {
        Self::TooDeep { pos, limit }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Unknown reference: {name}")]
    UnknownReference { name: String },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("Invalid operands for operator {operator}: {details}")]
    InvalidOperands { operator: String, details: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Index out of bounds: {index}")]
    IndexOutOfBounds { index: i64 },
}

impl EvalError {
    pub fn unknown_reference(name: impl Into<String>) -> Self {
        Self::UnknownReference { name: name.into() }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    pub fn arity(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        Self::Arity {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
