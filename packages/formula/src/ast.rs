//! Formula syntax tree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,

    /// `[a, b, c]`
    Array(Vec<Expression>),

    /// `{ "key": value }`
    Object(Vec<(String, Expression)>),

    /// Bare name: field identifier, lambda parameter, `current`/`self`
    Reference(String),

    /// `object.property`, including numeric segments such as `table.0`
    Member {
        object: Box<Expression>,
        property: String,
    },

    /// `object[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },

    Call {
        function: String,
        arguments: Vec<Expression>,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },

    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
    },

    /// `(row) -> expr`, only meaningful as a function argument
    Lambda {
        params: Vec<String>,
        body: Box<Expression>,
    },
}

impl Expression {
    pub fn reference(name: impl Into<String>) -> Self {
        Expression::Reference(name.into())
    }

    pub fn binary(left: Expression, operator: BinaryOp, right: Expression) -> Self {
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    pub fn member(object: Expression, property: impl Into<String>) -> Self {
        Expression::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    /// Dotted path of a member chain rooted at a reference
    /// (`collection.0.children.schemaA`).
    pub fn path(&self) -> Option<String> {
        match self {
            Expression::Reference(name) => Some(name.clone()),
            Expression::Member { object, property } => {
                object.path().map(|base| format!("{}.{}", base, property))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    And,
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(symbol)
    }
}
