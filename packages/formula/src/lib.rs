//! # Formdoc Formula
//!
//! Expression language for computed field values.
//!
//! ```text
//! source ──tokenize──▶ tokens ──parse──▶ Expression ──evaluate──▶ Value
//!                                            │
//!                                            └──root_references──▶ dependency names
//! ```
//!
//! Evaluation is pure: names are resolved through an [`EvaluationContext`]
//! and functions through a case-insensitive [`FunctionRegistry`].
//!
//! ```
//! use formdoc_formula::{Evaluator, MapContext, Value};
//!
//! let ctx = MapContext::new().with("price", 2.5).with("qty", 4.0);
//! let total = Evaluator::new().evaluate_str("price * qty", &ctx).unwrap();
//! assert_eq!(total, Value::Number(10.0));
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod references;
pub mod tokenizer;
pub mod value;

pub use ast::{BinaryOp, Expression, UnaryOp};
pub use context::{EvaluationContext, MapContext, ScopedContext};
pub use error::{EvalError, EvalResult, ParseError, ParseResult};
pub use evaluator::Evaluator;
pub use functions::{BuiltinFn, FunctionRegistry};
pub use parser::{parse, MAX_DEPTH};
pub use references::root_references;
pub use tokenizer::{tokenize, Token};
pub use value::Value;
