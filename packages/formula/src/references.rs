//! Static reference extraction, used to build formula dependency graphs.

use crate::ast::Expression;
use std::collections::BTreeSet;

/// Root names a formula reads, excluding lambda parameters.
///
/// `sum(table.price)` yields `{"table"}`; `map(rows, (r) -> r.qty)` yields
/// `{"rows"}` because `r` is bound by the lambda.
pub fn root_references(expr: &Expression) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect(expr, &mut Vec::new(), &mut out);
    out
}

fn collect(expr: &Expression, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
    match expr {
        Expression::Number(_) | Expression::String(_) | Expression::Boolean(_) | Expression::Null => {}
        Expression::Array(items) => {
            for item in items {
                collect(item, bound, out);
            }
        }
        Expression::Object(pairs) => {
            for (_, value) in pairs {
                collect(value, bound, out);
            }
        }
        Expression::Reference(name) => {
            if !bound.iter().any(|b| b == name) {
                out.insert(name.clone());
            }
        }
        Expression::Member { object, .. } => collect(object, bound, out),
        Expression::Index { object, index } => {
            collect(object, bound, out);
            collect(index, bound, out);
        }
        Expression::Call { arguments, .. } => {
            for arg in arguments {
                collect(arg, bound, out);
            }
        }
        Expression::Unary { operand, .. } => collect(operand, bound, out),
        Expression::Binary { left, right, .. } => {
            collect(left, bound, out);
            collect(right, bound, out);
        }
        Expression::Lambda { params, body } => {
            let depth = bound.len();
            bound.extend(params.iter().cloned());
            collect(body, bound, out);
            bound.truncate(depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn refs(source: &str) -> Vec<String> {
        root_references(&parse(source).unwrap()).into_iter().collect()
    }

    #[test]
    fn test_collects_roots() {
        assert_eq!(refs("price * qty + 1"), vec!["price", "qty"]);
        assert_eq!(refs("sum(table.amount)"), vec!["table"]);
        assert_eq!(refs(r#"if(flag, a, "b")"#), vec!["a", "flag"]);
    }

    #[test]
    fn test_lambda_params_are_not_references() {
        assert_eq!(refs("map(rows, (r) -> r.qty * rate)"), vec!["rate", "rows"]);
        assert_eq!(refs("reduce(xs, (acc, x) -> acc + x, 0)"), vec!["xs"]);
    }

    #[test]
    fn test_index_expression_references() {
        assert_eq!(refs("list[position]"), vec!["list", "position"]);
    }
}
