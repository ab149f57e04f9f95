use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};

/// Deepest expression tree the parser builds. Nested groups, calls, prefix
/// operators and operator chains all count towards it.
pub const MAX_DEPTH: usize = 128;

/// Parse a formula into an expression tree
pub fn parse(source: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(source)?;
    parser.parse_formula()
}

pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    source_len: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source).map_err(ParseError::lexer_error)?;
        Ok(Self {
            tokens,
            pos: 0,
            source_len: source.len(),
            depth: 0,
        })
    }

    /// Parse a complete formula; trailing tokens are an error
    pub fn parse_formula(&mut self) -> ParseResult<Expression> {
        if self.tokens.is_empty() {
            return Err(ParseError::Empty);
        }

        let expr = self.parse_expression()?;

        if let Some((token, span)) = self.peek() {
            return Err(ParseError::unexpected_token(
                span.start,
                "end of formula",
                token.to_string(),
            ));
        }

        Ok(expr)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.descend()?;
        let expr = self.parse_or_expression();
        self.depth -= 1;
        expr
    }

    fn descend(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::too_deep(self.peek_span().start, MAX_DEPTH));
        }
        Ok(())
    }

    /// Parse OR expression (lowest precedence)
    fn parse_or_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and_expression()?;

        let mark = self.depth;
        while self.match_token(Token::OrOr) || self.match_keyword("or") {
            self.descend()?;
            let right = self.parse_and_expression()?;
            left = Expression::binary(left, BinaryOp::Or, right);
        }
        self.depth = mark;

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_equality_expression()?;

        let mark = self.depth;
        while self.match_token(Token::AndAnd) || self.match_keyword("and") {
            self.descend()?;
            let right = self.parse_equality_expression()?;
            left = Expression::binary(left, BinaryOp::And, right);
        }
        self.depth = mark;

        Ok(left)
    }

    /// Parse equality expression (== !=)
    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_comparison_expression()?;

        let mark = self.depth;
        while let Some(op) = self.match_equality_op() {
            self.descend()?;
            let right = self.parse_comparison_expression()?;
            left = Expression::binary(left, op, right);
        }
        self.depth = mark;

        Ok(left)
    }

    /// Parse comparison expression (< > <= >=)
    fn parse_comparison_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive_expression()?;

        let mark = self.depth;
        while let Some(op) = self.match_comparison_op() {
            self.descend()?;
            let right = self.parse_additive_expression()?;
            left = Expression::binary(left, op, right);
        }
        self.depth = mark;

        Ok(left)
    }

    /// Parse additive expression (+ -)
    fn parse_additive_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        let mark = self.depth;
        while let Some(op) = self.match_additive_op() {
            self.descend()?;
            let right = self.parse_multiplicative_expression()?;
            left = Expression::binary(left, op, right);
        }
        self.depth = mark;

        Ok(left)
    }

    /// Parse multiplicative expression (* /)
    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expression()?;

        let mark = self.depth;
        while let Some(op) = self.match_multiplicative_op() {
            self.descend()?;
            let right = self.parse_unary_expression()?;
            left = Expression::binary(left, op, right);
        }
        self.depth = mark;

        Ok(left)
    }

    /// Parse prefix `-` and `!`; a minus directly before a number folds into the literal
    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        if self.match_token(Token::Bang) {
            self.descend()?;
            let operand = self.parse_unary_expression()?;
            self.depth -= 1;
            return Ok(Expression::Unary {
                operator: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }

        if self.match_token(Token::Minus) {
            if let Some((Token::Number(n), span)) = self.peek() {
                let value = Self::parse_number(n, span.start)?;
                self.advance();
                let literal = Expression::Number(-value);
                return self.parse_postfix_operations(literal);
            }

            self.descend()?;
            let operand = self.parse_unary_expression()?;
            self.depth -= 1;
            return Ok(Expression::Unary {
                operator: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }

        let primary = self.parse_primary_expression()?;
        self.parse_postfix_operations(primary)
    }

    /// Parse primary expression (literals, references, calls, lambdas, groups)
    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let Some((token, span)) = self.peek().cloned() else {
            return Err(ParseError::unexpected_eof(self.source_len));
        };

        match token {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Number(Self::parse_number(n, span.start)?))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expression::String(unescape(s)))
            }
            Token::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            Token::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            Token::Ident(name) => {
                self.advance();

                // Single-parameter lambda without parentheses: x -> x * 2
                if self.match_token(Token::Arrow) {
                    let body = self.parse_expression()?;
                    return Ok(Expression::Lambda {
                        params: vec![name.to_string()],
                        body: Box::new(body),
                    });
                }

                if self.check(Token::LParen) {
                    return self.parse_function_call(name.to_string());
                }

                Ok(Expression::Reference(name.to_string()))
            }
            Token::LParen => {
                if let Some(params) = self.lambda_params_ahead() {
                    return self.parse_lambda(params);
                }

                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_list(Token::RBracket)?;
                Ok(Expression::Array(items))
            }
            Token::LBrace => {
                self.advance();
                self.parse_object_literal()
            }
            other => Err(ParseError::unexpected_token(
                span.start,
                "expression",
                other.to_string(),
            )),
        }
    }

    /// Parse function call: functionName(arg1, arg2, ...)
    fn parse_function_call(&mut self, function: String) -> ParseResult<Expression> {
        self.expect(Token::LParen)?;
        let arguments = self.parse_list(Token::RParen)?;

        Ok(Expression::Call {
            function,
            arguments,
        })
    }

    /// Comma separated expressions up to `close`; no leading or trailing commas
    fn parse_list(&mut self, close: Token<'src>) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();

        if self.match_token(close.clone()) {
            return Ok(items);
        }

        loop {
            items.push(self.parse_expression()?);

            if self.match_token(Token::Comma) {
                continue;
            }

            self.expect(close)?;
            break;
        }

        Ok(items)
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expression> {
        let mut pairs = Vec::new();

        if self.match_token(Token::RBrace) {
            return Ok(Expression::Object(pairs));
        }

        loop {
            let key = match self.peek().cloned() {
                Some((Token::String(s), _)) => unescape(s),
                Some((Token::Ident(s), _)) => s.to_string(),
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(span.start, "object key", token.to_string()))
                }
                None => return Err(ParseError::unexpected_eof(self.source_len)),
            };
            self.advance();
            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));

            if self.match_token(Token::Comma) {
                continue;
            }

            self.expect(Token::RBrace)?;
            break;
        }

        Ok(Expression::Object(pairs))
    }

    /// Detects `(a, b) ->` at the current position and returns the parameter names
    fn lambda_params_ahead(&self) -> Option<Vec<String>> {
        let mut offset = 1;
        let mut params = Vec::new();

        loop {
            match self.peek_ahead(offset) {
                Some((Token::Ident(name), _)) => {
                    params.push(name.to_string());
                    offset += 1;
                }
                Some((Token::RParen, _)) if params.is_empty() => {
                    offset += 1;
                    break;
                }
                _ => return None,
            }

            match self.peek_ahead(offset) {
                Some((Token::Comma, _)) => offset += 1,
                Some((Token::RParen, _)) => {
                    offset += 1;
                    break;
                }
                _ => return None,
            }
        }

        match self.peek_ahead(offset) {
            Some((Token::Arrow, _)) => Some(params),
            _ => None,
        }
    }

    fn parse_lambda(&mut self, params: Vec<String>) -> ParseResult<Expression> {
        // Skip "(", params, commas, ")"
        while !self.match_token(Token::RParen) {
            if self.advance().is_none() {
                return Err(ParseError::unexpected_eof(self.source_len));
            }
        }
        self.expect(Token::Arrow)?;
        let body = self.parse_expression()?;

        Ok(Expression::Lambda {
            params,
            body: Box::new(body),
        })
    }

    /// Parse postfix operations: `.prop`, `.0`, `[index]`
    fn parse_postfix_operations(&mut self, mut expr: Expression) -> ParseResult<Expression> {
        let mark = self.depth;
        loop {
            if self.check(Token::Dot) {
                if let Expression::Number(_) = expr {
                    let pos = self.peek_span().start;
                    return Err(ParseError::invalid_syntax(pos, "malformed number"));
                }
                self.advance();

                match self.peek().cloned() {
                    Some((Token::Ident(name), _)) => {
                        self.advance();
                        self.descend()?;
                        expr = Expression::member(expr, name);
                    }
                    Some((Token::Number(n), span)) => {
                        self.advance();
                        // "0.1" lexes as one number but addresses two index segments
                        for segment in n.split('.') {
                            if segment.is_empty() {
                                return Err(ParseError::invalid_syntax(span.start, "empty path segment"));
                            }
                            self.descend()?;
                            expr = Expression::member(expr, segment);
                        }
                    }
                    Some((token, span)) => {
                        return Err(ParseError::unexpected_token(
                            span.start,
                            "property name or index",
                            token.to_string(),
                        ))
                    }
                    None => return Err(ParseError::unexpected_eof(self.source_len)),
                }
            } else if self.match_token(Token::LBracket) {
                self.descend()?;
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        self.depth = mark;

        Ok(expr)
    }

    // Helper methods for matching operators

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::EqualsEquals) {
            Some(BinaryOp::Equals)
        } else if self.match_token(Token::NotEquals) {
            Some(BinaryOp::NotEquals)
        } else {
            None
        }
    }

    fn match_comparison_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::LessThanEquals) {
            Some(BinaryOp::LessThanOrEqual)
        } else if self.match_token(Token::GreaterThanEquals) {
            Some(BinaryOp::GreaterThanOrEqual)
        } else if self.match_token(Token::LessThan) {
            Some(BinaryOp::LessThan)
        } else if self.match_token(Token::GreaterThan) {
            Some(BinaryOp::GreaterThan)
        } else {
            None
        }
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Plus) {
            Some(BinaryOp::Add)
        } else if self.match_token(Token::Minus) {
            Some(BinaryOp::Subtract)
        } else {
            None
        }
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Star) {
            Some(BinaryOp::Multiply)
        } else if self.match_token(Token::Slash) {
            Some(BinaryOp::Divide)
        } else {
            None
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Word operators (`and`, `or`) lex as identifiers; a following `(` makes it a call
    fn match_keyword(&mut self, keyword: &str) -> bool {
        let is_keyword = matches!(self.peek(), Some((Token::Ident(name), _)) if name.eq_ignore_ascii_case(keyword));
        let is_call = matches!(self.peek_ahead(1), Some((Token::LParen, _)));
        if is_keyword && !is_call {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else {
            match self.peek() {
                Some((found, span)) => Err(ParseError::unexpected_token(
                    span.start,
                    token.to_string(),
                    found.to_string(),
                )),
                None => Err(ParseError::unexpected_eof(self.source_len)),
            }
        }
    }

    fn peek_span(&self) -> std::ops::Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    fn parse_number(text: &str, pos: usize) -> ParseResult<f64> {
        text.parse::<f64>()
            .map_err(|_| ParseError::invalid_syntax(pos, format!("invalid number {}", text)))
    }
}

fn unescape(raw: &str) -> String {
    let content = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
