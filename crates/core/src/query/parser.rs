//! Recursive-descent parser for the query language.
//!
//! Grammar (AND binds tighter than OR, juxtaposition is AND):
//!
//! ```text
//! query      := or_expr
//! or_expr    := and_expr (OR and_expr)*
//! and_expr   := unary (AND? unary)*
//! unary      := NOT unary | primary
//! primary    := LPAREN or_expr RPAREN | term
//! ```

use chronarc_domain::errors::ChronarcError;
use chronarc_domain::types::classification::{Expr, Field, Op, Value};

use super::tokenizer::{tokenize, Token};

pub fn parse(input: &str) -> Result<Expr, ChronarcError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        // An empty query matches nothing: an impossible term.
        return Ok(Expr::Term {
            field: Field::Status,
            op: Op::Eq,
            value: Value::Text("__never_matches__".to_string()),
        });
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ChronarcError::InvalidQuery(
            "unexpected trailing tokens".to_string(),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn parse_or(&mut self) -> Result<Expr, ChronarcError> {
        let mut operands = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(if operands.len() == 1 { operands.remove(0) } else { Expr::Or(operands) })
    }

    fn parse_and(&mut self) -> Result<Expr, ChronarcError> {
        let mut operands = vec![self.parse_unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    operands.push(self.parse_unary()?);
                }
                Some(Token::Or) | Some(Token::RParen) | None => break,
                _ => operands.push(self.parse_unary()?),
            }
        }
        Ok(if operands.len() == 1 { operands.remove(0) } else { Expr::And(operands) })
    }

    fn parse_unary(&mut self) -> Result<Expr, ChronarcError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ChronarcError> {
        match self.advance() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err(ChronarcError::InvalidQuery("unmatched '('".to_string())),
                }
            }
            Some(Token::Term(field, value)) => parse_term(&field, &value),
            Some(Token::Bare(word)) => Ok(Expr::Term {
                field: Field::Text,
                op: Op::Eq,
                value: Value::Text(word),
            }),
            Some(other) => Err(ChronarcError::InvalidQuery(format!(
                "unexpected token: {other:?}"
            ))),
            None => Err(ChronarcError::InvalidQuery("unexpected end of query".to_string())),
        }
    }
}

fn parse_term(field_name: &str, raw_value: &str) -> Result<Expr, ChronarcError> {
    let field = Field::from_name(field_name)
        .ok_or_else(|| ChronarcError::InvalidQuery(format!("unknown field: {field_name}")))?;

    match field {
        Field::Recurring | Field::IsAllDay | Field::HasAttendees => {
            let b = parse_bool(raw_value)?;
            Ok(Expr::Term { field, op: Op::Eq, value: Value::Bool(b) })
        }
        Field::TimeOfDay => {
            let (op, rest) = split_op(raw_value);
            let (hour, minute) = parse_hhmm(rest)?;
            Ok(Expr::Term { field, op, value: Value::Time { hour, minute } })
        }
        Field::Confidence => {
            let (op, rest) = split_op(raw_value);
            let n: f64 = rest
                .parse()
                .map_err(|_| ChronarcError::InvalidQuery(format!("invalid number: {rest}")))?;
            Ok(Expr::Term { field, op, value: Value::Number(n) })
        }
        _ => Ok(Expr::Term {
            field,
            op: Op::Eq,
            value: Value::Text(raw_value.to_string()),
        }),
    }
}

fn parse_bool(s: &str) -> Result<bool, ChronarcError> {
    match s.to_ascii_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(ChronarcError::InvalidQuery(format!("expected yes/no, got: {s}"))),
    }
}

fn split_op(s: &str) -> (Op, &str) {
    if let Some(rest) = s.strip_prefix("<=") {
        (Op::Le, rest)
    } else if let Some(rest) = s.strip_prefix(">=") {
        (Op::Ge, rest)
    } else if let Some(rest) = s.strip_prefix('<') {
        (Op::Lt, rest)
    } else if let Some(rest) = s.strip_prefix('>') {
        (Op::Gt, rest)
    } else if let Some(rest) = s.strip_prefix('=') {
        (Op::Eq, rest)
    } else {
        (Op::Eq, s)
    }
}

fn parse_hhmm(s: &str) -> Result<(u32, u32), ChronarcError> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| ChronarcError::InvalidQuery(format!("invalid time-of-day: {s}")))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| ChronarcError::InvalidQuery(format!("invalid time-of-day: {s}")))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| ChronarcError::InvalidQuery(format!("invalid time-of-day: {s}")))?;
    if hour > 23 || minute > 59 {
        return Err(ChronarcError::InvalidQuery(format!("invalid time-of-day: {s}")));
    }
    Ok((hour, minute))
}
