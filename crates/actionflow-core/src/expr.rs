//! Condition and value expressions.
//!
//! The evaluator only depends on the [`Evaluator`] trait. [`ExprEvaluator`]
//! is the default implementation: a small boolean language over the
//! context (literals, dotted paths, comparisons, `&&`/`||`/`!`).

use crate::context::Context;
use crate::error::{ActionError, Result};
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Evaluator trait
// ---------------------------------------------------------------------------

pub trait Evaluator {
    /// Evaluate `expr` against the context.
    fn eval(&self, expr: &str, ctx: &Context) -> Result<Value>;

    /// Evaluate `expr` as a condition.
    fn test(&self, expr: &str, ctx: &Context) -> Result<bool> {
        Ok(is_truthy(&self.eval(expr, ctx)?))
    }
}

/// Null, `false`, zero, the empty string and empty collections are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Ident(String),
    Op(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:(?P<num>-?\d+(?:\.\d+)?)|(?P<str>'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")|(?P<op>&&|\|\||==|!=|<=|>=|<|>|!|\(|\))|(?P<ident>[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z0-9_$]+)*))"#,
        )
        .expect("valid regex")
    })
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let re = token_re();
    let mut tokens = Vec::new();
    let mut rest = expr;

    while !rest.trim_start().is_empty() {
        let caps = re.captures(rest).ok_or_else(|| {
            let at = expr.len() - rest.trim_start().len();
            ActionError::expression(expr, format!("unexpected input at offset {at}"))
        })?;

        let token = if let Some(m) = caps.name("num") {
            let n: Number = m
                .as_str()
                .parse()
                .map_err(|_| ActionError::expression(expr, format!("bad number '{}'", m.as_str())))?;
            Token::Literal(Value::Number(n))
        } else if let Some(m) = caps.name("str") {
            Token::Literal(Value::String(unquote(m.as_str())))
        } else if let Some(m) = caps.name("op") {
            match m.as_str() {
                "&&" => Token::And,
                "||" => Token::Or,
                "==" => Token::Op(CmpOp::Eq),
                "!=" => Token::Op(CmpOp::Ne),
                "<=" => Token::Op(CmpOp::Le),
                ">=" => Token::Op(CmpOp::Ge),
                "<" => Token::Op(CmpOp::Lt),
                ">" => Token::Op(CmpOp::Gt),
                "!" => Token::Not,
                "(" => Token::LParen,
                _ => Token::RParen,
            }
        } else if let Some(m) = caps.name("ident") {
            match m.as_str() {
                "true" => Token::Literal(Value::Bool(true)),
                "false" => Token::Literal(Value::Bool(false)),
                "null" => Token::Literal(Value::Null),
                "and" => Token::And,
                "or" => Token::Or,
                "not" => Token::Not,
                path => Token::Ident(path.to_string()),
            }
        } else {
            unreachable!("token regex has one capture per alternative")
        };

        tokens.push(token);
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }

    Ok(tokens)
}

/// Strip the surrounding quotes and resolve backslash escapes.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
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
            None => out.push('\\'),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest nesting of `!` and parentheses a single expression may use.
const MAX_NESTING: usize = 64;

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, reason: impl Into<String>) -> ActionError {
        ActionError::expression(self.src, reason)
    }

    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("nested deeper than {MAX_NESTING} levels")));
        }
        self.depth += 1;
        Ok(())
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            self.descend()?;
            let inner = self.not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.cmp()
    }

    fn cmp(&mut self) -> Result<Expr> {
        let lhs = self.primary()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.primary()?;
            return Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Literal(v)) => Ok(Expr::Literal(v)),
            Some(Token::Ident(path)) => Ok(Expr::Path(path)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing ')'")),
                }
            }
            Some(other) => Err(self.error(format!("unexpected token {other:?}"))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Parse an expression without evaluating it.
pub fn parse(expr: &str) -> Result<Expr> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ActionError::expression(expr, "empty expression"));
    }
    let mut parser = Parser {
        src: expr,
        tokens,
        pos: 0,
        depth: 0,
    };
    let ast = parser.or()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(ast)
}

// ---------------------------------------------------------------------------
// ExprEvaluator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn value_of(&self, ast: &Expr, ctx: &Context) -> Value {
        match ast {
            Expr::Literal(v) => v.clone(),
            Expr::Path(path) => builtin(path)
                .or_else(|| ctx.lookup(path).cloned())
                .unwrap_or(Value::Null),
            Expr::Not(inner) => Value::Bool(!is_truthy(&self.value_of(inner, ctx))),
            Expr::And(lhs, rhs) => Value::Bool(
                is_truthy(&self.value_of(lhs, ctx)) && is_truthy(&self.value_of(rhs, ctx)),
            ),
            Expr::Or(lhs, rhs) => Value::Bool(
                is_truthy(&self.value_of(lhs, ctx)) || is_truthy(&self.value_of(rhs, ctx)),
            ),
            Expr::Cmp(op, lhs, rhs) => {
                let (l, r) = (self.value_of(lhs, ctx), self.value_of(rhs, ctx));
                Value::Bool(compare(*op, &l, &r))
            }
        }
    }
}

impl Evaluator for ExprEvaluator {
    fn eval(&self, expr: &str, ctx: &Context) -> Result<Value> {
        let ast = parse(expr)?;
        Ok(self.value_of(&ast, ctx))
    }
}

fn builtin(name: &str) -> Option<Value> {
    let value = match name {
        "__date__" => chrono::Local::now().date_naive().to_string(),
        "__datetime__" => chrono::Utc::now().to_rfc3339(),
        "__time__" => chrono::Local::now().format("%H:%M:%S").to_string(),
        _ => return None,
    };
    Some(Value::String(value))
}

fn compare(op: CmpOp, l: &Value, r: &Value) -> bool {
    let ordering = match (l, r) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match op {
        CmpOp::Eq => ordering.map_or(l == r, |o| o == Ordering::Equal),
        CmpOp::Ne => ordering.map_or(l != r, |o| o != Ordering::Equal),
        CmpOp::Lt => ordering == Some(Ordering::Less),
        CmpOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => ordering == Some(Ordering::Greater),
        CmpOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}
