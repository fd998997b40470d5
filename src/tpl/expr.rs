use crate::error::{Result, TemplateError};
use crate::tpl::render_context::Scope;
use crate::value::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Attr(Box<Expr>, String),
    Len(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
}

/// Header of a `for` statement: `target in seq` or `a, b in seq`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForHeader {
    pub targets: Vec<String>,
    pub seq: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    Dot,
    Comma,
    Minus,
}

fn invalid(src: &str, reason: impl std::fmt::Display) -> TemplateError {
    TemplateError::Evaluation(format!("invalid expression `{}`: {}", src, reason))
}

fn lex(src: &str) -> Result<Vec<Tok>> {
    let chars: Vec<char> = src.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            '.' => {
                toks.push(Tok::Dot);
                i += 1;
            }
            ',' => {
                toks.push(Tok::Comma);
                i += 1;
            }
            '-' => {
                toks.push(Tok::Minus);
                i += 1;
            }
            '=' | '!' | '<' | '>' => {
                let two = chars.get(i + 1) == Some(&'=');
                let op = match (c, two) {
                    ('=', true) => "==",
                    ('!', true) => "!=",
                    ('<', true) => "<=",
                    ('>', true) => ">=",
                    ('<', false) => "<",
                    ('>', false) => ">",
                    _ => return Err(invalid(src, format!("unexpected `{}`", c))),
                };
                toks.push(Tok::Op(op));
                i += if two { 2 } else { 1 };
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or_else(|| invalid(src, "unterminated string"))?;
                toks.push(Tok::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text.contains('.') {
                    let f = text.parse().map_err(|_| invalid(src, format!("bad number `{}`", text)))?;
                    toks.push(Tok::Float(f));
                } else {
                    let n = text.parse().map_err(|_| invalid(src, format!("bad number `{}`", text)))?;
                    toks.push(Tok::Int(n));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                toks.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(invalid(src, format!("unexpected `{}`", other))),
        }
    }
    Ok(toks)
}

struct Parser<'s> {
    src: &'s str,
    toks: Vec<Tok>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Result<Self> {
        Ok(Self {
            src,
            toks: lex(src)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(s)) if s == kw)
    }

    fn peek_keyword_at(&self, offset: usize, kw: &str) -> bool {
        matches!(self.toks.get(self.pos + offset), Some(Tok::Ident(s)) if s == kw)
    }

    fn expect(&mut self, tok: Tok) -> Result<()> {
        match self.next() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(invalid(self.src, format!("expected {:?}, found {:?}", tok, t))),
            None => Err(invalid(self.src, format!("expected {:?}", tok))),
        }
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(invalid(self.src, format!("unexpected {:?}", t))),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Tok::Ident(s)) if !is_reserved(&s) => Ok(s),
            Some(t) => Err(invalid(self.src, format!("expected a name, found {:?}", t))),
            None => Err(invalid(self.src, "expected a name")),
        }
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.not_expr()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.peek_keyword("not") {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.primary()?;
        let (op, width) = match self.peek() {
            Some(Tok::Op(op)) => match *op {
                "==" => (CmpOp::Eq, 1),
                "!=" => (CmpOp::Ne, 1),
                "<" => (CmpOp::Lt, 1),
                "<=" => (CmpOp::Le, 1),
                ">" => (CmpOp::Gt, 1),
                _ => (CmpOp::Ge, 1),
            },
            Some(Tok::Ident(s)) if s == "in" => (CmpOp::In, 1),
            Some(Tok::Ident(s)) if s == "not" && self.peek_keyword_at(1, "in") => (CmpOp::NotIn, 2),
            _ => return Ok(left),
        };
        self.pos += width;
        let right = self.primary()?;
        Ok(Expr::Compare(Box::new(left), op, Box::new(right)))
    }

    fn primary(&mut self) -> Result<Expr> {
        let mut expr = match self.next() {
            Some(Tok::Int(n)) => Expr::Literal(Value::Int(n)),
            Some(Tok::Float(f)) => Expr::Literal(Value::Float(f)),
            Some(Tok::Str(s)) => Expr::Literal(Value::Str(s)),
            Some(Tok::Minus) => match self.next() {
                Some(Tok::Int(n)) => Expr::Literal(Value::Int(-n)),
                Some(Tok::Float(f)) => Expr::Literal(Value::Float(-f)),
                _ => return Err(invalid(self.src, "`-` must precede a number")),
            },
            Some(Tok::LParen) => {
                let inner = self.or_expr()?;
                self.expect(Tok::RParen)?;
                inner
            }
            Some(Tok::Ident(s)) => {
                if let Some(lit) = keyword_literal(&s) {
                    Expr::Literal(lit)
                } else if s == "len" && self.peek() == Some(&Tok::LParen) {
                    self.pos += 1;
                    let arg = self.or_expr()?;
                    self.expect(Tok::RParen)?;
                    Expr::Len(Box::new(arg))
                } else if is_reserved(&s) {
                    return Err(invalid(self.src, format!("unexpected `{}`", s)));
                } else {
                    Expr::Name(s)
                }
            }
            Some(t) => return Err(invalid(self.src, format!("unexpected {:?}", t))),
            None => return Err(invalid(self.src, "unexpected end")),
        };

        while self.peek() == Some(&Tok::Dot) {
            self.pos += 1;
            let attr = self.ident()?;
            expr = Expr::Attr(Box::new(expr), attr);
        }
        Ok(expr)
    }
}

fn keyword_literal(s: &str) -> Option<Value> {
    match s {
        "true" | "True" => Some(Value::Bool(true)),
        "false" | "False" => Some(Value::Bool(false)),
        "none" | "None" | "null" => Some(Value::Null),
        _ => None,
    }
}

fn is_reserved(s: &str) -> bool {
    matches!(s, "and" | "or" | "not" | "in")
}

/// Parses an `if`/`elif` condition.
pub fn parse(src: &str) -> Result<Expr> {
    let mut p = Parser::new(src)?;
    let expr = p.or_expr()?;
    p.finish()?;
    Ok(expr)
}

/// Parses the header of a `for` statement.
pub fn parse_for(src: &str) -> Result<ForHeader> {
    let mut p = Parser::new(src)?;
    let mut targets = vec![p.ident()?];
    while p.peek() == Some(&Tok::Comma) {
        p.pos += 1;
        targets.push(p.ident()?);
    }
    if !p.peek_keyword("in") {
        return Err(invalid(src, "expected `in`"));
    }
    p.pos += 1;
    let seq = p.or_expr()?;
    p.finish()?;
    Ok(ForHeader { targets, seq })
}

impl Expr {
    pub fn eval(&self, scope: &Scope) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Name(name) => Ok(scope.lookup(name).cloned().unwrap_or(Value::Null)),
            Expr::Attr(base, attr) => {
                let base = base.eval(scope)?;
                Ok(base.attr(attr).cloned().unwrap_or(Value::Null))
            }
            Expr::Len(arg) => {
                let v = arg.eval(scope)?;
                v.len().map(Value::from).ok_or_else(|| {
                    TemplateError::Evaluation(format!("{} has no length", v.type_name()))
                })
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.eval(scope)?.is_truthy())),
            Expr::And(l, r) => {
                let left = l.eval(scope)?;
                if left.is_truthy() { r.eval(scope) } else { Ok(left) }
            }
            Expr::Or(l, r) => {
                let left = l.eval(scope)?;
                if left.is_truthy() { Ok(left) } else { r.eval(scope) }
            }
            Expr::Compare(l, op, r) => {
                let left = l.eval(scope)?;
                let right = r.eval(scope)?;
                compare(&left, *op, &right).map(Value::Bool)
            }
        }
    }
}

fn compare(left: &Value, op: CmpOp, right: &Value) -> Result<bool> {
    let ordered = |accept: fn(Ordering) -> bool| {
        left.compare(right).map(accept).ok_or_else(|| {
            TemplateError::Evaluation(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ))
        })
    };
    match op {
        CmpOp::Eq => Ok(left.loose_eq(right)),
        CmpOp::Ne => Ok(!left.loose_eq(right)),
        CmpOp::Lt => ordered(|o| o == Ordering::Less),
        CmpOp::Le => ordered(|o| o != Ordering::Greater),
        CmpOp::Gt => ordered(|o| o == Ordering::Greater),
        CmpOp::Ge => ordered(|o| o != Ordering::Less),
        CmpOp::In => contains(right, left),
        CmpOp::NotIn => contains(right, left).map(|b| !b),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool> {
    match (haystack, needle) {
        (Value::List(items), _) => Ok(items.iter().any(|v| v.loose_eq(needle))),
        (Value::Map(m), Value::Str(key)) => Ok(m.contains_key(key)),
        (Value::Str(s), Value::Str(sub)) => Ok(s.contains(sub.as_str())),
        _ => Err(TemplateError::Evaluation(format!(
            "`in` is not supported between {} and {}",
            needle.type_name(),
            haystack.type_name()
        ))),
    }
}
