//! Expression evaluator of the simulated process
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr     := additive ("==" additive)?
//! additive := unary (("+" | "-") unary)*
//! unary    := "++" $var | "*" unary | "-" unary | postfix
//! postfix  := primary ("." ident "(" ")")*
//! primary  := $var | integer | "(" expr ")" | Type::member | global
//! ```

use super::{Cursor, Data, FieldKind, IterKind, SLOT_SIZE, SimProcess, SimValue};
use crate::host::{Host, HostError, HostResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Var(String),
    Int(i64),
    Ident(String),
    Increment,
    Plus,
    Minus,
    Star,
    Equals,
    Open,
    Close,
    Dot,
}

fn tokenize(expr: &str) -> HostResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::Open,
            ')' => Token::Close,
            '.' => Token::Dot,
            '*' => Token::Star,
            '-' => Token::Minus,
            '+' => {
                if chars.next_if(|(_, c)| *c == '+').is_some() {
                    Token::Increment
                } else {
                    Token::Plus
                }
            }
            '=' => {
                if chars.next_if(|(_, c)| *c == '=').is_none() {
                    return Err(HostError::evaluation(expr, "assignment is not supported"));
                }
                Token::Equals
            }
            '$' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_') {
                    name.push(c);
                }
                if name.is_empty() {
                    return Err(HostError::evaluation(expr, "empty placeholder name"));
                }
                Token::Var(name)
            }
            c if c.is_ascii_digit() => {
                let mut end = start + 1;
                while let Some((i, c)) = chars.next_if(|(_, c)| c.is_ascii_alphanumeric()) {
                    end = i + c.len_utf8();
                }
                let text = &expr[start..end];
                let parsed = match text.strip_prefix("0x") {
                    Some(hex) => i64::from_str_radix(hex, 16),
                    None => text.parse(),
                };
                Token::Int(parsed.map_err(|_| HostError::evaluation(expr, format!("bad number {}", text)))?)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + 1;
                while let Some((i, c)) =
                    chars.next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_' || *c == ':')
                {
                    end = i + c.len_utf8();
                }
                Token::Ident(expr[start..end].to_string())
            }
            other => {
                return Err(HostError::evaluation(expr, format!("unexpected '{}'", other)));
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser<'a> {
    process: &'a SimProcess,
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

pub(super) fn evaluate(process: &SimProcess, expr: &str) -> HostResult<SimValue> {
    let mut parser = Parser {
        process,
        expr,
        tokens: tokenize(expr)?,
        pos: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing input"));
    }
    Ok(value)
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> HostError {
        HostError::evaluation(self.expr, reason)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> HostResult<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error("unexpected end of expression"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expression(&mut self) -> HostResult<SimValue> {
        let lhs = self.additive()?;
        if self.eat(&Token::Equals) {
            let rhs = self.additive()?;
            return self.process.equals(self.expr, &lhs, &rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> HostResult<SimValue> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat(&Token::Plus) {
                let rhs = self.unary()?;
                lhs = self.process.add(self.expr, &lhs, &rhs)?;
            } else if self.eat(&Token::Minus) {
                let rhs = self.unary()?;
                lhs = self.process.subtract(self.expr, &lhs, &rhs)?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> HostResult<SimValue> {
        if self.eat(&Token::Increment) {
            return match self.next()? {
                Token::Var(name) => self.process.increment(self.expr, &name),
                _ => Err(self.error("++ needs a placeholder")),
            };
        }
        if self.eat(&Token::Star) {
            let operand = self.unary()?;
            return self.process.deref_cursor(self.expr, &operand);
        }
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            let value = self.process.to_integer(&operand)?;
            return Ok(self.process.alloc_int("int", -value));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> HostResult<SimValue> {
        let mut value = self.primary()?;
        while self.eat(&Token::Dot) {
            let Token::Ident(method) = self.next()? else {
                return Err(self.error("expected a member name"));
            };
            if !(self.eat(&Token::Open) && self.eat(&Token::Close)) {
                return Err(self.error("only zero-argument calls are supported"));
            }
            value = self.process.call_method(&value, &method)?;
        }
        Ok(value)
    }

    fn primary(&mut self) -> HostResult<SimValue> {
        match self.next()? {
            Token::Var(name) => self
                .process
                .var(&name)
                .ok_or_else(|| self.error(format!("${} is not set", name))),
            Token::Int(value) => Ok(self.process.alloc_int("int", value)),
            Token::Open => {
                let value = self.expression()?;
                if !self.eat(&Token::Close) {
                    return Err(self.error("missing ')'"));
                }
                Ok(value)
            }
            Token::Ident(name) => match name.rsplit_once("::") {
                Some((ty, member)) => self.process.static_member(self.expr, ty, member),
                None => self
                    .process
                    .global(&name)
                    .ok_or_else(|| self.error(format!("no symbol \"{}\" in current context", name))),
            },
            other => Err(self.error(format!("unexpected {:?}", other))),
        }
    }
}

impl SimProcess {
    fn iterator_kind(&self, value: &SimValue) -> Option<(IterKind, String)> {
        self.iterator_def(&value.ty)
    }

    fn cursor(&self, value: &SimValue) -> Option<Cursor> {
        match self.data(value) {
            Ok(Data::Iter(cursor)) => Some(cursor),
            _ => None,
        }
    }

    fn static_member(&self, expr: &str, ty: &str, member: &str) -> HostResult<SimValue> {
        let def = self
            .struct_def(ty)
            .ok_or_else(|| HostError::evaluation(expr, format!("no type named {}", ty)))?;
        def.fields
            .iter()
            .find_map(|f| match f.kind {
                FieldKind::Static(address) if f.name == member => Some(SimValue {
                    ty: f.ty.clone(),
                    address,
                }),
                _ => None,
            })
            .ok_or_else(|| HostError::evaluation(expr, format!("{} has no static member {}", ty, member)))
    }

    fn add(&self, expr: &str, lhs: &SimValue, rhs: &SimValue) -> HostResult<SimValue> {
        let amount = self
            .to_integer(rhs)
            .map_err(|_| HostError::evaluation(expr, "right operand of + is not an integer"))?;
        match self.data(lhs)? {
            Data::Pointer(_) => self.offset_pointer(lhs, amount),
            Data::Int(value) => Ok(self.alloc_int(&lhs.ty, value + amount)),
            Data::Iter(Cursor::Indexed { first, pos, len }) => {
                let pos = pos + amount;
                if !(0..=len).contains(&pos) {
                    return Err(HostError::evaluation(expr, "iterator moved out of range"));
                }
                Ok(self.make(lhs.ty.clone(), Data::Iter(Cursor::Indexed { first, pos, len })))
            }
            _ => Err(HostError::evaluation(
                expr,
                format!("no operator+ for {}", lhs.ty),
            )),
        }
    }

    fn subtract(&self, expr: &str, lhs: &SimValue, rhs: &SimValue) -> HostResult<SimValue> {
        match (self.data(lhs)?, self.data(rhs)?) {
            (Data::Pointer(_), Data::Pointer(_)) => {
                Ok(self.alloc_int("long", self.pointer_difference(lhs, rhs)?))
            }
            (Data::Pointer(_), Data::Int(amount)) => self.offset_pointer(lhs, -amount),
            (Data::Int(a), Data::Int(b)) => Ok(self.alloc_int(&lhs.ty, a - b)),
            (
                Data::Iter(Cursor::Indexed { first: f1, pos: a, .. }),
                Data::Iter(Cursor::Indexed { first: f2, pos: b, .. }),
            ) if f1 == f2 => Ok(self.alloc_int("long", a - b)),
            _ => Err(HostError::evaluation(
                expr,
                format!("no operator- for {} and {}", lhs.ty, rhs.ty),
            )),
        }
    }

    fn equals(&self, expr: &str, lhs: &SimValue, rhs: &SimValue) -> HostResult<SimValue> {
        let equal = match (self.data(lhs)?, self.data(rhs)?) {
            (Data::Int(a), Data::Int(b)) => a == b,
            (Data::Pointer(a), Data::Pointer(b)) => a == b,
            (Data::Iter(a), Data::Iter(b)) => {
                if let Some((IterKind::Linked { equality: false }, _)) = self.iterator_kind(lhs) {
                    return Err(HostError::evaluation(
                        expr,
                        format!("no operator== for {}", lhs.ty),
                    ));
                }
                a == b
            }
            _ => {
                return Err(HostError::evaluation(
                    expr,
                    format!("no operator== for {} and {}", lhs.ty, rhs.ty),
                ));
            }
        };
        Ok(self.alloc_int("bool", i64::from(equal)))
    }

    /// `*it` for pointers and simulated iterators
    fn deref_cursor(&self, expr: &str, value: &SimValue) -> HostResult<SimValue> {
        let Some(cursor) = self.cursor(value) else {
            return self.dereference(value);
        };
        let value_type = self
            .iterator_kind(value)
            .map(|(_, ty)| ty)
            .ok_or_else(|| HostError::evaluation(expr, format!("{} is not an iterator", value.ty)))?;

        match cursor {
            Cursor::Indexed { first, pos, len } if (0..len).contains(&pos) => Ok(SimValue {
                ty: value_type,
                address: first + pos as u64 * SLOT_SIZE,
            }),
            Cursor::Linked { node } if node != 0 => match self.read(node)? {
                Data::Node { value, .. } => Ok(SimValue {
                    ty: value_type,
                    address: value,
                }),
                _ => Err(HostError::InvalidAddress(node)),
            },
            _ => Err(HostError::evaluation(expr, "dereferencing an end iterator")),
        }
    }

    /// `++$name`: rebinds the placeholder to the advanced copy
    fn increment(&self, expr: &str, name: &str) -> HostResult<SimValue> {
        let current = self
            .var(name)
            .ok_or_else(|| HostError::evaluation(expr, format!("${} is not set", name)))?;

        let next = match self.data(&current)? {
            Data::Pointer(_) => self.offset_pointer(&current, 1)?,
            Data::Int(value) => self.alloc_int(&current.ty, value + 1),
            Data::Iter(Cursor::Indexed { first, pos, len }) if pos < len => self.make(
                current.ty.clone(),
                Data::Iter(Cursor::Indexed {
                    first,
                    pos: pos + 1,
                    len,
                }),
            ),
            Data::Iter(Cursor::Linked { node }) if node != 0 => {
                let Data::Node { next, .. } = self.read(node)? else {
                    return Err(HostError::InvalidAddress(node));
                };
                self.make(current.ty.clone(), Data::Iter(Cursor::Linked { node: next }))
            }
            Data::Iter(_) => {
                return Err(HostError::evaluation(expr, "incrementing past the end"));
            }
            _ => {
                return Err(HostError::evaluation(
                    expr,
                    format!("no operator++ for {}", current.ty),
                ));
            }
        };

        self.set_var(name, Some(next.clone()));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(process: &SimProcess, expr: &str) -> i64 {
        let value = process.evaluate(expr).unwrap();
        process.to_integer(&value).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let process = SimProcess::new();
        assert_eq!(int(&process, "1 + 2 - 4"), -1);
        assert_eq!(int(&process, "(3 == 3)"), 1);
        assert_eq!(int(&process, "-(2 + 0x10)"), -18);
        assert!(process.evaluate("1 +").is_err());
        assert!(process.evaluate("1 2").is_err());
        assert!(process.evaluate("$x = 1").is_err());
    }

    #[test]
    fn test_placeholders_and_increment() {
        let process = SimProcess::with_samples();
        let (begin, _) = process.alloc_list("ListIter", &[5, 6]);
        process.set_var("it", Some(begin.clone()));

        assert_eq!(int(&process, "*$it"), 5);
        let advanced = process.evaluate("++$it").unwrap();
        assert_eq!(int(&process, "*$it"), 6);
        assert_ne!(advanced, begin);
        // the earlier handle is untouched
        process.set_var("it", Some(begin));
        assert_eq!(int(&process, "*$it"), 5);
        assert!(process.evaluate("$missing").is_err());
    }

    #[test]
    fn test_iterator_capabilities() {
        let process = SimProcess::with_samples();
        process.set_var("b", process.global("indexed_begin"));
        process.set_var("e", process.global("indexed_end"));
        assert_eq!(int(&process, "$e - $b"), 40);
        assert_eq!(int(&process, "*($b + 3)"), 3);

        process.set_var("b", process.global("stream_begin"));
        process.set_var("e", process.global("stream_end"));
        assert!(process.evaluate("$e - $b").is_err());
        assert!(process.evaluate("$b == $e").is_err());

        process.set_var("b", process.global("list_begin"));
        process.set_var("e", process.global("list_end"));
        assert_eq!(int(&process, "$b == $e"), 0);
    }

    #[test]
    fn test_symbols_and_methods() {
        let process = SimProcess::with_samples();
        assert_eq!(int(&process, "ColorRGBA::channels"), 4);
        assert_eq!(int(&process, "numbers.size()"), 35);
        assert!(process.evaluate("ColorRGBA::missing").is_err());
        assert!(process.evaluate("nowhere").is_err());
    }
}
