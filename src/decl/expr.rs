//! Type expressions such as `Dict[str, Optional[List[Person]]]`.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{CodecError, Result};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:(?P<name>[A-Za-z_][A-Za-z0-9_]*)|(?P<lit>"(?:[^"\\]|\\.)*"|-?[0-9]+)|(?P<punct>[\[\],]))"#)
        .expect("token pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Name(String),
    Apply { head: String, args: Vec<TypeExpr> },
    /// A JSON string or integer, as written inside `Literal[...]`.
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Literal(&'a str),
    Open,
    Close,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while !rest.trim_start().is_empty() {
        let Some(caps) = TOKEN.captures(rest) else {
            let at = src.len() - rest.trim_start().len();
            return Err(CodecError::unsupported(src, format!("unexpected character at offset {at}")));
        };
        let token = match (caps.name("name"), caps.name("punct").map(|m| m.as_str())) {
            (Some(name), _) => Token::Name(name.as_str()),
            (None, None) => Token::Literal(caps.name("lit").map_or("", |m| m.as_str())),
            (None, Some("[")) => Token::Open,
            (None, Some("]")) => Token::Close,
            _ => Token::Comma,
        };
        tokens.push(token);
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }
    Ok(tokens)
}

struct Parser<'s, 't> {
    src: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
}

impl<'s> Parser<'s, '_> {
    fn fail(&self, reason: &str) -> CodecError {
        CodecError::unsupported(self.src, format!("{reason} (token {})", self.pos))
    }

    fn next(&mut self) -> Option<Token<'s>> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<TypeExpr> {
        let head = match self.next() {
            Some(Token::Name(name)) => name.to_owned(),
            Some(Token::Literal(text)) => {
                return serde_json::from_str(text)
                    .map(TypeExpr::Literal)
                    .map_err(|_| self.fail("malformed literal"));
            }
            _ => return Err(self.fail("expected a type name")),
        };
        if self.peek() != Some(Token::Open) {
            return Ok(TypeExpr::Name(head));
        }
        self.pos += 1;
        let mut args = vec![self.expr()?];
        loop {
            match self.next() {
                Some(Token::Comma) => args.push(self.expr()?),
                Some(Token::Close) => break,
                _ => return Err(self.fail("expected `,` or `]`")),
            }
        }
        Ok(TypeExpr::Apply { head, args })
    }
}

impl TypeExpr {
    pub fn parse(src: &str) -> Result<Self> {
        let tokens = tokenize(src)?;
        let mut parser = Parser { src, tokens: &tokens, pos: 0 };
        let expr = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(parser.fail("trailing input"));
        }
        Ok(expr)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Apply { head, args } => {
                write!(f, "{head}[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str("]")
            }
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_generics() {
        let expr = TypeExpr::parse(" Dict[str,Optional[ List[Person] ]]").unwrap();
        assert_eq!(expr.to_string(), "Dict[str, Optional[List[Person]]]");
        let TypeExpr::Apply { head, args } = expr else { panic!("generic expected") };
        assert_eq!(head, "Dict");
        assert_eq!(args[0], TypeExpr::Name("str".into()));
    }

    #[test]
    fn literal_arguments() {
        let expr = TypeExpr::parse(r#"Literal["left", "a \"b\"",-3, 7]"#).unwrap();
        let TypeExpr::Apply { head, args } = &expr else { panic!("generic expected") };
        assert_eq!(head, "Literal");
        assert_eq!(
            args,
            &vec![
                TypeExpr::Literal(Value::from("left")),
                TypeExpr::Literal(Value::from("a \"b\"")),
                TypeExpr::Literal(Value::from(-3)),
                TypeExpr::Literal(Value::from(7)),
            ]
        );
        assert_eq!(expr.to_string(), r#"Literal["left", "a \"b\"", -3, 7]"#);
    }

    #[test]
    fn malformed_expressions() {
        let cases = ["", "List[", "List[int", "List[int]]", "Dict[str,]", "List[]", "int?", "[int]", r#"Literal["a]"#, "1.5"];
        for bad in cases {
            let err = TypeExpr::parse(bad).unwrap_err();
            assert_eq!(err.category(), "UnsupportedType", "{bad:?}");
        }
    }
}
