//! Type descriptor parser
//!
//! Supports the ClickHouse type grammar used by the native client:
//! - primitive names (`UInt8` .. `UInt64`, `Int8` .. `Int64`, `Float32`, `Float64`,
//!   `String`, `Bool`, `Date`, `UUID`)
//! - `DateTime`, `DateTime('tz')`, `DateTime64(N)`, `DateTime64(N, 'tz')`
//! - `Decimal(P, S)`, `Decimal32(S)`, `Decimal64(S)`, `Decimal128(S)`
//! - `Nullable(T)`, `Array(T)`, `LowCardinality(T)`, `Map(K, V)`
//! - `Tuple(T1, ...)`, with optional element names (`Tuple(id UInt64, name String)`)

use ahash::AHashMap;

use super::{ColumnType, MAX_DATETIME64_PRECISION, MAX_DECIMAL_PRECISION};
use crate::{ChexError, Result};

/// Type descriptor parser
pub struct TypeParser<'a> {
    descriptor: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    aliases: Option<&'a AHashMap<String, ColumnType>>,
}

/// Token types for the descriptor lexer
#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Identifier(String),
    StringLit(String),
    IntLit(u64),
    Eof,
}

/// A parenthesised argument: nested type, integer parameter or quoted string
#[derive(Debug)]
enum Arg {
    Type(ColumnType),
    Int(u64),
    Str(String),
}

impl<'a> TypeParser<'a> {
    /// Parse a type descriptor
    pub fn parse(descriptor: &str) -> Result<ColumnType> {
        TypeParser::parse_with_aliases(descriptor, None)
    }

    /// Parse a type descriptor, resolving bare identifiers through an alias table
    /// (keys are upper-case)
    pub fn parse_with_aliases(
        descriptor: &'a str,
        aliases: Option<&'a AHashMap<String, ColumnType>>,
    ) -> Result<ColumnType> {
        let mut parser = TypeParser {
            descriptor,
            tokens: Vec::new(),
            pos: 0,
            aliases,
        };
        parser.tokens = parser.tokenize()?;
        let ty = parser.parse_type()?;
        if parser.current() != &Token::Eof {
            return Err(parser.error(format!("unexpected trailing token {:?}", parser.current())));
        }
        Ok(ty)
    }

    fn error(&self, reason: impl Into<String>) -> ChexError {
        ChexError::UnknownType {
            descriptor: self.descriptor.to_string(),
            reason: reason.into(),
        }
    }

    /// Tokenize descriptor string
    fn tokenize(&self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let chars: Vec<char> = self.descriptor.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            let c = chars[i];

            if c.is_whitespace() {
                i += 1;
                continue;
            }

            match c {
                '(' => { tokens.push(Token::LParen); i += 1; continue; }
                ')' => { tokens.push(Token::RParen); i += 1; continue; }
                ',' => { tokens.push(Token::Comma); i += 1; continue; }
                _ => {}
            }

            // Quoted parameters (time zones)
            if c == '\'' {
                i += 1;
                let start = i;
                while i < len && chars[i] != '\'' {
                    i += 1;
                }
                if i >= len {
                    return Err(self.error("unterminated string literal"));
                }
                let s: String = chars[start..i].iter().collect();
                tokens.push(Token::StringLit(s));
                i += 1;
                continue;
            }

            if c.is_ascii_digit() {
                let start = i;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let n: u64 = num_str
                    .parse()
                    .map_err(|_| self.error(format!("invalid number: {}", num_str)))?;
                tokens.push(Token::IntLit(n));
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(Token::Identifier(word));
                continue;
            }

            return Err(self.error(format!("unexpected character: {}", c)));
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn parse_type(&mut self) -> Result<ColumnType> {
        let name = match self.advance() {
            Token::Identifier(name) => name,
            other => return Err(self.error(format!("expected type name, found {:?}", other))),
        };

        let mut args = Vec::new();
        if self.current() == &Token::LParen {
            self.advance();
            loop {
                args.push(self.parse_arg()?);
                match self.advance() {
                    Token::Comma => continue,
                    Token::RParen => break,
                    other => {
                        return Err(self.error(format!("expected ',' or ')', found {:?}", other)))
                    }
                }
            }
        }

        self.build(&name, args)
    }

    fn parse_arg(&mut self) -> Result<Arg> {
        match self.current().clone() {
            Token::IntLit(n) => {
                self.advance();
                Ok(Arg::Int(n))
            }
            Token::StringLit(s) => {
                self.advance();
                Ok(Arg::Str(s))
            }
            Token::Identifier(_) => {
                // Named tuple element: `name Type`
                if matches!(self.peek(1), Token::Identifier(_)) {
                    self.advance();
                }
                Ok(Arg::Type(self.parse_type()?))
            }
            other => Err(self.error(format!("unexpected token {:?}", other))),
        }
    }

    fn build(&self, name: &str, args: Vec<Arg>) -> Result<ColumnType> {
        let primitive = match name {
            "UInt8" => Some(ColumnType::UInt8),
            "UInt16" => Some(ColumnType::UInt16),
            "UInt32" => Some(ColumnType::UInt32),
            "UInt64" => Some(ColumnType::UInt64),
            "Int8" => Some(ColumnType::Int8),
            "Int16" => Some(ColumnType::Int16),
            "Int32" => Some(ColumnType::Int32),
            "Int64" => Some(ColumnType::Int64),
            "Float32" => Some(ColumnType::Float32),
            "Float64" => Some(ColumnType::Float64),
            "String" => Some(ColumnType::String),
            "Bool" => Some(ColumnType::Bool),
            "Date" => Some(ColumnType::Date),
            "UUID" => Some(ColumnType::Uuid),
            _ => None,
        };
        if let Some(ty) = primitive {
            if !args.is_empty() {
                return Err(self.error(format!("{} takes no parameters", name)));
            }
            return Ok(ty);
        }

        match name {
            "Nullable" => Ok(ColumnType::Nullable(Box::new(self.single_type(name, args)?))),
            "Array" => Ok(ColumnType::Array(Box::new(self.single_type(name, args)?))),
            "LowCardinality" => {
                Ok(ColumnType::LowCardinality(Box::new(self.single_type(name, args)?)))
            }
            "Tuple" => {
                if args.is_empty() {
                    return Err(self.error("Tuple requires at least one element"));
                }
                let elements = args
                    .into_iter()
                    .map(|arg| self.type_arg(name, arg))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ColumnType::Tuple(elements))
            }
            "Map" => {
                let mut types = self.type_args(name, args, 2)?;
                let value = types.pop().ok_or_else(|| self.error("Map requires a value type"))?;
                let key = types.pop().ok_or_else(|| self.error("Map requires a key type"))?;
                Ok(ColumnType::Map(Box::new(key), Box::new(value)))
            }
            "Decimal" => {
                let params = self.int_args(name, args, 2)?;
                self.decimal(params[0], params[1])
            }
            "Decimal32" => self.decimal(9, self.int_args(name, args, 1)?[0]),
            "Decimal64" => self.decimal(18, self.int_args(name, args, 1)?[0]),
            "Decimal128" => self.decimal(38, self.int_args(name, args, 1)?[0]),
            "DateTime" => {
                let mut args = args.into_iter();
                let timezone = match args.next() {
                    None => None,
                    Some(Arg::Str(tz)) => Some(tz),
                    Some(_) => return Err(self.error("DateTime accepts only a quoted time zone")),
                };
                if args.next().is_some() {
                    return Err(self.error("DateTime takes at most one parameter"));
                }
                Ok(ColumnType::DateTime { timezone })
            }
            "DateTime64" => {
                let mut args = args.into_iter();
                let precision = match args.next() {
                    Some(Arg::Int(p)) if p <= MAX_DATETIME64_PRECISION as u64 => p as u8,
                    Some(Arg::Int(p)) => {
                        return Err(self.error(format!("DateTime64 precision {} exceeds {}", p, MAX_DATETIME64_PRECISION)))
                    }
                    _ => return Err(self.error("DateTime64 requires a precision")),
                };
                let timezone = match args.next() {
                    None => None,
                    Some(Arg::Str(tz)) => Some(tz),
                    Some(_) => return Err(self.error("DateTime64 time zone must be quoted")),
                };
                if args.next().is_some() {
                    return Err(self.error("DateTime64 takes at most two parameters"));
                }
                Ok(ColumnType::DateTime64 { precision, timezone })
            }
            _ => {
                if args.is_empty() {
                    if let Some(ty) = self.aliases.and_then(|a| a.get(&name.to_ascii_uppercase())) {
                        return Ok(ty.clone());
                    }
                }
                Err(self.error(format!("unsupported type name {}", name)))
            }
        }
    }

    fn decimal(&self, precision: u64, scale: u64) -> Result<ColumnType> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION as u64 {
            return Err(self.error(format!("Decimal precision {} out of range 1..={}", precision, MAX_DECIMAL_PRECISION)));
        }
        if scale > precision {
            return Err(self.error(format!("Decimal scale {} exceeds precision {}", scale, precision)));
        }
        Ok(ColumnType::Decimal { precision: precision as u8, scale: scale as u8 })
    }

    fn type_arg(&self, name: &str, arg: Arg) -> Result<ColumnType> {
        match arg {
            Arg::Type(ty) => Ok(ty),
            other => Err(self.error(format!("{} expects type parameters, found {:?}", name, other))),
        }
    }

    fn single_type(&self, name: &str, args: Vec<Arg>) -> Result<ColumnType> {
        let mut types = self.type_args(name, args, 1)?;
        types.pop().ok_or_else(|| self.error(format!("{} requires a type parameter", name)))
    }

    fn type_args(&self, name: &str, args: Vec<Arg>, count: usize) -> Result<Vec<ColumnType>> {
        if args.len() != count {
            return Err(self.error(format!("{} expects {} type parameters, got {}", name, count, args.len())));
        }
        args.into_iter().map(|arg| self.type_arg(name, arg)).collect()
    }

    fn int_args(&self, name: &str, args: Vec<Arg>, count: usize) -> Result<Vec<u64>> {
        if args.len() != count {
            return Err(self.error(format!("{} expects {} parameters, got {}", name, count, args.len())));
        }
        args.into_iter()
            .map(|arg| match arg {
                Arg::Int(n) => Ok(n),
                other => Err(self.error(format!("{} expects integer parameters, found {:?}", name, other))),
            })
            .collect()
    }
}
