use std::iter::Peekable;
use std::str::Chars;

use super::parse_error;
use crate::error::DbError;

/// A lexer token
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(String),
    String(String),
    Ident(String),
    Keyword(Keyword),
    Period,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Minus,
    Asterisk,
    Question,
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Token::Number(n) => n,
            Token::String(s) => s,
            Token::Ident(s) => s,
            Token::Keyword(k) => k.to_str(),
            Token::Period => ".",
            Token::Equal => "=",
            Token::NotEqual => "<>",
            Token::LessThan => "<",
            Token::LessOrEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterOrEqual => ">=",
            Token::Minus => "-",
            Token::Asterisk => "*",
            Token::Question => "?",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
        })
    }
}

impl From<Keyword> for Token {
    fn from(keyword: Keyword) -> Self {
        Self::Keyword(keyword)
    }
}

/// Lexer keywords
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Keyword {
    And,
    Asc,
    Bigint,
    Bool,
    Boolean,
    By,
    Char,
    Create,
    Delete,
    Desc,
    Double,
    Drop,
    Exists,
    False,
    Float,
    From,
    If,
    Insert,
    Int,
    Integer,
    Into,
    Key,
    Not,
    Null,
    Order,
    Primary,
    Real,
    Select,
    Set,
    Smallint,
    String,
    Table,
    Text,
    True,
    Update,
    Values,
    Varchar,
    Where,
}

impl Keyword {
    fn from_str(ident: &str) -> Option<Self> {
        Some(match ident.to_uppercase().as_ref() {
            "AND" => Self::And,
            "ASC" => Self::Asc,
            "BIGINT" => Self::Bigint,
            "BOOL" => Self::Bool,
            "BOOLEAN" => Self::Boolean,
            "BY" => Self::By,
            "CHAR" => Self::Char,
            "CREATE" => Self::Create,
            "DELETE" => Self::Delete,
            "DESC" => Self::Desc,
            "DOUBLE" => Self::Double,
            "DROP" => Self::Drop,
            "EXISTS" => Self::Exists,
            "FALSE" => Self::False,
            "FLOAT" => Self::Float,
            "FROM" => Self::From,
            "IF" => Self::If,
            "INSERT" => Self::Insert,
            "INT" => Self::Int,
            "INTEGER" => Self::Integer,
            "INTO" => Self::Into,
            "KEY" => Self::Key,
            "NOT" => Self::Not,
            "NULL" => Self::Null,
            "ORDER" => Self::Order,
            "PRIMARY" => Self::Primary,
            "REAL" => Self::Real,
            "SELECT" => Self::Select,
            "SET" => Self::Set,
            "SMALLINT" => Self::Smallint,
            "STRING" => Self::String,
            "TABLE" => Self::Table,
            "TEXT" => Self::Text,
            "TRUE" => Self::True,
            "UPDATE" => Self::Update,
            "VALUES" => Self::Values,
            "VARCHAR" => Self::Varchar,
            "WHERE" => Self::Where,
            _ => return None,
        })
    }

    fn to_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Asc => "ASC",
            Self::Bigint => "BIGINT",
            Self::Bool => "BOOL",
            Self::Boolean => "BOOLEAN",
            Self::By => "BY",
            Self::Char => "CHAR",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Desc => "DESC",
            Self::Double => "DOUBLE",
            Self::Drop => "DROP",
            Self::Exists => "EXISTS",
            Self::False => "FALSE",
            Self::Float => "FLOAT",
            Self::From => "FROM",
            Self::If => "IF",
            Self::Insert => "INSERT",
            Self::Int => "INT",
            Self::Integer => "INTEGER",
            Self::Into => "INTO",
            Self::Key => "KEY",
            Self::Not => "NOT",
            Self::Null => "NULL",
            Self::Order => "ORDER",
            Self::Primary => "PRIMARY",
            Self::Real => "REAL",
            Self::Select => "SELECT",
            Self::Set => "SET",
            Self::Smallint => "SMALLINT",
            Self::String => "STRING",
            Self::Table => "TABLE",
            Self::Text => "TEXT",
            Self::True => "TRUE",
            Self::Update => "UPDATE",
            Self::Values => "VALUES",
            Self::Varchar => "VARCHAR",
            Self::Where => "WHERE",
        }
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// A lexer tokenizes an input string as an iterator
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, DbError>;

    fn next(&mut self) -> Option<Result<Token, DbError>> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self
                .iter
                .peek()
                .map(|c| Err(parse_error(format!("unexpected character {}", c)))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer {
            iter: input.chars().peekable(),
        }
    }

    /// Consumes whitespace and `--` line comments
    fn consume_whitespace(&mut self) {
        loop {
            self.next_while(|c| c.is_whitespace());
            let mut lookahead = self.iter.clone();
            if lookahead.next() == Some('-') && lookahead.next() == Some('-') {
                self.next_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    /// Grabs the next character if it matches the predicate function
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    /// Grabs the next characters that match the predicate, as a string
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c)
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Scans the input for the next token if any, ignoring leading whitespace
    fn scan(&mut self) -> Result<Option<Token>, DbError> {
        self.consume_whitespace();
        match self.iter.peek() {
            Some('\'') => self.scan_string(),
            Some('"') => self.scan_quoted_ident(),
            Some('!') => {
                self.iter.next();
                match self.next_if(|c| c == '=') {
                    Some(_) => Ok(Some(Token::NotEqual)),
                    None => Err(parse_error("unexpected character !")),
                }
            }
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => Ok(self.scan_symbol()),
            None => Ok(None),
        }
    }

    /// Scans the input for the next ident or keyword token, if any
    fn scan_ident(&mut self) -> Option<Token> {
        let name = self.next_while(|c| c.is_alphanumeric() || c == '_')?;
        Some(
            Keyword::from_str(&name)
                .map(Token::Keyword)
                .unwrap_or(Token::Ident(name)),
        )
    }

    /// Scans a double-quoted identifier, kept verbatim
    fn scan_quoted_ident(&mut self) -> Result<Option<Token>, DbError> {
        self.iter.next();
        let mut name = String::new();
        loop {
            match self.iter.next() {
                Some('"') if self.next_if(|c| c == '"').is_some() => name.push('"'),
                Some('"') => break,
                Some(c) => name.push(c),
                None => return Err(parse_error("unexpected end of quoted identifier")),
            }
        }
        Ok(Some(Token::Ident(name)))
    }

    /// Scans the input for the next number token, if any
    fn scan_number(&mut self) -> Option<Token> {
        let mut num = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(sep) = self.next_if(|c| c == '.') {
            num.push(sep);
            while let Some(dec) = self.next_if(|c| c.is_ascii_digit()) {
                num.push(dec)
            }
        }
        Some(Token::Number(num))
    }

    /// Scans the input for the next string literal, if any. Quotes are
    /// escaped by doubling them.
    fn scan_string(&mut self) -> Result<Option<Token>, DbError> {
        if self.next_if(|c| c == '\'').is_none() {
            return Ok(None);
        }
        let mut s = String::new();
        loop {
            match self.iter.next() {
                Some('\'') if self.next_if(|c| c == '\'').is_some() => s.push('\''),
                Some('\'') => break,
                Some(c) => s.push(c),
                None => return Err(parse_error("unexpected end of string literal")),
            }
        }
        Ok(Some(Token::String(s)))
    }

    /// Scans the input for the next symbol token, if any
    fn scan_symbol(&mut self) -> Option<Token> {
        let token = match self.iter.peek()? {
            '.' => Token::Period,
            '=' => Token::Equal,
            '<' => Token::LessThan,
            '>' => Token::GreaterThan,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '?' => Token::Question,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            _ => return None,
        };
        self.iter.next();
        Some(match token {
            Token::LessThan if self.next_if(|c| c == '=').is_some() => Token::LessOrEqual,
            Token::LessThan if self.next_if(|c| c == '>').is_some() => Token::NotEqual,
            Token::GreaterThan if self.next_if(|c| c == '=').is_some() => Token::GreaterOrEqual,
            token => token,
        })
    }
}
