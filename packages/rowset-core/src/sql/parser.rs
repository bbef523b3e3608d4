use std::iter::Peekable;

use super::ast::{self, ColumnRef, Comparison, Direction, Expression, Operator};
use super::lexer::{Keyword, Lexer, Token};
use super::parse_error;
use crate::error::DbError;
use crate::store::ColumnDef;
use crate::value::{DataType, Value};

/// Parses statement text into an [`ast::Statement`].
///
/// The parser only checks syntax. Whether tables and columns exist is
/// decided by the executor against the store's schemas.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
    /// Placeholders seen so far, used to number `?` in source order
    parameters: usize,
}

impl<'a> Parser<'a> {
    /// Parses a single statement with an optional trailing semicolon.
    pub fn parse(statement: &str) -> Result<ast::Statement, DbError> {
        let mut parser = Parser::new(statement);
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.lexer.next().transpose()? {
            return Err(parse_error(format!("unexpected token {}", token)));
        }
        Ok(statement)
    }

    fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input).peekable(),
            parameters: 0,
        }
    }

    /// Fetches the next token, or errors at end of input.
    fn next(&mut self) -> Result<Token, DbError> {
        self.lexer
            .next()
            .transpose()?
            .ok_or_else(|| parse_error("unexpected end of input"))
    }

    fn next_ident(&mut self) -> Result<String, DbError> {
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            token => Err(parse_error(format!("expected identifier, got {}", token))),
        }
    }

    /// Consumes the next token if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|t| predicate(t))?;
        self.next().ok()
    }

    fn next_is(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    fn expect(&mut self, expect: Token) -> Result<(), DbError> {
        let token = self.next()?;
        if token != expect {
            return Err(parse_error(format!(
                "expected token {}, found {}",
                expect, token
            )));
        }
        Ok(())
    }

    fn skip(&mut self, token: Token) {
        self.next_is(token);
    }

    fn peek(&mut self) -> Result<Option<&Token>, DbError> {
        self.lexer
            .peek()
            .map(|r| r.as_ref().map_err(|err| err.clone()))
            .transpose()
    }

    fn parse_statement(&mut self) -> Result<ast::Statement, DbError> {
        let Some(token) = self.peek()? else {
            return Err(parse_error("unexpected end of input"));
        };
        match token {
            Token::Keyword(Keyword::Create) => self.parse_create_table(),
            Token::Keyword(Keyword::Drop) => self.parse_drop_table(),
            Token::Keyword(Keyword::Delete) => self.parse_delete(),
            Token::Keyword(Keyword::Insert) => self.parse_insert(),
            Token::Keyword(Keyword::Select) => self.parse_select(),
            Token::Keyword(Keyword::Update) => self.parse_update(),
            token => Err(parse_error(format!("unexpected token {}", token))),
        }
    }

    fn parse_create_table(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Create.into())?;
        self.expect(Keyword::Table.into())?;
        let name = self.next_ident()?;
        self.expect(Token::OpenParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_create_table_column()?);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(ast::Statement::CreateTable { name, columns })
    }

    fn parse_create_table_column(&mut self) -> Result<ColumnDef, DbError> {
        let name = self.next_ident()?;
        let data_type = match self.next()? {
            Token::Keyword(Keyword::Int | Keyword::Integer | Keyword::Bigint | Keyword::Smallint) => {
                DataType::Integer
            }
            Token::Keyword(Keyword::Float | Keyword::Double | Keyword::Real) => DataType::Float,
            Token::Keyword(Keyword::Varchar | Keyword::Char) => {
                // Declared lengths are accepted but not enforced
                if self.next_is(Token::OpenParen) {
                    match self.next()? {
                        Token::Number(_) => {}
                        token => {
                            return Err(parse_error(format!("expected length, got {}", token)))
                        }
                    }
                    self.expect(Token::CloseParen)?;
                }
                DataType::Text
            }
            Token::Keyword(Keyword::Text | Keyword::String) => DataType::Text,
            Token::Keyword(Keyword::Boolean | Keyword::Bool) => DataType::Boolean,
            token => return Err(parse_error(format!("unexpected token {}", token))),
        };

        let mut column = ColumnDef::new(name, data_type);
        while let Some(Token::Keyword(keyword)) = self.next_if(|t| matches!(t, Token::Keyword(_))) {
            match keyword {
                Keyword::Primary => {
                    self.expect(Keyword::Key.into())?;
                    column = column.primary_key();
                }
                Keyword::Not => {
                    self.expect(Keyword::Null.into())?;
                    column = column.not_null();
                }
                Keyword::Null if !column.primary_key => column.nullable = true,
                Keyword::Null => {
                    return Err(parse_error(format!(
                        "primary key {} cannot be nullable",
                        column.name
                    )))
                }
                keyword => return Err(parse_error(format!("unexpected keyword {}", keyword))),
            }
        }
        Ok(column)
    }

    fn parse_drop_table(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Drop.into())?;
        self.expect(Keyword::Table.into())?;
        let mut if_exists = false;
        if self.next_is(Keyword::If.into()) {
            self.expect(Keyword::Exists.into())?;
            if_exists = true;
        }
        let name = self.next_ident()?;
        Ok(ast::Statement::DropTable { name, if_exists })
    }

    fn parse_delete(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Delete.into())?;
        self.expect(Keyword::From.into())?;
        let table = self.next_ident()?;
        let filter = self.parse_where_clause()?;
        Ok(ast::Statement::Delete { table, filter })
    }

    fn parse_insert(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Insert.into())?;
        self.expect(Keyword::Into.into())?;
        let table = self.next_ident()?;

        let mut columns = None;
        if self.next_is(Token::OpenParen) {
            let columns = columns.insert(Vec::new());
            loop {
                columns.push(self.next_ident()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
        }

        self.expect(Keyword::Values.into())?;
        let mut values = Vec::new();
        loop {
            self.expect(Token::OpenParen)?;
            let mut row = Vec::new();
            loop {
                row.push(self.parse_expression()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::CloseParen)?;
            values.push(row);
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(ast::Statement::Insert {
            table,
            columns,
            values,
        })
    }

    fn parse_update(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Update.into())?;
        let table = self.next_ident()?;
        self.expect(Keyword::Set.into())?;

        let mut set = Vec::new();
        loop {
            let column = self.parse_column_ref()?;
            self.expect(Token::Equal)?;
            let expr = self.parse_expression()?;
            if set.iter().any(|(c, _): &(ColumnRef, Expression)| c.name.eq_ignore_ascii_case(&column.name)) {
                return Err(parse_error(format!("column {} set multiple times", column)));
            }
            set.push((column, expr));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        let filter = self.parse_where_clause()?;
        Ok(ast::Statement::Update { table, set, filter })
    }

    fn parse_select(&mut self) -> Result<ast::Statement, DbError> {
        self.expect(Keyword::Select.into())?;
        let columns = if self.next_is(Token::Asterisk) {
            None
        } else {
            let mut columns = Vec::new();
            loop {
                columns.push(self.parse_column_ref()?);
                if !self.next_is(Token::Comma) {
                    break;
                }
            }
            Some(columns)
        };
        self.expect(Keyword::From.into())?;
        let table = self.next_ident()?;
        let filter = self.parse_where_clause()?;
        let order_by = self.parse_order_by_clause()?;
        Ok(ast::Statement::Select {
            table,
            columns,
            filter,
            order_by,
        })
    }

    fn parse_where_clause(&mut self) -> Result<Vec<Comparison>, DbError> {
        let mut filter = Vec::new();
        if !self.next_is(Keyword::Where.into()) {
            return Ok(filter);
        }
        loop {
            filter.push(self.parse_comparison()?);
            if !self.next_is(Keyword::And.into()) {
                break;
            }
        }
        Ok(filter)
    }

    fn parse_order_by_clause(&mut self) -> Result<Vec<(ColumnRef, Direction)>, DbError> {
        let mut order_by = Vec::new();
        if !self.next_is(Keyword::Order.into()) {
            return Ok(order_by);
        }
        self.expect(Keyword::By.into())?;
        loop {
            let column = self.parse_column_ref()?;
            let direction = if self.next_is(Keyword::Desc.into()) {
                Direction::Descending
            } else {
                self.skip(Keyword::Asc.into());
                Direction::Ascending
            };
            order_by.push((column, direction));
            if !self.next_is(Token::Comma) {
                break;
            }
        }
        Ok(order_by)
    }

    fn parse_comparison(&mut self) -> Result<Comparison, DbError> {
        let column = self.parse_column_ref()?;
        let operator = match self.next()? {
            Token::Equal => Operator::Equal,
            Token::NotEqual => Operator::NotEqual,
            Token::LessThan => Operator::LessThan,
            Token::LessOrEqual => Operator::LessOrEqual,
            Token::GreaterThan => Operator::GreaterThan,
            Token::GreaterOrEqual => Operator::GreaterOrEqual,
            token => return Err(parse_error(format!("expected comparison, got {}", token))),
        };
        let value = self.parse_expression()?;
        Ok(Comparison {
            column,
            operator,
            value,
        })
    }

    /// Parses `name` or `table.name`.
    fn parse_column_ref(&mut self) -> Result<ColumnRef, DbError> {
        let name = self.next_ident()?;
        if self.next_is(Token::Period) {
            return Ok(ColumnRef {
                table: Some(name),
                name: self.next_ident()?,
            });
        }
        Ok(ColumnRef::new(name))
    }

    fn parse_expression(&mut self) -> Result<Expression, DbError> {
        let literal = match self.next()? {
            Token::Question => {
                let index = self.parameters;
                self.parameters += 1;
                return Ok(Expression::Parameter(index));
            }
            Token::Minus => match self.next()? {
                Token::Number(n) => Self::parse_number(&format!("-{}", n))?,
                token => return Err(parse_error(format!("expected number, got {}", token))),
            },
            Token::Number(n) => Self::parse_number(&n)?,
            Token::String(s) => Value::Text(s),
            Token::Keyword(Keyword::True) => Value::Boolean(true),
            Token::Keyword(Keyword::False) => Value::Boolean(false),
            Token::Keyword(Keyword::Null) => Value::Null,
            token => return Err(parse_error(format!("expected value, got {}", token))),
        };
        Ok(Expression::Literal(literal))
    }

    fn parse_number(text: &str) -> Result<Value, DbError> {
        if text.contains('.') {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| parse_error(format!("invalid number {}: {}", text, e)))
        } else {
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| parse_error(format!("invalid integer {}: {}", text, e)))
        }
    }
}
