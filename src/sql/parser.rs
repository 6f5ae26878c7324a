//! SQL parser
//!
//! Recursive descent with one token of lookahead (current + peek). Errors
//! are accumulated instead of aborting the whole input; each production
//! returns early on its first mismatch to avoid cascading messages, and the
//! first error is what gets reported to the caller.

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::error::Error;

/// SQL parser
pub struct Parser {
    lexer: Lexer,
    current: Token,
    peek: Token,
    errors: Vec<String>,
}

impl Parser {
    /// Create a parser over the given input
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    /// Parse every statement in the input
    pub fn parse_program(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();

        while self.current.kind != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next_token();
        }

        statements
    }

    /// All accumulated error messages
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The first parse error, if any
    pub fn first_error(&self) -> Option<Error> {
        self.errors.first().map(|msg| Error::Parse(msg.clone()))
    }

    fn next_token(&mut self) {
        self.current = std::mem::replace(&mut self.peek, self.lexer.next_token());
    }

    fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.current.kind {
            TokenKind::Select => self.parse_select().map(Statement::Select),
            TokenKind::Insert => self.parse_insert().map(Statement::Insert),
            TokenKind::Update => self.parse_update().map(Statement::Update),
            TokenKind::Delete => self.parse_delete().map(Statement::Delete),
            TokenKind::Create => self.parse_create(),
            TokenKind::Use => self.parse_use().map(Statement::UseDatabase),
            TokenKind::Illegal => {
                let msg = format!(
                    "Illegal character '{}' at line {}, column {}",
                    self.current.value, self.current.line, self.current.col
                );
                self.add_error(msg);
                None
            }
            TokenKind::Semicolon | TokenKind::Eof => None,
            _ => {
                let msg = format!(
                    "Unexpected token '{}' at line {}, column {}. Expected a statement (e.g., SELECT)",
                    self.current.value, self.current.line, self.current.col
                );
                self.add_error(msg);
                None
            }
        }
    }

    // ========== SELECT ==========

    fn parse_select(&mut self) -> Option<SelectStatement> {
        self.next_token();

        let columns = match self.current.kind {
            TokenKind::Asterisk => {
                self.next_token();
                vec!["*".to_string()]
            }
            TokenKind::Identifier => self.parse_columns()?,
            _ => {
                let msg = format!(
                    "Expected column name or '*' after SELECT at line {}, column {}, but got '{}'",
                    self.current.line, self.current.col, self.current.value
                );
                self.add_error(msg);
                return None;
            }
        };

        if self.current.kind != TokenKind::From {
            let msg = format!(
                "Expected FROM keyword at line {}, column {}, but got '{}'",
                self.current.line, self.current.col, self.current.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();

        if self.current.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected table name after FROM at line {}, column {}, but got '{}'",
                self.current.line, self.current.col, self.current.value
            );
            self.add_error(msg);
            return None;
        }
        let table = self.current.value.clone();

        let join = if self.peek.kind == TokenKind::Join {
            self.next_token();
            self.parse_join_clause()?
        } else {
            None
        };

        let where_clause = if self.peek.kind == TokenKind::Where {
            self.next_token();
            self.next_token();
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        Some(SelectStatement {
            columns,
            table,
            join,
            where_clause,
        })
    }

    /// Parse a comma-separated column list; leaves `current` on the token
    /// following the list
    fn parse_columns(&mut self) -> Option<Vec<String>> {
        let mut columns = vec![self.current.value.clone()];

        while self.peek.kind == TokenKind::Comma {
            self.next_token();
            self.next_token();

            if self.current.kind != TokenKind::Identifier {
                let msg = format!(
                    "Expected column name after comma at line {}, column {}, but got '{}'",
                    self.current.line, self.current.col, self.current.value
                );
                self.add_error(msg);
                return None;
            }
            columns.push(self.current.value.clone());
        }

        self.next_token();
        Some(columns)
    }

    /// Parse `JOIN right ON l.key = r.key` with `current` on JOIN
    fn parse_join_clause(&mut self) -> Option<Option<JoinClause>> {
        if self.peek.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected table name after JOIN at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        if self.peek.kind != TokenKind::On {
            let msg = format!(
                "Expected ON after join table at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected join key after ON at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();
        let left_key = self.current.value.clone();

        if self.peek.kind != TokenKind::Eq {
            let msg = format!(
                "Expected = in ON clause at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected join key after = at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();
        let right_key = self.current.value.clone();

        Some(Some(JoinClause {
            table,
            left_key,
            right_key,
        }))
    }

    // ========== INSERT ==========

    fn parse_insert(&mut self) -> Option<InsertStatement> {
        if self.peek.kind != TokenKind::Into {
            self.add_error("Expected INTO after INSERT".to_string());
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected table name after INTO".to_string());
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        let columns = if self.peek.kind == TokenKind::LParen {
            self.next_token();
            self.next_token();
            Some(self.parse_comma_separated_list(TokenKind::RParen)?)
        } else {
            None
        };

        if self.peek.kind != TokenKind::Values {
            self.add_error("Expected VALUES keyword".to_string());
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::LParen {
            self.add_error("Expected ( after VALUES".to_string());
            return None;
        }
        self.next_token();
        self.next_token();
        let values = self.parse_comma_separated_list(TokenKind::RParen)?;

        Some(InsertStatement {
            table,
            columns,
            values,
        })
    }

    // ========== UPDATE ==========

    fn parse_update(&mut self) -> Option<UpdateStatement> {
        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected table name after UPDATE".to_string());
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        if self.peek.kind != TokenKind::Set {
            self.add_error("Expected SET keyword".to_string());
            return None;
        }
        self.next_token();

        let mut sets = Vec::new();
        loop {
            self.next_token();
            if self.current.kind != TokenKind::Identifier {
                self.add_error("Expected column name in SET".to_string());
                return None;
            }
            let column = self.current.value.clone();

            if self.peek.kind != TokenKind::Eq {
                self.add_error("Expected = in SET".to_string());
                return None;
            }
            self.next_token();
            self.next_token();

            if !matches!(
                self.current.kind,
                TokenKind::Identifier | TokenKind::Number | TokenKind::String
            ) {
                self.add_error("Expected value in SET".to_string());
                return None;
            }
            sets.push((column, self.current.value.clone()));

            if self.peek.kind == TokenKind::Comma {
                self.next_token();
            } else {
                break;
            }
        }

        let where_clause = if self.peek.kind == TokenKind::Where {
            self.next_token();
            self.next_token();
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        Some(UpdateStatement {
            table,
            sets,
            where_clause,
        })
    }

    // ========== DELETE ==========

    fn parse_delete(&mut self) -> Option<DeleteStatement> {
        if self.peek.kind != TokenKind::From {
            self.add_error("Expected FROM after DELETE".to_string());
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected table name after FROM".to_string());
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        let where_clause = if self.peek.kind == TokenKind::Where {
            self.next_token();
            self.next_token();
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        Some(DeleteStatement {
            table,
            where_clause,
        })
    }

    // ========== CREATE / USE ==========

    fn parse_create(&mut self) -> Option<Statement> {
        match self.peek.kind {
            TokenKind::Database => self
                .parse_create_database()
                .map(Statement::CreateDatabase),
            TokenKind::Table => self.parse_create_table().map(Statement::CreateTable),
            _ => {
                let msg = format!(
                    "Expected DATABASE or TABLE after CREATE at line {}, column {}, but got '{}'",
                    self.peek.line, self.peek.col, self.peek.value
                );
                self.add_error(msg);
                None
            }
        }
    }

    fn parse_create_database(&mut self) -> Option<CreateDatabaseStatement> {
        self.next_token();
        if self.peek.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected database name after CREATE DATABASE at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();
        Some(CreateDatabaseStatement {
            name: self.current.value.clone(),
        })
    }

    fn parse_use(&mut self) -> Option<UseDatabaseStatement> {
        if self.peek.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected database name after USE at line {}, column {}, but got '{}'",
                self.peek.line, self.peek.col, self.peek.value
            );
            self.add_error(msg);
            return None;
        }
        self.next_token();
        Some(UseDatabaseStatement {
            name: self.current.value.clone(),
        })
    }

    fn parse_create_table(&mut self) -> Option<CreateTableStatement> {
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected table name after CREATE TABLE".to_string());
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        if self.peek.kind != TokenKind::LParen {
            self.add_error("Expected ( after table name".to_string());
            return None;
        }
        self.next_token();

        let mut columns = Vec::new();
        loop {
            self.next_token();
            columns.push(self.parse_column_definition()?);

            if self.peek.kind == TokenKind::Comma {
                self.next_token();
            } else if self.peek.kind == TokenKind::RParen {
                self.next_token();
                break;
            } else {
                let msg = format!(
                    "Expected , or ) in table definition, got '{}'",
                    self.peek.value
                );
                self.add_error(msg);
                return None;
            }
        }

        Some(CreateTableStatement { table, columns })
    }

    fn parse_column_definition(&mut self) -> Option<ColumnDef> {
        if self.current.kind != TokenKind::Identifier {
            self.add_error("Expected column name".to_string());
            return None;
        }
        let name = self.current.value.clone();

        let column_type = match self.peek.kind {
            TokenKind::Int => ColumnType::Int,
            TokenKind::Text => ColumnType::Text,
            _ => {
                let msg = format!(
                    "Expected data type for column {}, got '{}'",
                    name, self.peek.value
                );
                self.add_error(msg);
                return None;
            }
        };
        self.next_token();

        let mut def = ColumnDef::new(name, column_type);

        // Optional (size), e.g. TEXT(255)
        if self.peek.kind == TokenKind::LParen {
            self.next_token();
            if self.peek.kind != TokenKind::Number {
                self.add_error("Expected number for size".to_string());
                return None;
            }
            self.next_token();
            match self.current.value.parse::<u32>() {
                Ok(size) => def.size = Some(size),
                Err(_) => {
                    let msg = format!("Invalid size '{}' for column {}", self.current.value, def.name);
                    self.add_error(msg);
                    return None;
                }
            }
            if self.peek.kind != TokenKind::RParen {
                self.add_error("Expected ) after size".to_string());
                return None;
            }
            self.next_token();
        }

        // Constraints in any order
        while matches!(
            self.peek.kind,
            TokenKind::Not | TokenKind::Unique | TokenKind::Primary | TokenKind::References
        ) {
            self.next_token();
            match self.current.kind {
                TokenKind::Not => {
                    if self.peek.kind != TokenKind::Null {
                        self.add_error("Expected NULL after NOT".to_string());
                        return None;
                    }
                    self.next_token();
                    def.nullable = false;
                }
                TokenKind::Unique => def.unique = true,
                TokenKind::Primary => {
                    if self.peek.kind != TokenKind::Key {
                        self.add_error("Expected KEY after PRIMARY".to_string());
                        return None;
                    }
                    self.next_token();
                    def.primary_key = true;
                    def.unique = true;
                    def.nullable = false;
                }
                TokenKind::References => {
                    def.references = self.parse_references()?;
                }
                _ => unreachable!(),
            }
        }

        Some(def)
    }

    /// Parse `REFERENCES parent(col)` with `current` on REFERENCES
    fn parse_references(&mut self) -> Option<Option<crate::storage::schema::ForeignKeyRef>> {
        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected table name after REFERENCES".to_string());
            return None;
        }
        self.next_token();
        let table = self.current.value.clone();

        if self.peek.kind != TokenKind::LParen {
            self.add_error("Expected ( after REFERENCES table".to_string());
            return None;
        }
        self.next_token();

        if self.peek.kind != TokenKind::Identifier {
            self.add_error("Expected column name in REFERENCES".to_string());
            return None;
        }
        self.next_token();
        let column = self.current.value.clone();

        if self.peek.kind != TokenKind::RParen {
            self.add_error("Expected ) after REFERENCES column".to_string());
            return None;
        }
        self.next_token();

        Some(Some(crate::storage::schema::ForeignKeyRef { table, column }))
    }

    // ========== WHERE ==========

    /// Parse `column op value` with `current` on the column
    fn parse_where_clause(&mut self) -> Option<WhereClause> {
        if self.current.kind != TokenKind::Identifier {
            let msg = format!(
                "Expected column name in WHERE clause, got '{}'",
                self.current.value
            );
            self.add_error(msg);
            return None;
        }
        let left = self.current.value.clone();

        self.next_token();
        let op = match self.current.kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Gte => CompareOp::Gte,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Lte => CompareOp::Lte,
            _ => {
                let msg = format!(
                    "Expected comparison operator in WHERE clause, got '{}'",
                    self.current.value
                );
                self.add_error(msg);
                return None;
            }
        };

        self.next_token();
        if !matches!(
            self.current.kind,
            TokenKind::Identifier | TokenKind::Number | TokenKind::String
        ) {
            let msg = format!(
                "Expected value in WHERE clause, got '{}'",
                self.current.value
            );
            self.add_error(msg);
            return None;
        }
        let right = self.current.value.clone();

        Some(WhereClause { left, op, right })
    }

    /// Parse a list of identifiers, numbers, and strings; leaves `current`
    /// on the end token
    fn parse_comma_separated_list(&mut self, end: TokenKind) -> Option<Vec<String>> {
        let mut list = Vec::new();

        loop {
            if !matches!(
                self.current.kind,
                TokenKind::Identifier | TokenKind::Number | TokenKind::String
            ) {
                let msg = format!(
                    "Expected identifier, number, or string, got '{}'",
                    self.current.value
                );
                self.add_error(msg);
                return None;
            }
            list.push(self.current.value.clone());

            if self.peek.kind == TokenKind::Comma {
                self.next_token();
                self.next_token();
            } else {
                break;
            }
        }

        if self.peek.kind != end {
            let msg = format!("Expected {}, got '{}'", end, self.peek.value);
            self.add_error(msg);
            return None;
        }
        self.next_token();

        Some(list)
    }
}
