//! SQL Module
//!
//! Parses statements with the [`sqlparser`] crate and renders the ones this
//! database understands back as canonical SQL text.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

pub use sqlparser::ast::Statement;

use crate::error::{DbError, Result};

/// Parse the SQL string into a list of statements
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    let dialect = PostgreSqlDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| DbError::Parse(e.to_string()))
}

/// Canonical text for a parsed statement
///
/// `CREATE TABLE` and queries (joins, aliases, `WHERE`) are reconstructed
/// from the statement tree; anything else is reported as not implemented.
pub fn unparse(statement: &Statement) -> String {
    match statement {
        Statement::CreateTable { .. } | Statement::Query(_) => statement.to_string(),
        other => format!("Not implemented: {}", other),
    }
}
