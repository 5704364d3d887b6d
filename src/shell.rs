//! Shell
//!
//! Handles one line of the `heapdb` prompt at a time.
//!
//! ## Commands
//! - `quit`: leave the prompt
//! - `test`: run the heap storage self-test against scratch tables
//! - anything else: parsed as SQL and echoed back as canonical SQL

use crate::error::{DbError, Result};
use crate::sql;
use crate::storage::StoreEnv;
use crate::table::{ColumnAttribute, DataType, DbRelation, HeapTable, Row, Value};

/// Leaves the prompt
pub const QUIT: &str = "quit";

/// Runs the heap storage self-test
pub const SELF_TEST: &str = "test";

/// What the prompt should do after a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this reply
    Reply(String),

    /// Blank line, print nothing
    Nothing,

    /// Stop reading lines
    Quit,
}

/// Line interpreter bound to one store environment
pub struct Shell {
    env: StoreEnv,
}

impl Shell {
    pub fn new(env: StoreEnv) -> Self {
        Self { env }
    }

    /// Execute one input line
    pub fn execute(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        match line {
            "" => Outcome::Nothing,
            QUIT => Outcome::Quit,
            SELF_TEST => match self_test(&self.env) {
                Ok(()) => Outcome::Reply("test_heap_storage: ok".to_string()),
                Err(e) => Outcome::Reply(format!("test_heap_storage: failed: {}", e)),
            },
            _ => match sql::parse(line) {
                Ok(statements) => Outcome::Reply(
                    statements
                        .iter()
                        .map(sql::unparse)
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                Err(e) => {
                    tracing::debug!("Rejected input {:?}: {}", line, e);
                    Outcome::Reply(format!("Invalid SQL: {}", line))
                }
            },
        }
    }
}

/// Exercise create/drop, insert, select and project on scratch tables
///
/// Leaves no tables behind on success.
pub fn self_test(env: &StoreEnv) -> Result<()> {
    let column_names = vec!["a".to_string(), "b".to_string()];
    let column_attributes = vec![
        ColumnAttribute::new(DataType::Int),
        ColumnAttribute::new(DataType::Text),
    ];

    let mut table = HeapTable::new(
        env,
        "_test_create_drop",
        column_names.clone(),
        column_attributes.clone(),
    )?;
    drop_if_exists(&mut table)?;
    table.create()?;
    table.drop()?;

    let mut table = HeapTable::new(env, "_test_data", column_names, column_attributes)?;
    drop_if_exists(&mut table)?;
    table.create_if_not_exists()?;

    let mut row = Row::new();
    row.insert("a".to_string(), Value::Int(12));
    row.insert("b".to_string(), Value::Text("Hello!".to_string()));
    table.insert(&row)?;

    let handles = table.select()?;
    check(handles.len() == 1, "select should return exactly one handle")?;
    let result = table.project(handles[0])?;
    check(result == row, "projected row differs from inserted row")?;

    // Spill into a second block
    let mut filler = row.clone();
    filler.insert("b".to_string(), Value::Text("x".repeat(500)));
    while table.file().last_block_id() < 2 {
        table.insert(&filler)?;
    }
    let handles = table.select()?;
    check(
        handles.iter().any(|h| h.block_id == 2),
        "rows should span two blocks",
    )?;

    table.drop()?;
    Ok(())
}

/// Clear leftovers of an interrupted run
fn drop_if_exists(table: &mut HeapTable) -> Result<()> {
    match table.drop() {
        Err(DbError::RelationNotFound(_)) => Ok(()),
        other => other,
    }
}

fn check(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(DbError::Storage(format!("self test: {}", message)))
    }
}
