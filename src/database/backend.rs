//! Storage backend contract
//!
//! Both backends speak the same parametrized SQL dialect, so everything
//! above this trait is backend-agnostic. The helpers at the bottom hold the
//! statement semantics shared by every rusqlite-based backend.

use std::collections::HashMap;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::error::{FinanceError, Result};

/// One result row: column name to primitive value
pub type Row = HashMap<String, Value>;

/// Outcome of a single mutating statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Rows changed by the statement
    pub rows_affected: usize,
    /// Row id of the last insert, when the statement inserted a row
    pub inserted_id: Option<i64>,
}

/// Outcome of a statement batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteResult {
    /// Sum of rows changed by every statement in the batch
    pub total_rows_affected: usize,
}

/// Connection capability set implemented by every storage engine
///
/// `query` accepts read-only statements only; anything that would write
/// is rejected with `ReadOnlyViolation` before it runs.
pub trait StorageBackend: Send {
    /// Run a read-only statement and return its rows
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a single mutating statement
    fn run(&mut self, sql: &str, params: &[Value]) -> Result<RunResult>;

    /// Run statements as one unit: all of them apply, or none do
    ///
    /// `params` is matched by index; a missing entry means no parameters.
    fn execute(&mut self, statements: &[&str], params: &[Vec<Value>]) -> Result<ExecuteResult>;

    /// Release the connection; later calls fail with `NotConnected`
    fn close(&mut self) -> Result<()>;

    /// Check if the connection is open
    fn is_open(&self) -> bool;

    /// Short engine name for logs
    fn name(&self) -> &'static str;
}

/// Connection settings shared by both engines
pub(crate) fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    Ok(())
}

pub(crate) fn query_rows(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    // Transaction control reports as read-only but returns no columns
    if !stmt.readonly() || stmt.column_count() == 0 {
        return Err(FinanceError::ReadOnlyViolation(sql.trim().to_string()));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut mapped = Row::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            mapped.insert(column.clone(), row.get::<_, Value>(idx)?);
        }
        result.push(mapped);
    }

    debug!(rows = result.len(), "query");
    Ok(result)
}

pub(crate) fn run_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<RunResult> {
    let rows_affected = conn.execute(sql, params_from_iter(params.iter()))?;
    let inserted_id = is_insert(sql).then(|| conn.last_insert_rowid());
    Ok(RunResult { rows_affected, inserted_id })
}

pub(crate) fn execute_batch(
    conn: &mut Connection,
    statements: &[&str],
    params: &[Vec<Value>],
) -> Result<ExecuteResult> {
    let tx = conn.transaction()?;
    // Dropping `tx` on error rolls back every earlier step
    let result = apply_batch(&tx, statements, params)?;
    tx.commit()?;
    debug!(statements = statements.len(), total_rows_affected = result.total_rows_affected, "batch committed");
    Ok(result)
}

/// Run statements in order inside a transaction the caller owns
pub(crate) fn apply_batch(
    conn: &Connection,
    statements: &[&str],
    params: &[Vec<Value>],
) -> Result<ExecuteResult> {
    let mut total_rows_affected = 0;
    for (step, sql) in statements.iter().enumerate() {
        let step_params = params.get(step).map(Vec::as_slice).unwrap_or(&[]);
        match conn.execute(sql, params_from_iter(step_params.iter())) {
            Ok(changed) => total_rows_affected += changed,
            Err(err) => {
                return Err(FinanceError::BatchFailed { step, reason: err.to_string() });
            }
        }
    }
    Ok(ExecuteResult { total_rows_affected })
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}
