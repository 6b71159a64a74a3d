//! Native backend: a durable SQLite file on the device

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::info;

use super::backend::{self, ExecuteResult, Row, RunResult, StorageBackend};
use crate::error::{FinanceError, Result};

/// SQLite connection wrapper
pub struct SqliteBackend {
    /// Path to the database file (`None` for an in-memory database)
    path: Option<PathBuf>,
    /// SQLite connection
    conn: Option<Connection>,
}

impl SqliteBackend {
    /// Open (or create) a database file at the specified path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        backend::configure(&conn)?;
        info!(path = %path.display(), "opened native database");

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Some(conn),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        backend::configure(&conn)?;
        Ok(Self { path: None, conn: Some(conn) })
    }

    /// Get the database path
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(FinanceError::NotConnected)
    }
}

impl StorageBackend for SqliteBackend {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        backend::query_rows(self.connection()?, sql, params)
    }

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<RunResult> {
        backend::run_statement(self.connection()?, sql, params)
    }

    fn execute(&mut self, statements: &[&str], params: &[Vec<Value>]) -> Result<ExecuteResult> {
        backend::execute_batch(self.connection()?, statements, params)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| FinanceError::from(err))?;
            info!("closed native database");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

impl Drop for SqliteBackend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
