//! Browser backend: an embedded in-memory SQLite engine whose whole image
//! lives in a key-value store under a fixed namespace
//!
//! The image is loaded eagerly when the backend is constructed. Every
//! mutating call runs in a transaction that commits only after the new
//! image has been stored, so a failed store write leaves nothing applied.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::backend::{self, ExecuteResult, Row, RunResult, StorageBackend};
use super::kv_store::KeyValueStore;
use crate::error::{FinanceError, Result};

/// Serialized relational image
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreImage {
    tables: Vec<TableImage>,
    /// Index DDL, replayed after every table is filled
    indexes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableImage {
    name: String,
    sql: String,
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
}

/// Browser-substitute storage engine
pub struct BrowserBackend {
    namespace: String,
    store: Box<dyn KeyValueStore>,
    conn: Option<Connection>,
}

impl BrowserBackend {
    /// Build the engine and load any image stored under `namespace`
    pub fn open(store: Box<dyn KeyValueStore>, namespace: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        if let Some(encoded) = store.get(namespace)? {
            let image: StoreImage = serde_json::from_str(&encoded)?;
            restore_image(&conn, &image)?;
            info!(namespace, tables = image.tables.len(), "restored browser image");
        } else {
            info!(namespace, "starting empty browser image");
        }
        backend::configure(&conn)?;

        Ok(Self {
            namespace: namespace.to_string(),
            store,
            conn: Some(conn),
        })
    }

    /// Get the storage namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn connection(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(FinanceError::NotConnected)
    }

    /// Apply `op` and store the resulting image before committing it
    fn write<T>(&mut self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.as_mut().ok_or(FinanceError::NotConnected)?;
        let tx = conn.transaction()?;
        let result = op(&tx)?;
        store_image(self.store.as_mut(), &self.namespace, &tx)?;
        tx.commit()?;
        Ok(result)
    }
}

fn store_image(store: &mut dyn KeyValueStore, namespace: &str, conn: &Connection) -> Result<()> {
    let image = capture_image(conn)?;
    let encoded = serde_json::to_string(&image)?;
    store.set(namespace, &encoded)?;
    debug!(namespace, bytes = encoded.len(), "flushed browser image");
    Ok(())
}

impl StorageBackend for BrowserBackend {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        backend::query_rows(self.connection()?, sql, params)
    }

    fn run(&mut self, sql: &str, params: &[Value]) -> Result<RunResult> {
        self.write(|conn| backend::run_statement(conn, sql, params))
    }

    fn execute(&mut self, statements: &[&str], params: &[Vec<Value>]) -> Result<ExecuteResult> {
        self.write(|conn| backend::apply_batch(conn, statements, params))
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.as_ref() else {
            return Ok(());
        };
        store_image(self.store.as_mut(), &self.namespace, conn)?;
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| FinanceError::from(err))?;
        }
        info!(namespace = %self.namespace, "closed browser database");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

fn capture_image(conn: &Connection) -> Result<StoreImage> {
    let mut image = StoreImage::default();

    let mut stmt = conn.prepare(
        "SELECT type, name, sql FROM sqlite_master
         WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'
         ORDER BY rowid",
    )?;
    let objects = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (kind, name, sql) in objects {
        match kind.as_str() {
            "table" => image.tables.push(capture_table(conn, name, sql)?),
            "index" => image.indexes.push(sql),
            _ => {}
        }
    }

    Ok(image)
}

fn capture_table(conn: &Connection, name: String, sql: String) -> Result<TableImage> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", name.replace('"', "\"\"")))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(to_json(row.get::<_, Value>(idx)?));
        }
        rows.push(values);
    }

    Ok(TableImage { name, sql, columns, rows })
}

fn restore_image(conn: &Connection, image: &StoreImage) -> Result<()> {
    for table in &image.tables {
        conn.execute(&table.sql, [])?;
        if table.rows.is_empty() {
            continue;
        }

        let column_list = table
            .columns
            .iter()
            .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let insert = format!(
            "INSERT INTO \"{}\" ({column_list}) VALUES ({placeholders})",
            table.name.replace('"', "\"\"")
        );

        let mut stmt = conn.prepare(&insert)?;
        for row in &table.rows {
            if row.len() != table.columns.len() {
                return Err(FinanceError::Storage(format!(
                    "stored image row width mismatch in {}",
                    table.name
                )));
            }
            stmt.execute(params_from_iter(row.iter().map(from_json)))?;
        }
    }

    for sql in &image.indexes {
        conn.execute(sql, [])?;
    }
    Ok(())
}

fn to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => i.into(),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s),
        Value::Blob(bytes) => bytes.into_iter().map(serde_json::Value::from).collect(),
    }
}

fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => Value::Blob(
            items.iter().filter_map(|b| b.as_u64()).map(|b| b as u8).collect(),
        ),
        serde_json::Value::Object(_) => Value::Null,
    }
}
