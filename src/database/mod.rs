//! Database layer for the finance tracker
//!
//! Handles storage operations including:
//! - Schema creation and versioned migrations
//! - Native and browser-persisted SQLite backends
//! - Service lifecycle (open, migrate, seed, close)
//! - Statement helpers for accounts, transactions, recurring payments and goals

pub mod backend;
pub mod browser;
pub mod kv_store;
pub mod migrations;
pub mod models;
pub mod native;
pub mod queries;
pub mod rows;
pub mod schema;
pub mod seed;
pub mod service;

pub use backend::{ExecuteResult, Row, RunResult, StorageBackend};
pub use browser::BrowserBackend;
pub use kv_store::{FileStore, KeyValueStore, MemoryStore};
pub use migrations::{Migration, MigrationRecord, MigrationRegistry, MigrationRunner};
pub use models::*;
pub use native::SqliteBackend;
pub use service::{BackendOpener, DatabaseHandle, DatabaseService, ServiceState};
