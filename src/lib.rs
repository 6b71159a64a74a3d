//! # FinTrack Core
//!
//! Storage and data core of a personal finance tracker.
//!
//! ## Features
//!
//! - SQLite storage with versioned, ledger-tracked migrations
//! - Native file backend and a browser-style backend persisted to a key-value store
//! - Accounts whose balances follow the transactions routed to them
//! - Recurring payments and savings goals
//! - Snapshot publishing to subscribers after every change
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fintrack_core::{AppConfig, DatabaseService, FinanceData, NewAccount, AccountType};
//!
//! let config = AppConfig::load(std::path::Path::new("fintrack.toml")).unwrap();
//! let service = Arc::new(DatabaseService::new(config.storage).unwrap());
//! service.initialize().unwrap();
//!
//! let finance = FinanceData::new(service);
//! finance.refresh().unwrap();
//! finance.add_account(NewAccount {
//!     name: "Main".to_string(),
//!     account_type: AccountType::Checking,
//!     balance: 100.0,
//!     color: None,
//! }).unwrap();
//!
//! for account in &finance.snapshot().accounts {
//!     println!("{}: {}", account.name, account.balance);
//! }
//! ```

pub mod config;
pub mod database;
pub mod business;
pub mod utils;
pub mod error;

// Re-export main types
pub use error::{FinanceError, Result};
pub use config::{AppConfig, StorageConfig};
pub use database::models::{
    Account, AccountType, Category, FinanceSnapshot, Frequency, GoalUpdate, NewAccount,
    NewRecurringPayment, NewSavingsGoal, NewTransaction, RecurringPayment, SavingsGoal,
    Transaction, TransactionKind,
};
pub use database::{DatabaseService, ServiceState, StorageBackend};
pub use business::FinanceData;

/// Key-value namespace holding the browser database image
pub const STORAGE_NAMESPACE: &str = "fin_tracker_db";

/// Length of the random part of generated ids
pub const ID_RANDOM_LENGTH: usize = 9;

/// Neutral color for goals and accounts created without one
pub const DEFAULT_COLOR: &str = "#64748b";

/// Category shown for expenses without a resolvable category
pub const DEFAULT_CATEGORY_NAME: &str = "Other";

/// Category shown for income
pub const INCOME_CATEGORY_NAME: &str = "Income";
