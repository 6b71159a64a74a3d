//! Versioned schema migrations
//!
//! Migrations live in a registry keyed by version. The registry must be a
//! gapless sequence starting at 1; anything else is refused at startup.
//! Each migration's statements and its ledger row are committed as one
//! batch, so the ledger only ever lists migrations that fully applied.

use std::collections::BTreeMap;

use rusqlite::types::Value;
use tracing::{info, instrument};

use super::backend::StorageBackend;
use super::schema;
use crate::error::{FinanceError, Result};
use crate::utils::now_millis;

/// One schema upgrade step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// Initial schema: the six entity tables
pub const MIGRATION_V1: Migration = Migration {
    version: 1,
    description: "initial schema",
    statements: schema::CREATE_ALL_TABLES,
};

/// Records which account a transaction was routed to
pub const MIGRATION_V2: Migration = Migration {
    version: 2,
    description: "transaction account routing",
    statements: &[
        "ALTER TABLE expenses ADD COLUMN account_id TEXT REFERENCES accounts(id)",
        "ALTER TABLE income ADD COLUMN account_id TEXT REFERENCES accounts(id)",
    ],
};

/// Indexes on the columns the loader filters and sorts by
pub const MIGRATION_V3: Migration = Migration {
    version: 3,
    description: "loader indexes",
    statements: schema::CREATE_INDEXES,
};

/// Every declared migration
pub const DECLARED_MIGRATIONS: &[Migration] = &[MIGRATION_V1, MIGRATION_V2, MIGRATION_V3];

/// Validated, version-sorted migration list
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, Migration>,
}

impl MigrationRegistry {
    /// Build a registry, refusing an empty list and duplicate, zero or
    /// non-contiguous versions
    pub fn new(declared: &[Migration]) -> Result<Self> {
        let mut migrations = BTreeMap::new();
        for migration in declared {
            if migration.version == 0 {
                return Err(FinanceError::InvalidMigrations(
                    "version 0 is reserved for an empty database".to_string(),
                ));
            }
            if migrations.insert(migration.version, *migration).is_some() {
                return Err(FinanceError::InvalidMigrations(format!(
                    "duplicate version {}",
                    migration.version
                )));
            }
        }

        for (expected, version) in (1u32..).zip(migrations.keys()) {
            if *version != expected {
                return Err(FinanceError::InvalidMigrations(format!(
                    "missing version {expected} (next declared is {version})"
                )));
            }
        }

        let registry = Self { migrations };
        if registry.is_empty() {
            return Err(FinanceError::InvalidMigrations("no migrations declared".to_string()));
        }
        Ok(registry)
    }

    /// Registry of the crate's declared migrations
    pub fn declared() -> Result<Self> {
        Self::new(DECLARED_MIGRATIONS)
    }

    /// Highest declared version (0 when empty)
    pub fn latest_version(&self) -> u32 {
        self.migrations.keys().next_back().copied().unwrap_or(0)
    }

    /// Migrations newer than `current`, ascending
    pub fn pending(&self, current: u32) -> impl Iterator<Item = &Migration> {
        self.migrations.range(current.saturating_add(1)..).map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// One ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationRecord {
    pub version: u32,
    pub applied_at: i64,
}

/// Applies pending migrations and records them in the ledger
#[derive(Debug)]
pub struct MigrationRunner {
    registry: MigrationRegistry,
    completed: bool,
}

impl MigrationRunner {
    pub fn new(registry: MigrationRegistry) -> Self {
        Self { registry, completed: false }
    }

    /// Get the registry this runner applies
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Bring the database up to the latest declared version
    ///
    /// Returns the versions applied by this call. After one successful run
    /// the runner does nothing until it is reset.
    #[instrument(skip_all, fields(backend = backend.name(), declared = self.registry.len()))]
    pub fn run(&mut self, backend: &mut dyn StorageBackend) -> Result<Vec<u32>> {
        if self.completed {
            return Ok(Vec::new());
        }

        backend.run(schema::CREATE_MIGRATIONS_TABLE, &[])?;
        let current = current_version(backend)?;

        let mut applied = Vec::new();
        for migration in self.registry.pending(current) {
            apply(backend, migration)?;
            info!(version = migration.version, description = migration.description, "applied migration");
            applied.push(migration.version);
        }

        if applied.is_empty() {
            info!(version = current, "schema up to date");
        }
        self.completed = true;
        Ok(applied)
    }

    /// Forget the in-memory completion flag (used when the database is reopened)
    pub fn reset(&mut self) {
        self.completed = false;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

fn apply(backend: &mut dyn StorageBackend, migration: &Migration) -> Result<()> {
    let mut statements: Vec<&str> = migration.statements.to_vec();
    statements.push("INSERT INTO migrations (version, applied_at) VALUES (?, ?)");

    let mut params: Vec<Vec<Value>> = vec![Vec::new(); migration.statements.len()];
    params.push(vec![Value::Integer(i64::from(migration.version)), Value::Integer(now_millis())]);

    backend
        .execute(&statements, &params)
        .map(|_| ())
        .map_err(|err| FinanceError::MigrationFailed {
            version: migration.version,
            reason: err.to_string(),
        })
}

/// Current schema version: the ledger's max version, 0 if empty or absent
pub fn current_version(backend: &mut dyn StorageBackend) -> Result<u32> {
    let exists = backend.query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'migrations'",
        &[],
    )?;
    if exists.is_empty() {
        return Ok(0);
    }

    let rows = backend.query("SELECT MAX(version) AS version FROM migrations", &[])?;
    match rows.first().and_then(|row| row.get("version")) {
        Some(Value::Integer(v)) => u32::try_from(*v)
            .map_err(|_| FinanceError::InvalidMigrations(format!("ledger version out of range: {v}"))),
        _ => Ok(0),
    }
}

/// All ledger rows, ascending by version
pub fn ledger(backend: &mut dyn StorageBackend) -> Result<Vec<MigrationRecord>> {
    let rows = backend.query(
        "SELECT version, applied_at FROM migrations ORDER BY version ASC",
        &[],
    )?;

    rows.iter()
        .map(|row| match (row.get("version"), row.get("applied_at")) {
            (Some(Value::Integer(version)), Some(Value::Integer(applied_at))) => Ok(MigrationRecord {
                version: u32::try_from(*version).map_err(|_| malformed_ledger("version"))?,
                applied_at: *applied_at,
            }),
            (Some(Value::Integer(_)), _) => Err(malformed_ledger("applied_at")),
            _ => Err(malformed_ledger("version")),
        })
        .collect()
}

fn malformed_ledger(column: &str) -> FinanceError {
    FinanceError::MalformedRow { table: "migrations".to_string(), column: column.to_string() }
}
