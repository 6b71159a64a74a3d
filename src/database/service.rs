//! Database service: owns the backend lifecycle
//!
//! `initialize()` opens the configured backend, applies pending migrations
//! and seeds default categories exactly once, however many callers race
//! on it. Consumers reach the backend only through `connection()`, which
//! fails with `NotInitialized` until initialization has completed.

use std::sync::{Condvar, Mutex, MutexGuard};

use rusqlite::types::Value;
use tracing::{info, instrument, warn};

use super::backend::{ExecuteResult, Row, RunResult, StorageBackend};
use super::migrations::{self, MigrationRegistry, MigrationRunner};
use super::seed;
use crate::config::StorageConfig;
use crate::error::{FinanceError, Result};

/// Opens a fresh backend connection; called on every (re)initialization
pub type BackendOpener = Box<dyn Fn() -> Result<Box<dyn StorageBackend>> + Send + Sync>;

/// Service lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

struct Inner {
    backend: Option<Box<dyn StorageBackend>>,
    runner: MigrationRunner,
}

/// Shared owner of the single storage connection
pub struct DatabaseService {
    opener: BackendOpener,
    state: Mutex<ServiceState>,
    state_changed: Condvar,
    inner: Mutex<Inner>,
}

impl DatabaseService {
    /// Service over the configured backend and the declared migrations
    pub fn new(config: StorageConfig) -> Result<Self> {
        Self::with_opener(config.into_opener(), MigrationRegistry::declared()?)
    }

    /// Service over a custom backend opener and migration registry
    pub fn with_opener(opener: BackendOpener, registry: MigrationRegistry) -> Result<Self> {
        Ok(Self {
            opener,
            state: Mutex::new(ServiceState::Uninitialized),
            state_changed: Condvar::new(),
            inner: Mutex::new(Inner {
                backend: None,
                runner: MigrationRunner::new(registry),
            }),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> Result<ServiceState> {
        Ok(*self.lock_state()?)
    }

    /// Check if the service is ready for use
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), Ok(ServiceState::Ready))
    }

    /// Open, migrate and seed the database; a no-op once ready
    ///
    /// Concurrent callers wait for the first one to finish. A failed attempt
    /// leaves the service uninitialized so a later call can retry.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        loop {
            match *state {
                ServiceState::Ready => return Ok(()),
                ServiceState::Initializing => {
                    state = self.state_changed.wait(state).map_err(|_| poisoned())?;
                }
                ServiceState::Uninitialized | ServiceState::Closed => break,
            }
        }
        *state = ServiceState::Initializing;
        drop(state);

        let outcome = self.open_and_prepare();

        let mut state = self.lock_state()?;
        *state = match &outcome {
            Ok(()) => ServiceState::Ready,
            Err(err) => {
                warn!(error = %err, "database initialization failed");
                ServiceState::Uninitialized
            }
        };
        self.state_changed.notify_all();
        outcome
    }

    fn open_and_prepare(&self) -> Result<()> {
        let mut inner = self.lock_inner()?;
        let mut backend = (self.opener)()?;

        inner.runner.reset();
        inner.runner.run(backend.as_mut())?;
        seed::seed_default_categories(backend.as_mut())?;

        info!(backend = backend.name(), "database ready");
        inner.backend = Some(backend);
        Ok(())
    }

    /// Exclusive handle to the shared connection
    ///
    /// The handle holds the connection lock until dropped; every other
    /// caller waits. Do not call `close()` while holding one.
    pub fn connection(&self) -> Result<DatabaseHandle<'_>> {
        if *self.lock_state()? != ServiceState::Ready {
            return Err(FinanceError::NotInitialized);
        }
        let guard = self.lock_inner()?;
        if guard.backend.is_none() {
            return Err(FinanceError::NotInitialized);
        }
        Ok(DatabaseHandle { guard })
    }

    /// Current schema version from the migration ledger
    pub fn schema_version(&self) -> Result<u32> {
        let mut handle = self.connection()?;
        migrations::current_version(handle.backend()?)
    }

    /// Close the connection; a later `initialize()` reopens it
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        while *state == ServiceState::Initializing {
            state = self.state_changed.wait(state).map_err(|_| poisoned())?;
        }

        let mut inner = self.lock_inner()?;
        let closed = match inner.backend.take() {
            Some(mut backend) => backend.close(),
            None => Ok(()),
        };
        inner.runner.reset();

        if *state == ServiceState::Ready {
            info!("database closed");
        }
        *state = ServiceState::Closed;
        self.state_changed.notify_all();
        closed
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ServiceState>> {
        self.state.lock().map_err(|_| poisoned())
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> FinanceError {
    FinanceError::Storage("database lock poisoned".to_string())
}

/// Exclusive access to the shared backend
pub struct DatabaseHandle<'a> {
    guard: MutexGuard<'a, Inner>,
}

impl DatabaseHandle<'_> {
    /// The underlying backend
    pub fn backend(&mut self) -> Result<&mut dyn StorageBackend> {
        match self.guard.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(FinanceError::NotInitialized),
        }
    }

    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.backend()?.query(sql, params)
    }

    pub fn run(&mut self, sql: &str, params: &[Value]) -> Result<RunResult> {
        self.backend()?.run(sql, params)
    }

    pub fn execute(&mut self, statements: &[&str], params: &[Vec<Value>]) -> Result<ExecuteResult> {
        self.backend()?.execute(statements, params)
    }
}
