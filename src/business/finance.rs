//! Main finance data API
//!
//! `FinanceData` keeps an in-memory snapshot of everything the
//! presentation layer renders. Every successful mutation reloads the full
//! snapshot from storage and republishes it to subscribers.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::{debug, warn};

use crate::database::{queries, DatabaseService, FinanceSnapshot, StorageBackend, Transaction};
use crate::error::{FinanceError, Result};
use super::accounts::account_from_row;
use super::categories::{category_from_row, CategoryNames};
use super::goals::goal_from_row;
use super::recurring::recurring_from_row;
use super::transactions::{expense_from_row, income_from_row};

/// Finance data aggregator over a shared database service
pub struct FinanceData {
    /// Shared database service
    pub(crate) service: Arc<DatabaseService>,
    /// Last published snapshot
    snapshot: RwLock<Arc<FinanceSnapshot>>,
    /// Receivers of every republished snapshot
    subscribers: Mutex<Vec<Sender<Arc<FinanceSnapshot>>>>,
    /// Serializes mutations and reloads
    mutations: Mutex<()>,
}

impl FinanceData {
    /// Create an aggregator with an empty snapshot
    ///
    /// Call `refresh()` once the service is initialized to load stored data.
    pub fn new(service: Arc<DatabaseService>) -> Self {
        Self {
            service,
            snapshot: RwLock::new(Arc::new(FinanceSnapshot::default())),
            subscribers: Mutex::new(Vec::new()),
            mutations: Mutex::new(()),
        }
    }

    /// The database service behind this aggregator
    pub fn service(&self) -> &Arc<DatabaseService> {
        &self.service
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> Arc<FinanceSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Receive every snapshot published from now on
    pub fn subscribe(&self) -> Receiver<Arc<FinanceSnapshot>> {
        let (tx, rx) = mpsc::channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Reload everything from storage and republish
    pub fn refresh(&self) -> Result<Arc<FinanceSnapshot>> {
        let _guard = self.lock_mutations()?;
        self.load_all()
    }

    /// Run one write against storage, then reload
    ///
    /// A failed write returns its error without touching the snapshot.
    /// When the write is stored but the reload fails, the error is
    /// `ReloadFailed` and the previous snapshot stays published.
    pub(crate) fn mutate<T>(&self, op: impl FnOnce(&mut dyn StorageBackend) -> Result<T>) -> Result<T> {
        let _guard = self.lock_mutations()?;
        let value = {
            let mut handle = self.service.connection()?;
            op(handle.backend()?)?
        };
        if let Err(err) = self.load_all() {
            warn!(error = %err, "write stored but reload failed");
            return Err(FinanceError::ReloadFailed(err.to_string()));
        }
        Ok(value)
    }

    /// Query every entity, map rows and publish the new snapshot
    ///
    /// Callers hold the mutation lock.
    fn load_all(&self) -> Result<Arc<FinanceSnapshot>> {
        let snapshot = {
            let mut handle = self.service.connection()?;
            Arc::new(read_snapshot(handle.backend()?)?)
        };
        debug!(
            accounts = snapshot.accounts.len(),
            transactions = snapshot.transactions.len(),
            recurring = snapshot.recurring.len(),
            goals = snapshot.goals.len(),
            "reloaded finance data"
        );

        match self.snapshot.write() {
            Ok(mut current) => *current = Arc::clone(&snapshot),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&snapshot),
        }
        self.publish(&snapshot);
        Ok(snapshot)
    }

    fn publish(&self, snapshot: &Arc<FinanceSnapshot>) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }

    fn lock_mutations(&self) -> Result<MutexGuard<'_, ()>> {
        self.mutations
            .lock()
            .map_err(|_| FinanceError::Storage("mutation lock poisoned".to_string()))
    }
}

fn read_snapshot(backend: &mut dyn StorageBackend) -> Result<FinanceSnapshot> {
    let categories = queries::get_categories(backend)?
        .iter()
        .map(category_from_row)
        .collect::<Result<Vec<_>>>()?;
    let names = CategoryNames::new(&categories);

    let accounts = queries::get_accounts(backend)?
        .iter()
        .map(account_from_row)
        .collect::<Result<Vec<_>>>()?;

    let mut transactions = Vec::new();
    for row in queries::get_expenses(backend)? {
        transactions.push(expense_from_row(&row, &names)?);
    }
    for row in queries::get_income(backend)? {
        transactions.push(income_from_row(&row)?);
    }
    sort_transactions(&mut transactions);

    let recurring = queries::get_active_recurring(backend)?
        .iter()
        .map(recurring_from_row)
        .collect::<Result<Vec<_>>>()?;

    let goals = queries::get_active_goals(backend)?
        .iter()
        .map(goal_from_row)
        .collect::<Result<Vec<_>>>()?;

    Ok(FinanceSnapshot {
        accounts,
        transactions,
        recurring,
        goals,
        categories,
    })
}

/// Newest date first; same-day entries newest-created first
fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::database::{AccountType, NewAccount, NewTransaction, TransactionKind};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    pub fn create_test_finance() -> (FinanceData, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::Native { path: Some(temp_dir.path().join("finance.db")) };
        let service = Arc::new(DatabaseService::new(config).unwrap());
        service.initialize().unwrap();
        let finance = FinanceData::new(service);
        finance.refresh().unwrap();
        (finance, temp_dir)
    }

    pub fn main_account(finance: &FinanceData, balance: f64) -> String {
        finance.add_account(NewAccount {
            name: "Main".to_string(),
            account_type: AccountType::Checking,
            balance,
            color: None,
        }).unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fresh_snapshot_has_default_categories() {
        let (finance, _temp) = create_test_finance();
        let snapshot = finance.snapshot();
        assert_eq!(snapshot.categories.len(), crate::database::seed::DEFAULT_CATEGORIES.len());
        assert!(snapshot.accounts.is_empty());
        assert!(snapshot.transactions.is_empty());
    }

    #[test]
    fn test_refresh_before_initialize() {
        let service = Arc::new(DatabaseService::new(StorageConfig::default()).unwrap());
        let finance = FinanceData::new(service);
        assert!(matches!(finance.refresh(), Err(FinanceError::NotInitialized)));
        assert!(finance.snapshot().accounts.is_empty());
    }

    #[test]
    fn test_subscribers_receive_each_reload() {
        let (finance, _temp) = create_test_finance();
        let rx = finance.subscribe();

        main_account(&finance, 10.0);
        let published = rx.try_recv().unwrap();
        assert_eq!(published.accounts.len(), 1);

        finance.refresh().unwrap();
        assert_eq!(rx.try_recv().unwrap().accounts.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let (finance, _temp) = create_test_finance();
        drop(finance.subscribe());
        finance.refresh().unwrap();
        assert!(finance.subscribers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_mutation_keeps_snapshot() {
        let (finance, _temp) = create_test_finance();
        let rx = finance.subscribe();
        let before = finance.snapshot();

        let err = finance.mutate(|backend| {
            backend.run("INSERT INTO nowhere VALUES (1)", &[])
        }).unwrap_err();
        assert!(matches!(err, FinanceError::Storage(_)));
        assert!(Arc::ptr_eq(&before, &finance.snapshot()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stored_write_with_failed_reload() {
        let (finance, _temp) = create_test_finance();
        let before = finance.snapshot();

        let err = finance.mutate(|backend| {
            backend.run(
                "INSERT INTO accounts (id, name, balance, created_at, updated_at)
                 VALUES ('x', 'X', 'lots', 1, 1)",
                &[],
            )
        }).unwrap_err();
        assert!(matches!(err, FinanceError::ReloadFailed(_)));
        assert!(Arc::ptr_eq(&before, &finance.snapshot()));

        let mut handle = finance.service.connection().unwrap();
        let rows = handle.backend().unwrap().query("SELECT id FROM accounts", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_transactions_sorted_newest_first() {
        let (finance, _temp) = create_test_finance();
        for (kind, day) in [
            (TransactionKind::Expense, 3),
            (TransactionKind::Income, 10),
            (TransactionKind::Expense, 7),
        ] {
            finance.add_transaction(NewTransaction {
                kind,
                amount: 1.0,
                description: None,
                category_id: None,
                account_id: None,
                date: date(2024, 5, day),
            }).unwrap();
        }

        let days: Vec<_> = finance.snapshot().transactions.iter().map(|t| t.date).collect();
        assert_eq!(days, vec![date(2024, 5, 10), date(2024, 5, 7), date(2024, 5, 3)]);
    }
}
