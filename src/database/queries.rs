//! SQL query operations for database access
//!
//! This module provides low-level statement helpers over a storage backend.
//! For business-level operations, use the FinanceData API.

use rusqlite::types::Value;

use super::backend::{Row, StorageBackend};
use super::models::{GoalUpdate, TransactionKind};
use super::rows::text_or_null;
use crate::error::Result;
use crate::utils::date_to_millis;

// ============================================================================
// Loader queries
// ============================================================================

/// Get all categories, seeded defaults first
pub fn get_categories(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, name, icon, color, is_default, created_at
         FROM categories ORDER BY is_default DESC, created_at ASC, rowid ASC",
        &[],
    )
}

/// Get all accounts, newest first
pub fn get_accounts(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, name, type, balance, color, created_at, updated_at
         FROM accounts ORDER BY created_at DESC, rowid DESC",
        &[],
    )
}

/// Get all expenses, most recent date first
pub fn get_expenses(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, amount, description, category_id, account_id, date, created_at
         FROM expenses ORDER BY date DESC, created_at DESC",
        &[],
    )
}

/// Get all income, most recent date first
pub fn get_income(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, amount, description, account_id, date, created_at
         FROM income ORDER BY date DESC, created_at DESC",
        &[],
    )
}

/// Get recurring payments that are not completed, soonest first
pub fn get_active_recurring(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, name, amount, frequency, category, account_id, date, is_completed
         FROM recurring_expenses
         WHERE COALESCE(is_completed, 0) = 0
         ORDER BY date ASC",
        &[],
    )
}

/// Get goals that are not completed, newest first
pub fn get_active_goals(backend: &mut dyn StorageBackend) -> Result<Vec<Row>> {
    backend.query(
        "SELECT id, name, target_amount, current_amount, deadline, color, is_completed, account_id, created_at
         FROM goals
         WHERE COALESCE(is_completed, 0) = 0
         ORDER BY created_at DESC, rowid DESC",
        &[],
    )
}

// ============================================================================
// Accounts
// ============================================================================

/// Check whether an account with this ID exists
pub fn account_exists(backend: &mut dyn StorageBackend, account_id: &str) -> Result<bool> {
    let rows = backend.query(
        "SELECT 1 AS found FROM accounts WHERE id = ?",
        &[Value::Text(account_id.to_string())],
    )?;
    Ok(!rows.is_empty())
}

/// Get the balance of an account, `None` if the account does not exist
pub fn get_account_balance(backend: &mut dyn StorageBackend, account_id: &str) -> Result<Option<f64>> {
    let rows = backend.query(
        "SELECT balance FROM accounts WHERE id = ?",
        &[Value::Text(account_id.to_string())],
    )?;
    Ok(rows.first().map(|row| match row.get("balance") {
        Some(Value::Real(f)) => *f,
        Some(Value::Integer(i)) => *i as f64,
        _ => 0.0,
    }))
}

/// Create a new account
pub fn create_account(
    backend: &mut dyn StorageBackend,
    id: &str,
    name: &str,
    account_type: &str,
    balance: f64,
    color: &str,
    now: i64,
) -> Result<()> {
    backend.run(
        "INSERT INTO accounts (id, name, type, balance, color, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        &[
            Value::Text(id.to_string()),
            Value::Text(name.to_string()),
            Value::Text(account_type.to_string()),
            Value::Real(balance),
            Value::Text(color.to_string()),
            Value::Integer(now),
            Value::Integer(now),
        ],
    )?;
    Ok(())
}

// ============================================================================
// Transactions
// ============================================================================

/// Fields of a transaction row
pub struct TransactionRecord<'a> {
    pub id: &'a str,
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: Option<&'a str>,
    pub category_id: Option<&'a str>,
    pub account_id: Option<&'a str>,
    pub date: i64,
}

/// Insert a transaction and, when routed to an account, write its new
/// balance in the same batch
pub fn create_transaction(
    backend: &mut dyn StorageBackend,
    record: &TransactionRecord<'_>,
    new_balance: Option<f64>,
    now: i64,
) -> Result<()> {
    let (insert, params) = match record.kind {
        TransactionKind::Expense => (
            "INSERT INTO expenses (id, amount, description, category_id, account_id, date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(record.id.to_string()),
                Value::Real(record.amount),
                Value::Text(record.description.unwrap_or_default().to_string()),
                text_or_null(record.category_id),
                text_or_null(record.account_id),
                Value::Integer(record.date),
                Value::Integer(now),
                Value::Integer(now),
            ],
        ),
        TransactionKind::Income => (
            "INSERT INTO income (id, amount, description, account_id, date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            vec![
                Value::Text(record.id.to_string()),
                Value::Real(record.amount),
                text_or_null(record.description),
                text_or_null(record.account_id),
                Value::Integer(record.date),
                Value::Integer(now),
                Value::Integer(now),
            ],
        ),
    };

    let mut statements = vec![insert];
    let mut batch_params = vec![params];

    if let (Some(account_id), Some(balance)) = (record.account_id, new_balance) {
        statements.push("UPDATE accounts SET balance = ?, updated_at = ? WHERE id = ?");
        batch_params.push(vec![
            Value::Real(balance),
            Value::Integer(now),
            Value::Text(account_id.to_string()),
        ]);
    }

    backend.execute(&statements, &batch_params)?;
    Ok(())
}

// ============================================================================
// Recurring payments
// ============================================================================

/// Fields of a recurring payment row
pub struct RecurringRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub amount: f64,
    pub frequency: &'a str,
    pub category: &'a str,
    pub account_id: Option<&'a str>,
    pub date: i64,
}

/// Create a new, active recurring payment
pub fn create_recurring(backend: &mut dyn StorageBackend, record: &RecurringRecord<'_>, now: i64) -> Result<()> {
    backend.run(
        "INSERT INTO recurring_expenses
             (id, name, amount, frequency, category, account_id, date, is_completed, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        &[
            Value::Text(record.id.to_string()),
            Value::Text(record.name.to_string()),
            Value::Real(record.amount),
            Value::Text(record.frequency.to_string()),
            Value::Text(record.category.to_string()),
            text_or_null(record.account_id),
            Value::Integer(record.date),
            Value::Integer(now),
            Value::Integer(now),
        ],
    )?;
    Ok(())
}

// ============================================================================
// Goals
// ============================================================================

/// Fields of a goal row
pub struct GoalRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub target: f64,
    pub current: f64,
    pub deadline: Option<i64>,
    pub color: &'a str,
    pub account_id: Option<&'a str>,
}

/// Create a new, active goal
pub fn create_goal(backend: &mut dyn StorageBackend, record: &GoalRecord<'_>, now: i64) -> Result<()> {
    backend.run(
        "INSERT INTO goals
             (id, name, target_amount, current_amount, deadline, color, is_completed, account_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?)",
        &[
            Value::Text(record.id.to_string()),
            Value::Text(record.name.to_string()),
            Value::Real(record.target),
            Value::Real(record.current),
            record.deadline.map_or(Value::Null, Value::Integer),
            Value::Text(record.color.to_string()),
            text_or_null(record.account_id),
            Value::Integer(now),
            Value::Integer(now),
        ],
    )?;
    Ok(())
}

/// Write the supplied goal fields; returns the number of rows changed
pub fn update_goal(backend: &mut dyn StorageBackend, goal_id: &str, update: &GoalUpdate, now: i64) -> Result<usize> {
    let mut assignments = vec!["updated_at = ?"];
    let mut params = vec![Value::Integer(now)];

    if let Some(name) = &update.name {
        assignments.push("name = ?");
        params.push(Value::Text(name.clone()));
    }
    if let Some(target) = update.target {
        assignments.push("target_amount = ?");
        params.push(Value::Real(target));
    }
    if let Some(current) = update.current {
        assignments.push("current_amount = ?");
        params.push(Value::Real(current));
    }
    if let Some(deadline) = update.deadline {
        assignments.push("deadline = ?");
        params.push(deadline.map_or(Value::Null, |d| Value::Integer(date_to_millis(d))));
    }
    if let Some(color) = &update.color {
        assignments.push("color = ?");
        params.push(Value::Text(color.clone()));
    }
    if let Some(completed) = update.is_completed {
        assignments.push("is_completed = ?");
        params.push(Value::Integer(i64::from(completed)));
    }

    params.push(Value::Text(goal_id.to_string()));
    let sql = format!("UPDATE goals SET {} WHERE id = ?", assignments.join(", "));
    Ok(backend.run(&sql, &params)?.rows_affected)
}

/// Add `delta` to a goal's current amount in one statement
///
/// The total never drops below zero. Returns the number of rows changed.
pub fn add_goal_contribution(backend: &mut dyn StorageBackend, goal_id: &str, delta: f64, now: i64) -> Result<usize> {
    let result = backend.run(
        "UPDATE goals
         SET current_amount = MAX(COALESCE(current_amount, 0) + ?, 0), updated_at = ?
         WHERE id = ?",
        &[Value::Real(delta), Value::Integer(now), Value::Text(goal_id.to_string())],
    )?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::migrations::{MigrationRegistry, MigrationRunner};
    use crate::database::native::SqliteBackend;

    fn setup() -> SqliteBackend {
        let mut backend = SqliteBackend::open_in_memory().unwrap();
        MigrationRunner::new(MigrationRegistry::declared().unwrap()).run(&mut backend).unwrap();
        backend
    }

    fn goal(backend: &mut SqliteBackend) {
        create_goal(backend, &GoalRecord {
            id: "g1",
            name: "Bike",
            target: 500.0,
            current: 20.0,
            deadline: Some(1_700_000_000_000),
            color: "#64748b",
            account_id: None,
        }, 1).unwrap();
    }

    #[test]
    fn test_account_balance_lookup() {
        let mut backend = setup();
        assert!(get_account_balance(&mut backend, "missing").unwrap().is_none());
        assert!(!account_exists(&mut backend, "a1").unwrap());

        create_account(&mut backend, "a1", "Main", "checking", 100.0, "#64748b", 1).unwrap();
        assert_eq!(get_account_balance(&mut backend, "a1").unwrap(), Some(100.0));
        assert!(account_exists(&mut backend, "a1").unwrap());
    }

    #[test]
    fn test_create_transaction_updates_balance() {
        let mut backend = setup();
        create_account(&mut backend, "a1", "Main", "checking", 100.0, "#64748b", 1).unwrap();

        let record = TransactionRecord {
            id: "t1",
            kind: TransactionKind::Expense,
            amount: 30.0,
            description: Some("Groceries"),
            category_id: None,
            account_id: Some("a1"),
            date: 1_700_000_000_000,
        };
        create_transaction(&mut backend, &record, Some(70.0), 2).unwrap();

        assert_eq!(get_account_balance(&mut backend, "a1").unwrap(), Some(70.0));
        assert_eq!(get_expenses(&mut backend).unwrap().len(), 1);
    }

    #[test]
    fn test_create_transaction_rolls_back_on_failure() {
        let mut backend = setup();
        create_account(&mut backend, "a1", "Main", "checking", 100.0, "#64748b", 1).unwrap();

        let record = TransactionRecord {
            id: "t1",
            kind: TransactionKind::Income,
            amount: 5.0,
            description: None,
            category_id: None,
            account_id: Some("a1"),
            date: 1,
        };
        create_transaction(&mut backend, &record, Some(105.0), 2).unwrap();

        // Same id again: the insert fails, so the balance write must not happen
        let err = create_transaction(&mut backend, &record, Some(110.0), 3).unwrap_err();
        assert!(matches!(err, crate::FinanceError::BatchFailed { step: 0, .. }));
        assert_eq!(get_account_balance(&mut backend, "a1").unwrap(), Some(105.0));
        assert_eq!(get_income(&mut backend).unwrap().len(), 1);
    }

    #[test]
    fn test_update_goal_partial() {
        let mut backend = setup();
        goal(&mut backend);

        let update = GoalUpdate { current: Some(123.45), ..Default::default() };
        assert_eq!(update_goal(&mut backend, "g1", &update, 2).unwrap(), 1);

        let rows = get_active_goals(&mut backend).unwrap();
        assert_eq!(rows[0]["current_amount"], Value::Real(123.45));
        assert_eq!(rows[0]["target_amount"], Value::Real(500.0));
        assert_eq!(rows[0]["name"], Value::Text("Bike".to_string()));
        assert_eq!(rows[0]["deadline"], Value::Integer(1_700_000_000_000));

        let clear = GoalUpdate { deadline: Some(None), ..Default::default() };
        update_goal(&mut backend, "g1", &clear, 3).unwrap();
        let rows = get_active_goals(&mut backend).unwrap();
        assert_eq!(rows[0]["deadline"], Value::Null);

        assert_eq!(update_goal(&mut backend, "missing", &update, 4).unwrap(), 0);
    }

    #[test]
    fn test_completed_rows_are_filtered() {
        let mut backend = setup();
        goal(&mut backend);
        update_goal(&mut backend, "g1", &GoalUpdate { is_completed: Some(true), ..Default::default() }, 2).unwrap();
        assert!(get_active_goals(&mut backend).unwrap().is_empty());

        create_recurring(&mut backend, &RecurringRecord {
            id: "r1",
            name: "Rent",
            amount: 900.0,
            frequency: "monthly",
            category: "Housing",
            account_id: None,
            date: 1,
        }, 1).unwrap();
        backend.run("UPDATE recurring_expenses SET is_completed = 1 WHERE id = 'r1'", &[]).unwrap();
        assert!(get_active_recurring(&mut backend).unwrap().is_empty());
    }

    #[test]
    fn test_add_goal_contribution() {
        let mut backend = setup();
        goal(&mut backend);

        assert_eq!(add_goal_contribution(&mut backend, "g1", 30.0, 2).unwrap(), 1);
        assert_eq!(add_goal_contribution(&mut backend, "g1", 50.0, 3).unwrap(), 1);
        let rows = get_active_goals(&mut backend).unwrap();
        assert_eq!(rows[0]["current_amount"], Value::Real(100.0));

        add_goal_contribution(&mut backend, "g1", -1000.0, 4).unwrap();
        let rows = get_active_goals(&mut backend).unwrap();
        assert_eq!(rows[0]["current_amount"], Value::Real(0.0));

        assert_eq!(add_goal_contribution(&mut backend, "missing", 1.0, 5).unwrap(), 0);
    }
}
