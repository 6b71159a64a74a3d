//! Transaction operations
//!
//! Expenses and income live in separate tables and are merged into one
//! list for display. A transaction routed to an account moves that
//! account's balance in the same storage batch as the insert.

use tracing::info;

use crate::database::queries::{self, TransactionRecord};
use crate::database::rows::RowReader;
use crate::database::{NewTransaction, Row, Transaction, TransactionKind};
use crate::error::{FinanceError, Result};
use crate::utils::validation::require_positive_amount;
use crate::utils::{date_to_millis, generate_id, millis_to_date, now_millis};
use crate::INCOME_CATEGORY_NAME;
use super::categories::CategoryNames;
use super::finance::FinanceData;

impl FinanceData {
    /// Record an income or expense, returning its ID
    ///
    /// When `account_id` is set the account must exist; its balance is
    /// rewritten atomically with the insert.
    pub fn add_transaction(&self, transaction: NewTransaction) -> Result<String> {
        require_positive_amount("amount", transaction.amount)?;

        let id = generate_id();
        let description = non_blank(transaction.description.as_deref());
        let account_id = non_blank(transaction.account_id.as_deref());
        let category_id = match transaction.kind {
            TransactionKind::Expense => non_blank(transaction.category_id.as_deref()),
            TransactionKind::Income => None,
        };

        let record = TransactionRecord {
            id: &id,
            kind: transaction.kind,
            amount: transaction.amount,
            description,
            category_id,
            account_id,
            date: date_to_millis(transaction.date),
        };

        self.mutate(|backend| {
            let new_balance = match account_id {
                Some(account_id) => {
                    let balance = queries::get_account_balance(backend, account_id)?
                        .ok_or_else(|| FinanceError::AccountNotFound(account_id.to_string()))?;
                    Some(balance + transaction.kind.balance_delta(transaction.amount))
                }
                None => None,
            };
            queries::create_transaction(backend, &record, new_balance, now_millis())
        })?;

        info!(
            transaction_id = %id,
            kind = transaction.kind.as_str(),
            account_id = account_id.unwrap_or("-"),
            "transaction added"
        );
        Ok(id)
    }

    /// Get all transactions, newest first
    pub fn transactions(&self) -> Vec<Transaction> {
        self.snapshot().transactions.clone()
    }

    /// Get the transactions routed to an account
    pub fn transactions_for_account(&self, account_id: &str) -> Vec<Transaction> {
        self.snapshot()
            .transactions
            .iter()
            .filter(|t| t.account_id.as_deref() == Some(account_id))
            .cloned()
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn transaction_date(reader: &RowReader<'_>, table: &str) -> Result<chrono::NaiveDate> {
    millis_to_date(reader.integer("date")?).ok_or_else(|| FinanceError::MalformedRow {
        table: table.to_string(),
        column: "date".to_string(),
    })
}

pub(crate) fn expense_from_row(row: &Row, names: &CategoryNames<'_>) -> Result<Transaction> {
    let reader = RowReader::new("expenses", row);
    let category_id = reader.opt_text("category_id")?;
    Ok(Transaction {
        id: reader.text("id")?,
        kind: TransactionKind::Expense,
        amount: reader.real("amount")?,
        description: reader.opt_text("description")?.unwrap_or_default(),
        category: names.resolve(category_id.as_deref()),
        category_id,
        account_id: reader.opt_text("account_id")?,
        date: transaction_date(&reader, "expenses")?,
        created_at: reader.opt_integer("created_at")?.unwrap_or(0),
    })
}

pub(crate) fn income_from_row(row: &Row) -> Result<Transaction> {
    let reader = RowReader::new("income", row);
    Ok(Transaction {
        id: reader.text("id")?,
        kind: TransactionKind::Income,
        amount: reader.real("amount")?,
        description: reader.opt_text("description")?.unwrap_or_default(),
        category: INCOME_CATEGORY_NAME.to_string(),
        category_id: None,
        account_id: reader.opt_text("account_id")?,
        date: transaction_date(&reader, "income")?,
        created_at: reader.opt_integer("created_at")?.unwrap_or(0),
    })
}
