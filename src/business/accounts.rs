//! Account operations
//!
//! Balances are derived state: set once at creation, then moved only by
//! the transactions routed to the account.

use tracing::{info, warn};

use crate::database::rows::RowReader;
use crate::database::{queries, Account, AccountType, NewAccount, Row};
use crate::error::Result;
use crate::utils::validation::{require_finite_amount, require_text};
use crate::utils::{generate_id, now_millis};
use crate::DEFAULT_COLOR;
use super::finance::FinanceData;

impl FinanceData {
    /// Add a new account, returning its ID
    pub fn add_account(&self, account: NewAccount) -> Result<String> {
        require_text("name", &account.name)?;
        require_finite_amount("balance", account.balance)?;

        let id = generate_id();
        let name = account.name.trim();
        let color = account
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLOR);

        self.mutate(|backend| {
            queries::create_account(
                backend,
                &id,
                name,
                account.account_type.as_str(),
                account.balance,
                color,
                now_millis(),
            )
        })?;

        info!(account_id = %id, account_type = %account.account_type, "account added");
        Ok(id)
    }

    /// Get all accounts, newest first
    pub fn accounts(&self) -> Vec<Account> {
        self.snapshot().accounts.clone()
    }

    /// Get an account by ID
    pub fn account(&self, account_id: &str) -> Option<Account> {
        self.snapshot()
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
    }
}

pub(crate) fn account_from_row(row: &Row) -> Result<Account> {
    let reader = RowReader::new("accounts", row);
    let id = reader.text("id")?;

    let account_type = match reader.opt_text("type")? {
        None => AccountType::default(),
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(account_id = %id, value = %text, "unknown account type, using default");
            AccountType::default()
        }),
    };

    Ok(Account {
        name: reader.opt_text("name")?.unwrap_or_default(),
        account_type,
        balance: reader.opt_real("balance")?.unwrap_or(0.0),
        color: reader.opt_text("color")?.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        created_at: reader.opt_integer("created_at")?.unwrap_or(0),
        id,
    })
}
