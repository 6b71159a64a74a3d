//! Domain models exchanged with the presentation layer

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FinanceError;

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    Credit,
    Cash,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Credit => "credit",
            AccountType::Cash => "cash",
        }
    }
}

impl FromStr for AccountType {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "credit" => Ok(AccountType::Credit),
            "cash" => Ok(AccountType::Cash),
            other => Err(FinanceError::Validation(format!("unknown account type: {other}"))),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a recurring payment repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(FinanceError::Validation(format!("unknown frequency: {other}"))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Signed effect of `amount` on an account balance
    pub fn balance_delta(&self, amount: f64) -> f64 {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(FinanceError::Validation(format!(
                "transaction type must be income or expense, got {other:?}"
            ))),
        }
    }
}

/// Spending category (read-only to the UI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// True for the seeded defaults
    pub is_default: bool,
}

/// Account with its running balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub balance: f64,
    pub color: String,
    /// Creation time (epoch ms)
    pub created_at: i64,
}

/// Income or expense, merged into one list for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    /// Display category: the category name for expenses, `Income` for income
    pub category: String,
    pub category_id: Option<String>,
    /// Account the transaction was routed to, if any
    pub account_id: Option<String>,
    pub date: NaiveDate,
    /// Creation time (epoch ms)
    pub created_at: i64,
}

/// Active recurring payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub category: String,
    pub account_id: Option<String>,
    pub next_date: NaiveDate,
}

/// Active savings goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: String,
    pub name: String,
    pub target: f64,
    pub current: f64,
    pub deadline: Option<NaiveDate>,
    pub color: String,
    pub account_id: Option<String>,
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceSnapshot {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub recurring: Vec<RecurringPayment>,
    pub goals: Vec<SavingsGoal>,
    pub categories: Vec<Category>,
}

/// Input for `add_transaction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    /// Category id (expenses only)
    #[serde(default)]
    pub category_id: Option<String>,
    /// Account whose balance the transaction moves
    #[serde(default)]
    pub account_id: Option<String>,
    pub date: NaiveDate,
}

/// Input for `add_account`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    #[serde(default)]
    pub account_type: AccountType,
    /// Opening balance
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub color: Option<String>,
}

/// Input for `add_recurring`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecurringPayment {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    pub next_date: NaiveDate,
}

/// Input for `add_goal`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavingsGoal {
    pub name: String,
    pub target: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

/// Partial goal update: only `Some` fields are written
///
/// `deadline: Some(None)` clears the deadline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub target: Option<f64>,
    pub current: Option<f64>,
    pub deadline: Option<Option<NaiveDate>>,
    pub color: Option<String>,
    pub is_completed: Option<bool>,
}

impl GoalUpdate {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target.is_none()
            && self.current.is_none()
            && self.deadline.is_none()
            && self.color.is_none()
            && self.is_completed.is_none()
    }
}
