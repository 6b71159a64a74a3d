//! Database schema definitions
//!
//! Every statement is idempotent (`IF NOT EXISTS`) so it can be replayed
//! against a database that already has the correct layout.

/// SQL to create the migration ledger
pub const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migrations (
    version         INTEGER NOT NULL PRIMARY KEY,
    applied_at      INTEGER NOT NULL
)
"#;

/// SQL to create the categories table
pub const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    icon            TEXT,
    color           TEXT,
    is_default      INTEGER DEFAULT 0,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
)
"#;

/// SQL to create the accounts table
pub const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    type            TEXT DEFAULT 'checking',
    balance         REAL DEFAULT 0,
    color           TEXT,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
)
"#;

/// SQL to create the expenses table
pub const CREATE_EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id              TEXT PRIMARY KEY,
    amount          REAL NOT NULL,
    description     TEXT NOT NULL,
    category_id     TEXT,
    date            INTEGER NOT NULL,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL,
    FOREIGN KEY (category_id) REFERENCES categories(id)
)
"#;

/// SQL to create the income table
pub const CREATE_INCOME_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS income (
    id              TEXT PRIMARY KEY,
    amount          REAL NOT NULL,
    date            INTEGER NOT NULL,
    description     TEXT,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL
)
"#;

/// SQL to create the recurring payments table
pub const CREATE_RECURRING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS recurring_expenses (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    amount          REAL NOT NULL,
    frequency       TEXT DEFAULT 'monthly',
    category        TEXT,
    account_id      TEXT,
    date            INTEGER NOT NULL,
    is_completed    INTEGER DEFAULT 0,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
)
"#;

/// SQL to create the savings goals table
pub const CREATE_GOALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS goals (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    target_amount   REAL NOT NULL,
    current_amount  REAL DEFAULT 0,
    deadline        INTEGER,
    color           TEXT,
    is_completed    INTEGER DEFAULT 0,
    account_id      TEXT,
    created_at      INTEGER NOT NULL,
    updated_at      INTEGER NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
)
"#;

/// All entity tables in dependency order (referenced tables first)
pub const CREATE_ALL_TABLES: &[&str] = &[
    CREATE_CATEGORIES_TABLE,
    CREATE_ACCOUNTS_TABLE,
    CREATE_EXPENSES_TABLE,
    CREATE_INCOME_TABLE,
    CREATE_RECURRING_TABLE,
    CREATE_GOALS_TABLE,
];

/// Entity table names, in the same order as `CREATE_ALL_TABLES`
pub const ENTITY_TABLES: &[&str] = &[
    "categories",
    "accounts",
    "expenses",
    "income",
    "recurring_expenses",
    "goals",
];

/// Indexes on the columns the loader filters and sorts by
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
    "CREATE INDEX IF NOT EXISTS idx_income_date ON income(date)",
    "CREATE INDEX IF NOT EXISTS idx_recurring_active ON recurring_expenses(is_completed, date)",
    "CREATE INDEX IF NOT EXISTS idx_goals_active ON goals(is_completed)",
];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_create_all_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        for _ in 0..2 {
            for sql in CREATE_ALL_TABLES {
                conn.execute(sql, []).unwrap();
            }
        }

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(count as usize, ENTITY_TABLES.len());
    }

    #[test]
    fn test_defaults_applied() {
        let conn = Connection::open_in_memory().unwrap();
        for sql in CREATE_ALL_TABLES {
            conn.execute(sql, []).unwrap();
        }
        conn.execute(
            "INSERT INTO accounts (id, name, created_at, updated_at) VALUES ('a', 'Main', 1, 1)",
            [],
        ).unwrap();

        let (kind, balance): (String, f64) = conn.query_row(
            "SELECT type, balance FROM accounts WHERE id = 'a'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ).unwrap();
        assert_eq!(kind, "checking");
        assert_eq!(balance, 0.0);
    }
}
