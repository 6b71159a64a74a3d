//! Typed column access over untyped result rows
//!
//! Required columns fail with `MalformedRow`; optional columns treat NULL
//! and absence alike.

use rusqlite::types::Value;

use super::backend::Row;
use crate::error::{FinanceError, Result};

/// Column accessors bound to a table name for error reporting
pub struct RowReader<'a> {
    table: &'a str,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub fn new(table: &'a str, row: &'a Row) -> Self {
        Self { table, row }
    }

    fn malformed(&self, column: &str) -> FinanceError {
        FinanceError::MalformedRow {
            table: self.table.to_string(),
            column: column.to_string(),
        }
    }

    fn value(&self, column: &str) -> Option<&'a Value> {
        match self.row.get(column) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    /// Required text column
    pub fn text(&self, column: &str) -> Result<String> {
        self.opt_text(column)?.ok_or_else(|| self.malformed(column))
    }

    /// Optional text column; blank text counts as absent
    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.value(column) {
            None => Ok(None),
            Some(Value::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.malformed(column)),
        }
    }

    /// Required numeric column
    pub fn real(&self, column: &str) -> Result<f64> {
        self.opt_real(column)?.ok_or_else(|| self.malformed(column))
    }

    /// Optional numeric column (INTEGER values are widened)
    pub fn opt_real(&self, column: &str) -> Result<Option<f64>> {
        match self.value(column) {
            None => Ok(None),
            Some(Value::Real(f)) => Ok(Some(*f)),
            Some(Value::Integer(i)) => Ok(Some(*i as f64)),
            Some(_) => Err(self.malformed(column)),
        }
    }

    /// Required integer column
    pub fn integer(&self, column: &str) -> Result<i64> {
        self.opt_integer(column)?.ok_or_else(|| self.malformed(column))
    }

    /// Optional integer column
    pub fn opt_integer(&self, column: &str) -> Result<Option<i64>> {
        match self.value(column) {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(_) => Err(self.malformed(column)),
        }
    }

    /// 0/1 flag column; absent means false
    pub fn flag(&self, column: &str) -> Result<bool> {
        Ok(self.opt_integer(column)?.is_some_and(|v| v != 0))
    }
}

/// Text parameter, or NULL when absent
pub fn text_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_required_columns() {
        let row = row(&[
            ("name", Value::Text("Main".to_string())),
            ("balance", Value::Integer(100)),
            ("created_at", Value::Integer(5)),
        ]);
        let reader = RowReader::new("accounts", &row);
        assert_eq!(reader.text("name").unwrap(), "Main");
        assert_eq!(reader.real("balance").unwrap(), 100.0);
        assert_eq!(reader.integer("created_at").unwrap(), 5);
    }

    #[test]
    fn test_missing_required_column() {
        let row = row(&[("name", Value::Null)]);
        let reader = RowReader::new("accounts", &row);
        match reader.text("name").unwrap_err() {
            FinanceError::MalformedRow { table, column } => {
                assert_eq!(table, "accounts");
                assert_eq!(column, "name");
            }
            other => panic!("Expected MalformedRow, got {other:?}"),
        }
        assert!(reader.real("balance").is_err());
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let row = row(&[("amount", Value::Text("ten".to_string()))]);
        let reader = RowReader::new("expenses", &row);
        assert!(matches!(reader.opt_real("amount"), Err(FinanceError::MalformedRow { .. })));
    }

    #[test]
    fn test_optional_columns() {
        let row = row(&[
            ("color", Value::Text("  ".to_string())),
            ("deadline", Value::Null),
            ("is_completed", Value::Integer(1)),
        ]);
        let reader = RowReader::new("goals", &row);
        assert!(reader.opt_text("color").unwrap().is_none());
        assert!(reader.opt_integer("deadline").unwrap().is_none());
        assert!(reader.flag("is_completed").unwrap());
        assert!(!reader.flag("missing").unwrap());
    }

    #[test]
    fn test_text_or_null() {
        assert_eq!(text_or_null(Some("x")), Value::Text("x".to_string()));
        assert_eq!(text_or_null(None), Value::Null);
    }
}
