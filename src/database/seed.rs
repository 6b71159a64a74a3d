//! Default rows inserted once per fresh database

use rusqlite::types::Value;
use tracing::info;

use super::backend::StorageBackend;
use crate::error::Result;
use crate::utils::{generate_id, now_millis};

/// Default categories: (name, icon, color)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Groceries", "🍔", "#FF6B6B"),
    ("Transport", "🚗", "#4ECDC4"),
    ("Entertainment", "🎬", "#95E1D3"),
    ("Health", "💊", "#F38181"),
    ("Clothing", "👕", "#AA96DA"),
    ("Housing", "🏠", "#FCBAD3"),
    ("Education", "📚", "#A8E6CF"),
    ("Other", "📦", "#DDA0DD"),
];

/// Number of seeded (`is_default = 1`) categories
pub fn count_default_categories(backend: &mut dyn StorageBackend) -> Result<i64> {
    let rows = backend.query("SELECT COUNT(*) AS count FROM categories WHERE is_default = 1", &[])?;
    Ok(match rows.first().and_then(|row| row.get("count")) {
        Some(Value::Integer(count)) => *count,
        _ => 0,
    })
}

/// Insert the default categories unless some are already present
///
/// Returns the number of categories inserted.
pub fn seed_default_categories(backend: &mut dyn StorageBackend) -> Result<usize> {
    if count_default_categories(backend)? > 0 {
        return Ok(0);
    }

    let now = now_millis();
    let statements = vec![
        "INSERT INTO categories (id, name, icon, color, is_default, created_at, updated_at)
         VALUES (?, ?, ?, ?, 1, ?, ?)";
        DEFAULT_CATEGORIES.len()
    ];
    let params: Vec<Vec<Value>> = DEFAULT_CATEGORIES
        .iter()
        .map(|(name, icon, color)| {
            vec![
                Value::Text(generate_id()),
                Value::Text(name.to_string()),
                Value::Text(icon.to_string()),
                Value::Text(color.to_string()),
                Value::Integer(now),
                Value::Integer(now),
            ]
        })
        .collect();

    let result = backend.execute(&statements, &params)?;
    info!(count = result.total_rows_affected, "seeded default categories");
    Ok(result.total_rows_affected)
}
