//! Category operations
//!
//! Categories are seeded once and read-only to the UI.

use std::collections::HashMap;

use crate::database::rows::RowReader;
use crate::database::{Category, Row};
use crate::error::Result;
use crate::DEFAULT_CATEGORY_NAME;
use super::finance::FinanceData;

impl FinanceData {
    /// Get all categories, seeded defaults first
    pub fn categories(&self) -> Vec<Category> {
        self.snapshot().categories.clone()
    }

    /// Get a category by ID
    pub fn category(&self, category_id: &str) -> Option<Category> {
        self.snapshot()
            .categories
            .iter()
            .find(|c| c.id == category_id)
            .cloned()
    }
}

pub(crate) fn category_from_row(row: &Row) -> Result<Category> {
    let reader = RowReader::new("categories", row);
    Ok(Category {
        id: reader.text("id")?,
        name: reader.text("name")?,
        icon: reader.opt_text("icon")?,
        color: reader.opt_text("color")?,
        is_default: reader.flag("is_default")?,
    })
}

/// Display-name lookup for expense rows
pub(crate) struct CategoryNames<'a> {
    by_id: HashMap<&'a str, &'a str>,
}

impl<'a> CategoryNames<'a> {
    pub fn new(categories: &'a [Category]) -> Self {
        Self {
            by_id: categories.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect(),
        }
    }

    /// Name for a stored `category_id`
    ///
    /// Legacy rows hold the category name itself, which is shown as is.
    pub fn resolve(&self, category_id: Option<&str>) -> String {
        match category_id {
            Some(id) => self.by_id.get(id).copied().unwrap_or(id).to_string(),
            None => DEFAULT_CATEGORY_NAME.to_string(),
        }
    }
}
