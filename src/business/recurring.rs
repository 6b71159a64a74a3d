//! Recurring payment operations

use tracing::{info, warn};

use crate::database::queries::{self, RecurringRecord};
use crate::database::rows::RowReader;
use crate::database::{Frequency, NewRecurringPayment, RecurringPayment, Row};
use crate::error::{FinanceError, Result};
use crate::utils::validation::{require_positive_amount, require_text};
use crate::utils::{date_to_millis, generate_id, millis_to_date, now_millis};
use crate::DEFAULT_CATEGORY_NAME;
use super::finance::FinanceData;

impl FinanceData {
    /// Add an active recurring payment, returning its ID
    pub fn add_recurring(&self, payment: NewRecurringPayment) -> Result<String> {
        require_text("name", &payment.name)?;
        require_positive_amount("amount", payment.amount)?;

        let id = generate_id();
        let category = payment
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_NAME);
        let account_id = payment
            .account_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let record = RecurringRecord {
            id: &id,
            name: payment.name.trim(),
            amount: payment.amount,
            frequency: payment.frequency.as_str(),
            category,
            account_id,
            date: date_to_millis(payment.next_date),
        };
        self.mutate(|backend| {
            if let Some(account_id) = account_id {
                if !queries::account_exists(backend, account_id)? {
                    return Err(FinanceError::AccountNotFound(account_id.to_string()));
                }
            }
            queries::create_recurring(backend, &record, now_millis())
        })?;

        info!(recurring_id = %id, frequency = %payment.frequency, "recurring payment added");
        Ok(id)
    }

    /// Get active recurring payments, soonest first
    pub fn recurring(&self) -> Vec<RecurringPayment> {
        self.snapshot().recurring.clone()
    }
}

pub(crate) fn recurring_from_row(row: &Row) -> Result<RecurringPayment> {
    let reader = RowReader::new("recurring_expenses", row);
    let id = reader.text("id")?;

    let frequency = match reader.opt_text("frequency")? {
        None => Frequency::default(),
        Some(text) => text.parse().unwrap_or_else(|_| {
            warn!(recurring_id = %id, value = %text, "unknown frequency, using default");
            Frequency::default()
        }),
    };
    let next_date = millis_to_date(reader.integer("date")?).ok_or_else(|| FinanceError::MalformedRow {
        table: "recurring_expenses".to_string(),
        column: "date".to_string(),
    })?;

    Ok(RecurringPayment {
        name: reader.opt_text("name")?.unwrap_or_default(),
        amount: reader.real("amount")?,
        frequency,
        category: reader
            .opt_text("category")?
            .unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string()),
        account_id: reader.opt_text("account_id")?,
        next_date,
        id,
    })
}
