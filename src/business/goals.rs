//! Savings goal operations

use tracing::info;

use crate::database::queries::{self, GoalRecord};
use crate::database::rows::RowReader;
use crate::database::{GoalUpdate, NewSavingsGoal, Row, SavingsGoal};
use crate::error::{FinanceError, Result};
use crate::utils::validation::{require_finite_amount, require_non_negative_amount, require_positive_amount, require_text};
use crate::utils::{date_to_millis, generate_id, millis_to_date, now_millis};
use crate::DEFAULT_COLOR;
use super::finance::FinanceData;

/// Name shown for goals stored without one
const UNNAMED_GOAL: &str = "Goal";

impl FinanceData {
    /// Add an active savings goal, returning its ID
    pub fn add_goal(&self, goal: NewSavingsGoal) -> Result<String> {
        require_text("name", &goal.name)?;
        require_positive_amount("target", goal.target)?;
        require_non_negative_amount("current", goal.current)?;

        let id = generate_id();
        let color = goal
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COLOR);
        let account_id = goal
            .account_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let record = GoalRecord {
            id: &id,
            name: goal.name.trim(),
            target: goal.target,
            current: goal.current,
            deadline: goal.deadline.map(date_to_millis),
            color,
            account_id,
        };
        self.mutate(|backend| {
            if let Some(account_id) = account_id {
                if !queries::account_exists(backend, account_id)? {
                    return Err(FinanceError::AccountNotFound(account_id.to_string()));
                }
            }
            queries::create_goal(backend, &record, now_millis())
        })?;

        info!(goal_id = %id, target = goal.target, "goal added");
        Ok(id)
    }

    /// Write only the fields set in `update`
    ///
    /// `deadline: Some(None)` clears the deadline. Fails with `GoalNotFound`
    /// when no goal has this ID. An empty update writes nothing and does
    /// not republish.
    pub fn update_goal(&self, goal_id: &str, update: GoalUpdate) -> Result<()> {
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(target) = update.target {
            require_positive_amount("target", target)?;
        }
        if let Some(current) = update.current {
            require_non_negative_amount("current", current)?;
        }
        if update.is_empty() {
            // Nothing to write; report a missing goal from the snapshot
            return match self.goal(goal_id) {
                Some(_) => Ok(()),
                None => Err(FinanceError::GoalNotFound(goal_id.to_string())),
            };
        }

        self.mutate(|backend| {
            match queries::update_goal(backend, goal_id, &update, now_millis())? {
                0 => Err(FinanceError::GoalNotFound(goal_id.to_string())),
                _ => Ok(()),
            }
        })?;

        info!(goal_id, "goal updated");
        Ok(())
    }

    /// Add `delta` to a goal's saved amount in a single storage write
    ///
    /// Negative deltas withdraw; the saved amount never drops below zero.
    pub fn contribute_to_goal(&self, goal_id: &str, delta: f64) -> Result<()> {
        require_finite_amount("delta", delta)?;

        self.mutate(|backend| {
            match queries::add_goal_contribution(backend, goal_id, delta, now_millis())? {
                0 => Err(FinanceError::GoalNotFound(goal_id.to_string())),
                _ => Ok(()),
            }
        })?;

        info!(goal_id, delta, "goal contribution recorded");
        Ok(())
    }

    /// Get active goals, newest first
    pub fn goals(&self) -> Vec<SavingsGoal> {
        self.snapshot().goals.clone()
    }

    /// Get an active goal by ID
    pub fn goal(&self, goal_id: &str) -> Option<SavingsGoal> {
        self.snapshot()
            .goals
            .iter()
            .find(|g| g.id == goal_id)
            .cloned()
    }
}

pub(crate) fn goal_from_row(row: &Row) -> Result<SavingsGoal> {
    let reader = RowReader::new("goals", row);
    let deadline = match reader.opt_integer("deadline")? {
        None => None,
        Some(millis) => Some(millis_to_date(millis).ok_or_else(|| FinanceError::MalformedRow {
            table: "goals".to_string(),
            column: "deadline".to_string(),
        })?),
    };

    Ok(SavingsGoal {
        id: reader.text("id")?,
        name: reader.opt_text("name")?.unwrap_or_else(|| UNNAMED_GOAL.to_string()),
        target: reader.real("target_amount")?,
        current: reader.opt_real("current_amount")?.unwrap_or(0.0),
        deadline,
        color: reader.opt_text("color")?.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        account_id: reader.opt_text("account_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::finance::tests::{create_test_finance, date, main_account};
    use std::sync::Arc;

    fn bike() -> NewSavingsGoal {
        NewSavingsGoal {
            name: "Bike".to_string(),
            target: 500.0,
            current: 20.0,
            deadline: Some(date(2025, 6, 1)),
            color: None,
            account_id: None,
        }
    }

    #[test]
    fn test_add_goal() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();

        let goal = finance.goal(&id).unwrap();
        assert_eq!(goal.name, "Bike");
        assert_eq!(goal.target, 500.0);
        assert_eq!(goal.current, 20.0);
        assert_eq!(goal.deadline, Some(date(2025, 6, 1)));
        assert_eq!(goal.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_update_goal_current_only() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();
        let before = finance.goal(&id).unwrap();

        finance.update_goal(&id, GoalUpdate { current: Some(123.45), ..Default::default() }).unwrap();

        let after = finance.goal(&id).unwrap();
        assert_eq!(after.current, 123.45);
        assert_eq!(after, SavingsGoal { current: 123.45, ..before });
    }

    #[test]
    fn test_update_goal_fields() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();

        finance.update_goal(&id, GoalUpdate {
            name: Some("E-bike".to_string()),
            target: Some(1500.0),
            deadline: Some(None),
            color: Some("#f97316".to_string()),
            ..Default::default()
        }).unwrap();

        let goal = finance.goal(&id).unwrap();
        assert_eq!(goal.name, "E-bike");
        assert_eq!(goal.target, 1500.0);
        assert_eq!(goal.current, 20.0);
        assert!(goal.deadline.is_none());
        assert_eq!(goal.color, "#f97316");
    }

    #[test]
    fn test_completed_goal_hidden() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();
        finance.update_goal(&id, GoalUpdate { is_completed: Some(true), ..Default::default() }).unwrap();
        assert!(finance.goal(&id).is_none());
        assert!(finance.goals().is_empty());
    }

    #[test]
    fn test_update_missing_goal() {
        let (finance, _temp) = create_test_finance();
        let err = finance
            .update_goal("missing", GoalUpdate { current: Some(1.0), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, FinanceError::GoalNotFound(_)));

        let err = finance.contribute_to_goal("missing", 1.0).unwrap_err();
        assert!(matches!(err, FinanceError::GoalNotFound(_)));
    }

    #[test]
    fn test_add_goal_unknown_account() {
        let (finance, _temp) = create_test_finance();
        let err = finance
            .add_goal(NewSavingsGoal { account_id: Some("missing".to_string()), ..bike() })
            .unwrap_err();
        assert!(matches!(err, FinanceError::AccountNotFound(id) if id == "missing"));
        assert!(finance.goals().is_empty());

        let account_id = main_account(&finance, 0.0);
        let id = finance.add_goal(NewSavingsGoal { account_id: Some(account_id.clone()), ..bike() }).unwrap();
        assert_eq!(finance.goal(&id).unwrap().account_id, Some(account_id));
    }

    #[test]
    fn test_empty_update_writes_nothing() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();
        let rx = finance.subscribe();
        let before = finance.snapshot();

        finance.update_goal(&id, GoalUpdate::default()).unwrap();
        assert!(Arc::ptr_eq(&before, &finance.snapshot()));
        assert!(rx.try_recv().is_err());

        let err = finance.update_goal("missing", GoalUpdate::default()).unwrap_err();
        assert!(matches!(err, FinanceError::GoalNotFound(_)));
    }

    #[test]
    fn test_update_goal_validation() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();
        let err = finance
            .update_goal(&id, GoalUpdate { current: Some(-1.0), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, FinanceError::Validation(_)));
        assert_eq!(finance.goal(&id).unwrap().current, 20.0);
    }

    #[test]
    fn test_concurrent_contributions_all_land() {
        let (finance, _temp) = create_test_finance();
        let finance = Arc::new(finance);
        let id = finance.add_goal(NewSavingsGoal { current: 0.0, ..bike() }).unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let finance = Arc::clone(&finance);
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        finance.contribute_to_goal(&id, 2.0).unwrap();
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(finance.goal(&id).unwrap().current, 80.0);
    }

    #[test]
    fn test_withdrawal_floors_at_zero() {
        let (finance, _temp) = create_test_finance();
        let id = finance.add_goal(bike()).unwrap();
        finance.contribute_to_goal(&id, -50.0).unwrap();
        assert_eq!(finance.goal(&id).unwrap().current, 0.0);
    }
}
