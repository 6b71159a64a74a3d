//! Business logic layer for the finance tracker
//!
//! This module provides the high-level FinanceData API: the in-memory
//! snapshot the UI renders and the mutations that keep it in sync with
//! storage.

pub mod finance;
pub mod accounts;
pub mod transactions;
pub mod recurring;
pub mod goals;
pub mod categories;

pub use finance::FinanceData;
