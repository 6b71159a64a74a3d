//! Utility functions shared across the crate

pub mod common;
pub mod id_gen;
pub mod validation;

pub use common::{date_to_millis, millis_to_date, now_millis};
pub use id_gen::{generate_id, is_valid_id};
