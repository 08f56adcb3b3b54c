//! Shared utilities: identifier validation.

pub mod validation;

pub use validation::{is_valid_identifier, validate_identifier};
