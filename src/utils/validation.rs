//! Identifier validation utilities.
//!
//! Element and port identifiers travel through management views as
//! `element:port` strings and through RPC envelopes as element text, so both
//! layers share one definition of a well-formed identifier.

use std::sync::LazyLock;

use regex::Regex;

/// Letters, digits, `.`, `_` and `-`, starting with a letter or digit, at most
/// 64 characters. `:` is excluded because it separates element and port.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("Invalid identifier regex")
});

/// Check whether a string is a well-formed element or port identifier
///
/// # Examples
/// ```
/// use optisim::utils::validation::is_valid_identifier;
///
/// assert!(is_valid_identifier("OTN-TXP-NYC-001"));
/// assert!(is_valid_identifier("optical-tx"));
/// assert!(!is_valid_identifier("ne:port"));
/// assert!(!is_valid_identifier(""));
/// ```
pub fn is_valid_identifier(id: &str) -> bool {
    IDENTIFIER.is_match(id)
}

/// Validate an identifier, describing the problem on failure
pub fn validate_identifier(kind: &str, id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err(format!("{} identifier cannot be empty", kind));
    }
    if !is_valid_identifier(id) {
        return Err(format!("malformed {} identifier '{}'", kind, id));
    }
    Ok(())
}
