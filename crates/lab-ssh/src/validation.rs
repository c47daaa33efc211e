//! Connection parameter and command validation.
//!
//! Every host, username, password and port is checked with one predicate
//! before a command is dispatched. A value passes when it is a non-trivial,
//! non-placeholder string.

use crate::error::{DispatchError, Result};

/// Literal values that stand in for "not configured".
pub const PLACEHOLDER_VALUES: &[&str] = &["none", "null"];

/// Rules applied by [`ValueRule::check`].
///
/// The default rule rejects empty and whitespace-only strings, the
/// [`PLACEHOLDER_VALUES`] and unresolved `${NAME}` references. Callers may
/// add values to reject or restrict the accepted set.
#[derive(Debug, Clone, Default)]
pub struct ValueRule {
    /// Extra values to reject (exact match).
    pub invalid_values: Vec<String>,
    /// When non-empty, only these values are accepted (exact match).
    pub valid_values: Vec<String>,
}

impl ValueRule {
    /// Create the default rule.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            invalid_values: Vec::new(),
            valid_values: Vec::new(),
        }
    }

    /// Reject an additional value.
    #[must_use]
    pub fn reject(mut self, value: impl Into<String>) -> Self {
        self.invalid_values.push(value.into());
        self
    }

    /// Accept only the given values.
    #[must_use]
    pub fn only<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Check a value against this rule.
    #[must_use]
    pub fn check(&self, value: &str) -> bool {
        if !self.valid_values.is_empty() {
            return self.valid_values.iter().any(|v| v == value);
        }
        if self.invalid_values.iter().any(|v| v == value) {
            return false;
        }
        !is_placeholder(value)
    }
}

/// Check that a value is a non-trivial, non-placeholder string.
#[must_use]
pub fn valid_value(value: &str) -> bool {
    !is_placeholder(value)
}

/// Check whether a value is empty or stands in for a missing setting.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    if PLACEHOLDER_VALUES
        .iter()
        .any(|p| trimmed.eq_ignore_ascii_case(p))
    {
        return true;
    }
    is_unresolved_reference(trimmed)
}

/// `${NAME}` left behind when a variable was never substituted.
fn is_unresolved_reference(value: &str) -> bool {
    value.len() > 3
        && value.starts_with("${")
        && value.ends_with('}')
        && !value[2..value.len() - 1].contains(['{', '}'])
}

/// Validate a command before it is sent.
///
/// Only null bytes are rejected; the remote shell owns everything else.
pub fn validate_command(command: &str) -> Result<()> {
    if command.contains('\0') {
        return Err(DispatchError::invalid_command("command contains null byte"));
    }
    Ok(())
}
