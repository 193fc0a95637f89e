//! Input validation helpers.

use serde_json::Value;

use crate::error::{Error, Result};

/// Returns `true` when every value is a number. An empty slice is valid.
pub fn check_numbers(values: &[Value]) -> bool {
    values.iter().all(Value::is_number)
}

/// Rejects NaN and infinite coordinates.
pub(crate) fn ensure_finite(field: &'static str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(Error::NonNumeric {
            field,
            values: values.to_vec(),
        })
    }
}
