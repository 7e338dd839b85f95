//! Programs that fail.

use thiserror::Error;

/// The error raised by [`raise_value_error`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value: {0}")]
pub struct InvalidValue(pub String);

/// Always fails with [`InvalidValue`].
///
/// # Errors
///
/// Every call.
pub fn raise_value_error() -> Result<(), InvalidValue> {
    Err(InvalidValue("forty-two".to_owned()))
}

/// Always panics.
///
/// # Panics
///
/// Every call.
pub fn panic_with_message() {
    panic!("kaboom");
}
