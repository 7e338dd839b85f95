//! Conversion of a target's return value into an outcome.

use crate::exit::ExitRequest;

/// Return types accepted from an invoked target.
///
/// A returned error is an uncaught failure unless it is an
/// [`ExitRequest`]. A returned nonzero integer is kept as the return value
/// and also treated as a request to exit with that status.
pub trait Report {
    /// Value recorded as the invocation's return value.
    type Value;

    /// Split the return into a value or an error.
    ///
    /// # Errors
    ///
    /// Returns the target's error, converted into [`anyhow::Error`].
    fn report(self) -> anyhow::Result<Self::Value>;

    /// Termination implied by a returned value.
    fn exit_request(_value: &Self::Value) -> Option<ExitRequest> {
        None
    }
}

impl Report for () {
    type Value = ();

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(())
    }
}

impl Report for i32 {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }

    fn exit_request(value: &Self::Value) -> Option<ExitRequest> {
        (*value != 0).then(|| ExitRequest::code(*value))
    }
}

impl Report for u8 {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }

    fn exit_request(value: &Self::Value) -> Option<ExitRequest> {
        (*value != 0).then(|| ExitRequest::code(i32::from(*value)))
    }
}

impl Report for i64 {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }

    fn exit_request(value: &Self::Value) -> Option<ExitRequest> {
        (*value != 0).then(|| {
            i32::try_from(*value)
                .map_or_else(|_| ExitRequest::new(value.to_string()), ExitRequest::code)
        })
    }
}

impl Report for bool {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }

    fn exit_request(value: &Self::Value) -> Option<ExitRequest> {
        value.then(|| ExitRequest::code(1))
    }
}

impl Report for String {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }
}

impl Report for &'static str {
    type Value = Self;

    fn report(self) -> anyhow::Result<Self::Value> {
        Ok(self)
    }
}

impl<T, E> Report for Result<T, E>
where
    T: Report,
    E: Into<anyhow::Error>,
{
    type Value = T::Value;

    fn report(self) -> anyhow::Result<Self::Value> {
        self.map_err(Into::into).and_then(Report::report)
    }

    fn exit_request(value: &Self::Value) -> Option<ExitRequest> {
        T::exit_request(value)
    }
}
