//! Common result and error types for the Strata workspace.

/// The result type for operations that can only fail on an internal bug or a
/// malformed collaborator input (for example a ragged device grid).
pub type StrataResult<T> = Result<T, InternalError>;

/// An internal error: an invariant of a data structure handed to Strata does
/// not hold.
///
/// Placement failures that a run can legitimately hit (solver divergence,
/// cost drift) have their own error types in `strata_place`.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("grid row 3 has 4 tiles, expected 5");
        assert_eq!(
            format!("{err}"),
            "internal error: grid row 3 has 4 tiles, expected 5"
        );
    }

    #[test]
    fn err_path() {
        let r: StrataResult<u32> = Err(InternalError::new("bad"));
        assert_eq!(r.unwrap_err().message, "bad");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
