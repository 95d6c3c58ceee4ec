//! Store error types.

use thiserror::Error;

/// Errors produced while applying a request to the store.
///
/// None of these reach the wire as failures of the connection; each becomes a
/// `success: false` response.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Student not found")]
    StudentNotFound,

    #[error("Module not found")]
    ModuleNotFound,

    #[error("Student ID already exists")]
    StudentExists,

    #[error("Module code already exists")]
    ModuleExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {field} (expected {expected})")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

impl StoreError {
    /// Returns whether the request itself was malformed, as opposed to being
    /// rejected by a business rule.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::MissingField(_) | StoreError::InvalidField { .. }
        )
    }

    /// Message carried by the failure response.
    pub fn response_message(&self) -> String {
        if self.is_validation() {
            format!("Error: {}", self)
        } else {
            self.to_string()
        }
    }
}

/// Errors that end a store connection or the accept loop.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] campusgate_protocol::ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rule_messages() {
        assert_eq!(
            StoreError::StudentNotFound.response_message(),
            "Student not found"
        );
        assert_eq!(
            StoreError::ModuleExists.response_message(),
            "Module code already exists"
        );
        assert!(!StoreError::InvalidCredentials.is_validation());
    }

    #[test]
    fn test_validation_messages() {
        let err = StoreError::MissingField("studentId");
        assert!(err.is_validation());
        assert_eq!(
            err.response_message(),
            "Error: missing required field: studentId"
        );

        let err = StoreError::InvalidField {
            field: "credits",
            expected: "integer",
        };
        assert_eq!(
            err.response_message(),
            "Error: invalid field: credits (expected integer)"
        );
    }
}
