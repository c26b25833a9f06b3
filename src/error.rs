//! Error types.
//!
//! Only malformed input is an error. Infeasibility, budget expiry and
//! cancellation are terminal outcomes reported through
//! [`crate::search::SolveStatus`].

use thiserror::Error;

use crate::incremental::RunPhase;
use crate::validation::ValidationError;

/// Input or configuration rejected before any search node is expanded.
///
/// Deterministic: retrying with the same input fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid configuration ({} issue(s)): {}", .issues.len(), join_messages(.issues))]
pub struct ConfigurationError {
    /// Every issue found, in detection order.
    pub issues: Vec<ValidationError>,
}

impl ConfigurationError {
    /// Wraps a list of validation issues.
    pub fn new(issues: Vec<ValidationError>) -> Self {
        Self { issues }
    }

    /// Whether any issue has the given kind.
    pub fn has_kind(&self, kind: crate::validation::ValidationErrorKind) -> bool {
        self.issues.iter().any(|e| e.kind == kind)
    }
}

impl From<Vec<ValidationError>> for ConfigurationError {
    fn from(issues: Vec<ValidationError>) -> Self {
        Self::new(issues)
    }
}

fn join_messages(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input rejected at compile time.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A change-set was applied to a planner with nothing published yet.
    #[error("no published schedule to re-optimize (planner is {phase})")]
    NoPublishedSchedule {
        /// Phase the planner was in.
        phase: RunPhase,
    },
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::new(vec![
            ValidationError::new(ValidationErrorKind::DuplicateId, "Duplicate room ID: R1"),
            ValidationError::new(ValidationErrorKind::InvalidDuration, "Session 'S' has zero duration"),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("Duplicate room ID: R1; Session 'S' has zero duration"));
        assert!(err.has_kind(ValidationErrorKind::DuplicateId));
        assert!(!err.has_kind(ValidationErrorKind::InvalidWeight));
    }

    #[test]
    fn test_error_from_configuration() {
        let err: Error = ConfigurationError::new(vec![]).into();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
