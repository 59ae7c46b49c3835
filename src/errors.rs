// Error taxonomy for csrf-audit
//
// Only InvalidStrategy indicates a bug in calling code. Everything else comes
// from the target or the corpus and degrades a single result instead of
// aborting the run.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Corpus empty, singleton, or too short for a statistic
    #[error("Not enough data: {0}")]
    InsufficientData(String),

    /// A live request could not complete
    #[error("Transport failure for {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    /// Zero-variance divisor or non-finite result
    #[error("Degenerate statistic in {test}: {reason}")]
    DegenerateStatistic { test: String, reason: String },

    /// Unknown mutation strategy name
    #[error("Invalid mutation strategy: {0}")]
    InvalidStrategy(String),
}

impl AuditError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        AuditError::InsufficientData(reason.into())
    }

    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        AuditError::TransportFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn degenerate(test: impl Into<String>, reason: impl Into<String>) -> Self {
        AuditError::DegenerateStatistic {
            test: test.into(),
            reason: reason.into(),
        }
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
