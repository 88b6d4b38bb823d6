//! Error types for the sampling pipeline and its configuration

use std::fmt;

/// Result type alias used throughout the crate
pub type HealthResult<T> = Result<T, HealthError>;

/// Errors that can occur while sampling, configuring or starting the agent
#[derive(Debug, Clone, PartialEq)]
pub enum HealthError {
    /// A metric source could not be read or parsed during a tick.
    ///
    /// Recovered locally: the tick is skipped and the scheduler re-arms.
    SourceUnavailable { source_name: String, reason: String },

    /// A configuration option is out of its valid range.
    ///
    /// The previously valid value stays active.
    ConfigInvalid { option: String, reason: String },

    /// The read endpoint could not be created at startup (fatal)
    RegistrationFailed(String),

    /// A command was sent to a scheduler that is no longer running
    SchedulerStopped,
}

impl HealthError {
    pub fn source_unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        HealthError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(option: impl Into<String>, reason: impl Into<String>) -> Self {
        HealthError::ConfigInvalid {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthError::SourceUnavailable {
                source_name,
                reason,
            } => write!(f, "metric source '{source_name}' unavailable: {reason}"),
            HealthError::ConfigInvalid { option, reason } => {
                write!(f, "invalid value for '{option}': {reason}")
            }
            HealthError::RegistrationFailed(msg) => {
                write!(f, "failed to register read endpoint: {msg}")
            }
            HealthError::SchedulerStopped => write!(f, "scheduler is not running"),
        }
    }
}

impl std::error::Error for HealthError {}
