//! Domain error types for starting the front end.

use std::fmt;

/// Errors that stop the front end from starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Configuration { details: String },
    /// A browser API needed at startup is unavailable.
    Browser { details: String },
    /// The identity client could not be initialized.
    Initialization { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "invalid configuration: {details}"),
            Self::Browser { details } => write!(f, "browser API unavailable: {details}"),
            Self::Initialization { details } => {
                write!(f, "identity initialization failed: {details}")
            }
        }
    }
}

impl std::error::Error for StartupError {}
