//! Error types and context management for motif mining operations

use std::fmt;
use std::path::PathBuf;

/// Main error type for all engine operations
#[derive(Debug)]
pub enum MotifError {
    /// Dataset is malformed or structurally inconsistent at load time
    InvalidInput {
        /// Description of what's wrong with the dataset
        reason: String,
    },

    /// Parameter lies outside its accepted domain
    InvalidArgument {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Referenced cell type, motif label or dataset id does not exist
    NotFound {
        /// What kind of entity was looked up
        kind: &'static str,
        /// Name that was looked up
        name: String,
    },

    /// Numerical computation could not produce a valid result
    Computation {
        /// Name of the computation that failed
        operation: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// Caller cancelled the operation or its deadline passed
    Cancelled {
        /// Operation that observed the cancellation
        operation: &'static str,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Dataset file is not valid JSON for the expected schema
    Parse {
        /// Path of the file being parsed
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },
}

/// Stable error category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed dataset
    InvalidInput,
    /// Parameter out of domain
    InvalidArgument,
    /// Unknown cell type, label or dataset
    NotFound,
    /// Numerical failure
    Computation,
    /// Cooperative cancellation
    Cancelled,
    /// File loading failure
    Io,
}

impl ErrorKind {
    /// Stable identifier for transport layers
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Computation => "computation",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
        }
    }
}

impl MotifError {
    /// Category of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Computation { .. } => ErrorKind::Computation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::FileSystem { .. } | Self::Parse { .. } => ErrorKind::Io,
        }
    }
}

impl fmt::Display for MotifError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => {
                write!(f, "Invalid input data: {reason}")
            }
            Self::InvalidArgument {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::NotFound { kind, name } => {
                write!(f, "{kind} '{name}' not found")
            }
            Self::Computation { operation, reason } => {
                write!(f, "Computation error in {operation}: {reason}")
            }
            Self::Cancelled { operation } => {
                write!(f, "Operation {operation} was cancelled")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::Parse { path, source } => {
                write!(f, "Failed to parse '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for MotifError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for engine results
pub type Result<T> = std::result::Result<T, MotifError>;

impl From<std::io::Error> for MotifError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid input error
pub fn invalid_input(reason: &impl ToString) -> MotifError {
    MotifError::InvalidInput {
        reason: reason.to_string(),
    }
}

/// Create an invalid argument error
pub fn invalid_argument(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MotifError {
    MotifError::InvalidArgument {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a not-found error
pub fn not_found(kind: &'static str, name: &impl ToString) -> MotifError {
    MotifError::NotFound {
        kind,
        name: name.to_string(),
    }
}

/// Create a computation error
pub fn computation_error(operation: &'static str, reason: &impl ToString) -> MotifError {
    MotifError::Computation {
        operation,
        reason: reason.to_string(),
    }
}
