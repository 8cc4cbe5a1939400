use std::path::PathBuf;

/// Broad category of a [`StoreError`], for callers that only branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Validation,
    Io,
    Corruption,
}

/// Failure of a credentials-store operation.
///
/// Messages name the file and the profile header. They never include the
/// secret access key or the session token.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Profile {header} in {} is truncated: expected {expected} credential lines after the header, found {found}",
        .path.display()
    )]
    Corruption {
        path: PathBuf,
        header: String,
        expected: usize,
        found: usize,
    },

    #[error(
        "Profile {header} in {} is malformed: line {position} after the header should be {expected}",
        .path.display()
    )]
    MisplacedKey {
        path: PathBuf,
        header: String,
        position: usize,
        expected: &'static str,
    },
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Validation { .. } => StoreErrorKind::Validation,
            StoreError::Io { .. } => StoreErrorKind::Io,
            StoreError::Corruption { .. } | StoreError::MisplacedKey { .. } => {
                StoreErrorKind::Corruption
            }
        }
    }
}
