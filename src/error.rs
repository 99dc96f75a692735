use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the reposyn library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Ignore or summary pattern that could not be parsed.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Directory traversal failed part-way through the tree.
    #[error("Directory walk failed: {message}")]
    Walk {
        /// Error message
        message: String,
    },

    /// A visited path was not below the traversal root.
    #[error("Cannot compute path of '{path}' relative to the input root")]
    RelativePath {
        /// Offending path
        path: PathBuf,
    },

    /// File has no lines to summarize.
    #[error("File '{path}' is empty")]
    EmptyFile {
        /// Path to the empty file
        path: PathBuf,
    },

    /// Git repository access error.
    #[error("Git error: {message}")]
    Git {
        /// Error message
        message: String,
    },

    /// No repository marker found walking up from a directory.
    #[error("No git repository found in '{path}' or any parent directory")]
    NoRepository {
        /// Directory the search started from
        path: PathBuf,
    },

    /// System clipboard error.
    #[error("Clipboard error: {message}")]
    Clipboard {
        /// Error message
        message: String,
    },

    /// A worker thread failed or the job queue was closed early.
    #[error("Worker failure: {message}")]
    Worker {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates an empty file error.
    #[must_use]
    pub fn empty_file(path: impl Into<PathBuf>) -> Self {
        Self::EmptyFile { path: path.into() }
    }

    /// Creates a relative path error.
    #[must_use]
    pub fn relative_path(path: impl Into<PathBuf>) -> Self {
        Self::RelativePath { path: path.into() }
    }

    /// Creates a no repository error.
    #[must_use]
    pub fn no_repository(path: impl Into<PathBuf>) -> Self {
        Self::NoRepository { path: path.into() }
    }

    /// Creates a clipboard error.
    #[must_use]
    pub fn clipboard(message: impl Into<String>) -> Self {
        Self::Clipboard {
            message: message.into(),
        }
    }

    /// Creates a worker error.
    #[must_use]
    pub fn worker(message: impl Into<String>) -> Self {
        Self::Worker {
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidPattern { .. })
    }

    /// Returns true if this is an empty file error.
    #[must_use]
    pub const fn is_empty_file(&self) -> bool {
        matches!(self, Self::EmptyFile { .. })
    }
}

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        let message = match e.path() {
            Some(path) => format!("{}: {e}", path.display()),
            None => e.to_string(),
        };
        Self::Walk { message }
    }
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Self {
        Self::Git {
            message: e.message().to_string(),
        }
    }
}
