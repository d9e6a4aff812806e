//! Error types for the migration library.

use thiserror::Error;

/// Exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for unsupported dialect or type capabilities.
pub const EXIT_UNSUPPORTED: u8 = 2;
/// Exit code for row-set or constraint load failures.
pub const EXIT_LOAD_ERROR: u8 = 3;
/// Exit code for target database and pool errors.
pub const EXIT_TARGET_ERROR: u8 = 4;
/// Exit code for cancelled runs.
pub const EXIT_CANCELLED: u8 = 5;
/// Exit code for lifecycle violations.
pub const EXIT_STATE_ERROR: u8 = 6;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for malformed backup data.
pub const EXIT_FORMAT_ERROR: u8 = 8;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The dialect lacks a capability the generator needs
    #[error("Unsupported operation: {operation} is not supported by dialect {dialect}")]
    Unsupported { operation: String, dialect: String },

    /// No type handler registered for a (type code, type name) pair
    #[error("Type {0} is not supported")]
    TypeNotSupported(String),

    /// No adapter registered to present a natural value class as another class
    #[error("Adapter not found: cannot adapt {natural} to {requested}")]
    AdapterNotFound { natural: String, requested: String },

    /// Schema object model violates an invariant
    #[error("Schema model error: {0}")]
    Schema(String),

    /// Backup data could not be encoded or decoded
    #[error("Backup format error: {0}")]
    Format(String),

    /// Operation invoked outside its valid lifecycle
    #[error("Invalid state: {0}")]
    State(String),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Statement rejected by a session that is not backed by tokio-postgres
    #[error("Session error: {0}")]
    Session(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Loading failed for a specific table
    #[error("Load failed for table {table}: {message}")]
    Load { table: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Load error
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Unsupported error for a dialect capability
    pub fn unsupported(operation: impl Into<String>, dialect: impl Into<String>) -> Self {
        MigrateError::Unsupported {
            operation: operation.into(),
            dialect: dialect.into(),
        }
    }

    /// Create a lifecycle error for use before `open()`.
    pub fn not_opened() -> Self {
        MigrateError::State("not opened".into())
    }

    /// Create a lifecycle error for reads past the end of a row-set.
    pub fn no_more_rows() -> Self {
        MigrateError::State("no more rows".into())
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) | MigrateError::Schema(_) => {
                EXIT_CONFIG_ERROR
            }
            MigrateError::Unsupported { .. }
            | MigrateError::TypeNotSupported(_)
            | MigrateError::AdapterNotFound { .. } => EXIT_UNSUPPORTED,
            MigrateError::Load { .. } => EXIT_LOAD_ERROR,
            MigrateError::Target(_) | MigrateError::Session(_) | MigrateError::Pool { .. } => {
                EXIT_TARGET_ERROR
            }
            MigrateError::Cancelled => EXIT_CANCELLED,
            MigrateError::State(_) => EXIT_STATE_ERROR,
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Format(_) | MigrateError::Json(_) => EXIT_FORMAT_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_not_supported_names_type() {
        let err = MigrateError::TypeNotSupported("UNKNOWN".into());
        assert!(err.to_string().contains("UNKNOWN"));
        assert_eq!(err.exit_code(), EXIT_UNSUPPORTED);
    }

    #[test]
    fn test_state_messages() {
        assert!(MigrateError::not_opened().to_string().contains("not opened"));
        assert!(MigrateError::no_more_rows().to_string().contains("no more rows"));
    }

    #[test]
    fn test_io_exit_code() {
        let err = MigrateError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(err.exit_code(), EXIT_IO_ERROR);
        assert!(err.format_detailed().starts_with("Error: IO error"));
    }
}
