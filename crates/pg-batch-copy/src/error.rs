//! Error types for the copy library.

use thiserror::Error;

/// Main error type for copy operations.
#[derive(Error, Debug)]
pub enum CopyError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[source] tokio_postgres::Error),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[source] tokio_postgres::Error),

    /// Column metadata extraction failed
    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    /// Batch insert failed for a specific table
    #[error("Insert failed for table {table}: {message}")]
    Insert { table: String, message: String },

    /// Row count comparison failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CopyError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        CopyError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap a source-side driver error
    pub fn source(err: tokio_postgres::Error) -> Self {
        CopyError::Source(err)
    }

    /// Wrap a target-side driver error
    pub fn target(err: tokio_postgres::Error) -> Self {
        CopyError::Target(err)
    }

    /// Create an Insert error
    pub fn insert(table: impl Into<String>, message: impl Into<String>) -> Self {
        CopyError::Insert {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> u8 {
        match self {
            CopyError::Config(_) | CopyError::Yaml(_) | CopyError::Json(_) => 1,
            CopyError::Source(_) => 2,
            CopyError::Target(_) => 3,
            CopyError::Pool { .. } => 4,
            CopyError::SchemaExtraction(_) => 5,
            CopyError::Insert { .. } => 6,
            CopyError::Io(_) => 7,
            CopyError::Validation(_) => 8,
        }
    }
}

/// Result type alias for copy operations.
pub type Result<T> = std::result::Result<T, CopyError>;
