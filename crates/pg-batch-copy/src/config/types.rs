//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database connection settings.
    pub source: DbConfig,

    /// Target database connection settings.
    pub target: DbConfig,

    /// Copy behavior configuration.
    pub copy: CopyConfig,
}

/// PostgreSQL connection settings, used for both source and target.
#[derive(Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub dbname: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// SSL mode: disable, require, verify-ca, verify-full (default: "require").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

// Manual Debug so connection settings can be logged without leaking credentials.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Copy behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Schema containing the table, on both ends (default: "public").
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Table to copy. The target table has the same name.
    pub table: String,

    /// Rows per fetch/insert batch (default: 5000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// What to do when a batch insert fails (default: continue).
    #[serde(default)]
    pub on_insert_error: InsertErrorPolicy,
}

/// Policy for handling a failed batch insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertErrorPolicy {
    /// Log the error and move on to the next batch. Rows in the failed
    /// batch are dropped from the copied total and never retried.
    #[default]
    Continue,

    /// Surface the first insert error and stop the run.
    Abort,
}

// Default value functions for serde
fn default_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "require".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_batch_size() -> usize {
    5000
}
