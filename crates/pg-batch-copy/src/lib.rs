//! # pg-batch-copy
//!
//! Batched PostgreSQL table-to-table copy library.
//!
//! Copies every row of one table from a source database to a same-named
//! table in a target database using offset-based pagination:
//!
//! - **Fixed-size batches** fetched with `LIMIT`/`OFFSET` until a page
//!   comes back empty
//! - **Append semantics** on the target, with the table created up front
//!   from mapped source column metadata when it does not exist
//! - **Per-batch error tolerance**: a failed insert can be logged and
//!   skipped instead of ending the run
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_batch_copy::{Config, Copier};
//!
//! #[tokio::main]
//! async fn main() -> pg_batch_copy::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let result = Copier::new(config)?.run().await?;
//!     println!("Copied {} rows", result.rows_copied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod copier;
pub mod error;
mod pool;
pub mod source;
pub mod target;
pub mod transfer;
pub mod typemap;

// Re-exports for convenient access
pub use config::{Config, CopyConfig, DbConfig, InsertErrorPolicy};
pub use copier::{Copier, CopyResult, HealthReport};
pub use error::{CopyError, Result};
pub use source::{Column, PgSourcePool, SourcePool, Table};
pub use target::{PgTargetPool, SqlValue, TargetPool};
pub use transfer::{TransferConfig, TransferEngine, TransferStats};
