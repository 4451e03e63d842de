//! Copy orchestrator: connection lifecycle, schema phase, and run summary.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::{CopyError, Result};
use crate::source::{PgSourcePool, SourcePool};
use crate::target::{PgTargetPool, TargetPool};
use crate::transfer::{TransferConfig, TransferEngine, TransferStats};

/// Copy orchestrator. Owns both connection pools for the duration of one
/// run and releases them on every exit path.
pub struct Copier {
    config: Config,
    source: Arc<PgSourcePool>,
    target: Arc<PgTargetPool>,
}

/// Result of a copy run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyResult {
    /// Unique run identifier.
    pub run_id: String,

    /// "completed", or "completed_with_errors" when batches were dropped.
    pub status: String,

    /// Fully qualified table that was copied.
    pub table: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Rows appended to the target. Rows in failed batches are excluded.
    pub rows_copied: i64,

    /// Fetches issued, including the final empty one.
    pub pages_fetched: u64,

    /// Batches appended successfully.
    pub batches_inserted: u64,

    /// Batches dropped because their insert failed.
    pub batches_failed: u64,

    /// Source offsets of the dropped batches.
    pub failed_offsets: Vec<i64>,

    /// Average throughput (rows/second).
    pub rows_per_second: i64,
}

impl CopyResult {
    /// Serialize the result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of a connectivity health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl Copier {
    /// Create a new copier with pools for both databases.
    pub fn new(config: Config) -> Result<Self> {
        let source = PgSourcePool::connect(&config.source)?;
        let target = PgTargetPool::connect(&config.target)?;

        Ok(Self {
            config,
            source: Arc::new(source),
            target: Arc::new(target),
        })
    }

    /// Run the copy. Pools are closed before returning, on success and on
    /// error alike.
    pub async fn run(self) -> Result<CopyResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let table_name = format!("{}.{}", self.config.copy.schema, self.config.copy.table);

        info!("Starting copy run {} for {}", run_id, table_name);

        let outcome = self.execute().await;
        self.close().await;
        let stats = outcome?;

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let rows_per_second = if duration > 0.0 {
            (stats.rows_copied as f64 / duration) as i64
        } else {
            0
        };

        let status = if stats.batches_failed > 0 {
            "completed_with_errors"
        } else {
            "completed"
        };

        Ok(CopyResult {
            run_id,
            status: status.to_string(),
            table: table_name,
            started_at,
            completed_at,
            duration_seconds: duration,
            rows_copied: stats.rows_copied,
            pages_fetched: stats.pages_fetched,
            batches_inserted: stats.batches_inserted,
            batches_failed: stats.batches_failed,
            failed_offsets: stats.failed_offsets,
            rows_per_second,
        })
    }

    async fn execute(&self) -> Result<TransferStats> {
        let copy = &self.config.copy;

        // Phase 1: read source column metadata once.
        info!("Phase 1: Reading source table metadata");
        let table = self.source.load_table(&copy.schema, &copy.table).await?;

        // Phase 2: make sure the target table exists before any rows move.
        info!("Phase 2: Preparing target table");
        if self.target.table_exists(&copy.schema, &copy.table).await? {
            info!(
                "Target table {} already exists, appending",
                table.full_name()
            );
        } else {
            self.target.create_table(&table, &copy.schema).await?;
        }

        // Phase 3: the batch loop.
        info!("Phase 3: Copying rows");
        let engine = TransferEngine::new(
            self.source.clone(),
            self.target.clone(),
            TransferConfig {
                batch_size: copy.batch_size,
                on_insert_error: copy.on_insert_error,
            },
        );
        engine.run(&table, &copy.schema).await
    }

    /// Compare exact row counts between source and target.
    pub async fn validate(self) -> Result<()> {
        let copy = self.config.copy.clone();
        let outcome = async {
            let source_count = self.source.get_row_count(&copy.schema, &copy.table).await?;
            let target_count = self.target.get_row_count(&copy.schema, &copy.table).await?;
            if source_count == target_count {
                info!(
                    "{}.{}: source and target both have {} rows",
                    copy.schema, copy.table, source_count
                );
                Ok(())
            } else {
                Err(CopyError::Validation(format!(
                    "row count mismatch for {}.{}: source={}, target={}",
                    copy.schema, copy.table, source_count, target_count
                )))
            }
        }
        .await;
        self.close().await;
        outcome
    }

    /// Test connectivity to both databases.
    pub async fn health_check(self) -> Result<HealthReport> {
        let start = Instant::now();
        let source_result = self.source.test_connection().await;
        let source_latency_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let target_result = self.target.test_connection().await;
        let target_latency_ms = start.elapsed().as_millis() as u64;

        self.close().await;

        let report = HealthReport {
            source_connected: source_result.is_ok(),
            source_latency_ms,
            source_error: source_result.err().map(|e| e.to_string()),
            target_connected: target_result.is_ok(),
            target_latency_ms,
            target_error: target_result.err().map(|e| e.to_string()),
            healthy: false,
        };

        Ok(HealthReport {
            healthy: report.source_connected && report.target_connected,
            ..report
        })
    }

    async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}
