//! Source database operations: table metadata and page reads.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{CopyError, Result};
use crate::target::SqlValue;

/// Table metadata, read once from the source before the copy loop starts.
#[derive(Debug, Clone)]
pub struct Table {
    /// Schema name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Approximate row count, from the planner statistics.
    pub row_count: i64,
}

impl Table {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Column metadata.
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// PostgreSQL type name (`udt_name`, e.g. "int4", "varchar").
    pub data_type: String,

    /// Maximum character length, 0 when not applicable.
    pub max_length: i32,

    /// Numeric precision, 0 when not applicable.
    pub precision: i32,

    /// Numeric scale, 0 when not applicable.
    pub scale: i32,

    /// Whether the column is nullable.
    pub is_nullable: bool,

    /// 1-based ordinal position.
    pub ordinal_pos: i32,
}

/// Read operations against the source database.
#[async_trait]
pub trait SourcePool: Send + Sync {
    /// Read column metadata for a table.
    async fn load_table(&self, schema: &str, table: &str) -> Result<Table>;

    /// Fetch one page of rows at the given offset. An empty page means the
    /// table is exhausted.
    async fn fetch_page(
        &self,
        table: &Table,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Vec<SqlValue>>>;

    /// Get the exact row count for a table.
    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// Run a trivial query to verify connectivity.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection pool.
    async fn close(&self);
}

/// PostgreSQL source pool implementation.
pub struct PgSourcePool {
    pool: Pool,
}

impl PgSourcePool {
    /// Create a source pool from connection settings. Connections are opened
    /// lazily on first use.
    pub fn connect(config: &DbConfig) -> Result<Self> {
        let pool = crate::pool::build_pool(config, "source")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SourcePool for PgSourcePool {
    async fn load_table(&self, schema: &str, table: &str) -> Result<Table> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting source connection for load_table"))?;

        let query = r#"
            SELECT
                column_name,
                udt_name,
                COALESCE(character_maximum_length, 0)::int4,
                COALESCE(numeric_precision, 0)::int4,
                COALESCE(numeric_scale, 0)::int4,
                CASE WHEN is_nullable = 'YES' THEN true ELSE false END,
                ordinal_position::int4
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = client
            .query(query, &[&schema, &table])
            .await
            .map_err(CopyError::source)?;

        if rows.is_empty() {
            return Err(CopyError::SchemaExtraction(format!(
                "table {}.{} not found on source or has no columns",
                schema, table
            )));
        }

        let columns: Vec<Column> = rows
            .iter()
            .map(|row| Column {
                name: row.get::<_, String>(0),
                data_type: row.get::<_, String>(1),
                max_length: row.get::<_, i32>(2),
                precision: row.get::<_, i32>(3),
                scale: row.get::<_, i32>(4),
                is_nullable: row.get::<_, bool>(5),
                ordinal_pos: row.get::<_, i32>(6),
            })
            .collect();

        // Planner estimate is enough for the start-of-run log line.
        let estimate_query = r#"
            SELECT COALESCE(c.reltuples, 0)::int8
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
        "#;
        let row_count = client
            .query_opt(estimate_query, &[&schema, &table])
            .await
            .map_err(CopyError::source)?
            .map(|row| row.get::<_, i64>(0))
            .unwrap_or(0);

        let table = Table {
            schema: schema.to_string(),
            name: table.to_string(),
            columns,
            row_count,
        };

        debug!(
            "Loaded {} columns for {} (~{} rows)",
            table.columns.len(),
            table.full_name(),
            table.row_count
        );
        Ok(table)
    }

    async fn fetch_page(
        &self,
        table: &Table,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Vec<SqlValue>>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting source connection for fetch_page"))?;

        let sql = build_page_query(table, limit, offset);
        let rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(CopyError::source)?;

        let mut page = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(table.columns.len());
            for (idx, col) in table.columns.iter().enumerate() {
                values.push(convert_row_value(&row, idx, &col.data_type));
            }
            page.push(values);
        }

        debug!(
            "Fetched {} rows from {} at offset {}",
            page.len(),
            table.full_name(),
            offset
        );
        Ok(page)
    }

    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting source connection for get_row_count"))?;

        let sql = format!(
            "SELECT COUNT(*)::int8 FROM {}.{}",
            quote_ident(schema),
            quote_ident(table)
        );

        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(CopyError::source)?;
        Ok(row.get::<_, i64>(0))
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "testing source connection"))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(CopyError::source)?;
        info!("Source connection OK");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Build the paging query for one fetch. No ORDER BY: row order is whatever
/// the source returns for a given offset, which is stable only if the table
/// is not concurrently modified.
pub(crate) fn build_page_query(table: &Table, limit: usize, offset: i64) -> String {
    let cols: String = table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT {} FROM {}.{} LIMIT {} OFFSET {}",
        cols,
        quote_ident(&table.schema),
        quote_ident(&table.name),
        limit,
        offset
    )
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert one cell of a fetched row to SqlValue based on the declared
/// column type. NULLs and unconvertible values both map to Null.
fn convert_row_value(row: &tokio_postgres::Row, idx: usize, data_type: &str) -> SqlValue {
    let dt = data_type.to_lowercase();

    match dt.as_str() {
        "bool" | "boolean" => row
            .try_get::<_, bool>(idx)
            .ok()
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        "int2" | "smallint" => row
            .try_get::<_, i16>(idx)
            .ok()
            .map(SqlValue::I16)
            .unwrap_or(SqlValue::Null),
        "int4" | "integer" | "int" => row
            .try_get::<_, i32>(idx)
            .ok()
            .map(SqlValue::I32)
            .unwrap_or(SqlValue::Null),
        "int8" | "bigint" => row
            .try_get::<_, i64>(idx)
            .ok()
            .map(SqlValue::I64)
            .unwrap_or(SqlValue::Null),
        "float4" | "real" => row
            .try_get::<_, f32>(idx)
            .ok()
            .map(SqlValue::F32)
            .unwrap_or(SqlValue::Null),
        "float8" | "double precision" => row
            .try_get::<_, f64>(idx)
            .ok()
            .map(SqlValue::F64)
            .unwrap_or(SqlValue::Null),
        "uuid" => row
            .try_get::<_, uuid::Uuid>(idx)
            .ok()
            .map(SqlValue::Uuid)
            .unwrap_or(SqlValue::Null),
        "numeric" | "decimal" => row
            .try_get::<_, rust_decimal::Decimal>(idx)
            .ok()
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null),
        "timestamp" | "timestamp without time zone" => row
            .try_get::<_, chrono::NaiveDateTime>(idx)
            .ok()
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null),
        "timestamptz" | "timestamp with time zone" => row
            .try_get::<_, chrono::DateTime<chrono::FixedOffset>>(idx)
            .ok()
            .map(SqlValue::DateTimeOffset)
            .unwrap_or(SqlValue::Null),
        "date" => row
            .try_get::<_, chrono::NaiveDate>(idx)
            .ok()
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null),
        "time" | "time without time zone" => row
            .try_get::<_, chrono::NaiveTime>(idx)
            .ok()
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null),
        "bytea" => row
            .try_get::<_, Vec<u8>>(idx)
            .ok()
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null),
        "json" | "jsonb" => row
            .try_get::<_, serde_json::Value>(idx)
            .ok()
            .map(|v| SqlValue::String(v.to_string()))
            .unwrap_or(SqlValue::Null),
        _ => row
            .try_get::<_, String>(idx)
            .ok()
            .map(SqlValue::String)
            .unwrap_or(SqlValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table {
            schema: "public".to_string(),
            name: "jobs".to_string(),
            columns: vec![
                Column {
                    name: "id".to_string(),
                    data_type: "int8".to_string(),
                    max_length: 0,
                    precision: 0,
                    scale: 0,
                    is_nullable: false,
                    ordinal_pos: 1,
                },
                Column {
                    name: "title".to_string(),
                    data_type: "varchar".to_string(),
                    max_length: 255,
                    precision: 0,
                    scale: 0,
                    is_nullable: true,
                    ordinal_pos: 2,
                },
            ],
            row_count: 0,
        }
    }

    #[test]
    fn test_build_page_query() {
        let table = sample_table();
        assert_eq!(
            build_page_query(&table, 5000, 0),
            "SELECT \"id\", \"title\" FROM \"public\".\"jobs\" LIMIT 5000 OFFSET 0"
        );
        assert_eq!(
            build_page_query(&table, 5000, 10000),
            "SELECT \"id\", \"title\" FROM \"public\".\"jobs\" LIMIT 5000 OFFSET 10000"
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_table().full_name(), "public.jobs");
    }
}
