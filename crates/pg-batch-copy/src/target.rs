//! Target database operations: table creation and batch appends.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{CopyError, Result};
use crate::source::Table;
use crate::typemap::target_ddl_type;

/// SQL value enum for type-safe row handling between fetch and insert.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Decimal(rust_decimal::Decimal),
    DateTime(chrono::NaiveDateTime),
    DateTimeOffset(chrono::DateTime<chrono::FixedOffset>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
}

/// Write operations against the target database.
#[async_trait]
pub trait TargetPool: Send + Sync {
    /// Check if a table exists.
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// Create a table from source metadata with mapped column types.
    async fn create_table(&self, table: &Table, target_schema: &str) -> Result<()>;

    /// Append a batch of rows with a single multi-row INSERT. No conflict
    /// handling: duplicates are neither detected nor rejected here.
    async fn insert_batch(
        &self,
        schema: &str,
        table: &str,
        cols: &[String],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64>;

    /// Get the exact row count for a table.
    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// Run a trivial query to verify connectivity.
    async fn test_connection(&self) -> Result<()>;

    /// Close the connection pool.
    async fn close(&self);
}

/// PostgreSQL target pool implementation.
pub struct PgTargetPool {
    pool: Pool,
}

impl PgTargetPool {
    /// Create a target pool from connection settings. Connections are opened
    /// lazily on first use.
    pub fn connect(config: &DbConfig) -> Result<Self> {
        let pool = crate::pool::build_pool(config, "target")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TargetPool for PgTargetPool {
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting target connection for table_exists"))?;

        let row = client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.tables
                    WHERE table_schema = $1 AND table_name = $2
                )",
                &[&schema, &table],
            )
            .await
            .map_err(CopyError::target)?;

        Ok(row.get(0))
    }

    async fn create_table(&self, table: &Table, target_schema: &str) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting target connection for create_table"))?;

        let ddl = generate_ddl(table, target_schema);
        client
            .execute(ddl.as_str(), &[])
            .await
            .map_err(CopyError::target)?;

        info!("Created target table {}.{}", target_schema, table.name);
        Ok(())
    }

    async fn insert_batch(
        &self,
        schema: &str,
        table: &str,
        cols: &[String],
        rows: Vec<Vec<SqlValue>>,
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting target connection for insert_batch"))?;

        let row_count = rows.len() as u64;
        let sql = build_insert_sql(schema, table, cols, &rows);

        client
            .simple_query(&sql)
            .await
            .map_err(|e| CopyError::insert(format!("{}.{}", schema, table), e.to_string()))?;

        debug!("Appended {} rows to {}.{}", row_count, schema, table);
        Ok(row_count)
    }

    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "getting target connection for get_row_count"))?;

        let sql = format!(
            "SELECT COUNT(*)::int8 FROM {}.{}",
            quote_ident(schema),
            quote_ident(table)
        );

        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(CopyError::target)?;
        Ok(row.get::<_, i64>(0))
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| CopyError::pool(e, "testing target connection"))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(CopyError::target)?;
        info!("Target connection OK");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
    }
}

/// Generate CREATE TABLE DDL from source metadata. Column types come from
/// the explicit type mapping, never from row values.
pub(crate) fn generate_ddl(table: &Table, target_schema: &str) -> String {
    let cols: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            let pg_type = target_ddl_type(&col.data_type, col.max_length, col.precision, col.scale);
            let nullable = if col.is_nullable { "" } else { " NOT NULL" };
            format!("    {} {}{}", quote_ident(&col.name), pg_type, nullable)
        })
        .collect();

    format!(
        "CREATE TABLE {}.{} (\n{}\n)",
        quote_ident(target_schema),
        quote_ident(&table.name),
        cols.join(",\n")
    )
}

/// Build a multi-row INSERT with literal values.
pub(crate) fn build_insert_sql(
    schema: &str,
    table: &str,
    cols: &[String],
    rows: &[Vec<SqlValue>],
) -> String {
    let col_list: String = cols
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let value_rows: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(sql_value_to_literal).collect();
            format!("({})", values.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {}.{} ({}) VALUES {}",
        quote_ident(schema),
        quote_ident(table),
        col_list,
        value_rows.join(", ")
    )
}

/// Quote a PostgreSQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a string for SQL literal use.
fn escape_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Spell out a non-finite float; PostgreSQL only accepts the quoted forms.
fn non_finite_literal(is_nan: bool, is_positive: bool, cast: &str) -> String {
    if is_nan {
        format!("'NaN'{}", cast)
    } else if is_positive {
        format!("'Infinity'{}", cast)
    } else {
        format!("'-Infinity'{}", cast)
    }
}

/// Convert SqlValue to a SQL literal string.
fn sql_value_to_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        SqlValue::I16(n) => n.to_string(),
        SqlValue::I32(n) => n.to_string(),
        SqlValue::I64(n) => n.to_string(),
        SqlValue::F32(n) => {
            if n.is_finite() {
                n.to_string()
            } else {
                non_finite_literal(n.is_nan(), n.is_sign_positive(), "::real")
            }
        }
        SqlValue::F64(n) => {
            if n.is_finite() {
                n.to_string()
            } else {
                non_finite_literal(n.is_nan(), n.is_sign_positive(), "::float8")
            }
        }
        SqlValue::String(s) => format!("'{}'", escape_sql_string(s)),
        SqlValue::Bytes(b) => format!("'\\x{}'::bytea", hex::encode(b)),
        SqlValue::Uuid(u) => format!("'{}'::uuid", u),
        SqlValue::Decimal(d) => format!("{}::numeric", d),
        SqlValue::DateTime(dt) => format!("'{}'::timestamp", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        SqlValue::DateTimeOffset(dt) => format!("'{}'::timestamptz", dt.to_rfc3339()),
        SqlValue::Date(d) => format!("'{}'::date", d),
        SqlValue::Time(t) => format!("'{}'::time", t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Column;

    fn col(name: &str, data_type: &str, max_length: i32, is_nullable: bool) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            max_length,
            precision: 0,
            scale: 0,
            is_nullable,
            ordinal_pos: 0,
        }
    }

    #[test]
    fn test_escape_sql_string() {
        assert_eq!(escape_sql_string("plain"), "plain");
        assert_eq!(escape_sql_string("O'Brien"), "O''Brien");
    }

    #[test]
    fn test_sql_value_literals() {
        assert_eq!(sql_value_to_literal(&SqlValue::Null), "NULL");
        assert_eq!(sql_value_to_literal(&SqlValue::Bool(true)), "TRUE");
        assert_eq!(sql_value_to_literal(&SqlValue::I64(42)), "42");
        assert_eq!(
            sql_value_to_literal(&SqlValue::String("it's".to_string())),
            "'it''s'"
        );
        assert_eq!(
            sql_value_to_literal(&SqlValue::Bytes(vec![0xde, 0xad])),
            "'\\xdead'::bytea"
        );
    }

    #[test]
    fn test_non_finite_float_literals() {
        assert_eq!(sql_value_to_literal(&SqlValue::F64(1.5)), "1.5");
        assert_eq!(
            sql_value_to_literal(&SqlValue::F64(f64::NAN)),
            "'NaN'::float8"
        );
        assert_eq!(
            sql_value_to_literal(&SqlValue::F64(f64::NEG_INFINITY)),
            "'-Infinity'::float8"
        );
    }

    #[test]
    fn test_build_insert_sql() {
        let cols = vec!["id".to_string(), "title".to_string()];
        let rows = vec![
            vec![SqlValue::I64(1), SqlValue::String("a".to_string())],
            vec![SqlValue::I64(2), SqlValue::Null],
        ];
        assert_eq!(
            build_insert_sql("public", "jobs", &cols, &rows),
            "INSERT INTO \"public\".\"jobs\" (\"id\", \"title\") VALUES (1, 'a'), (2, NULL)"
        );
    }

    #[test]
    fn test_generate_ddl() {
        let table = Table {
            schema: "public".to_string(),
            name: "jobs".to_string(),
            columns: vec![
                col("id", "int8", 0, false),
                col("title", "varchar", 255, true),
            ],
            row_count: 0,
        };
        assert_eq!(
            generate_ddl(&table, "public"),
            "CREATE TABLE \"public\".\"jobs\" (\n    \"id\" bigint NOT NULL,\n    \"title\" varchar(255)\n)"
        );
    }
}
