//! Configuration validation.

use super::Config;
use crate::error::{CopyError, Result};

const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_db(&config.source, "source")?;
    validate_db(&config.target, "target")?;

    // Cannot copy a table onto itself: the inserts would grow the table
    // while the offset cursor is still paging through it.
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.dbname == config.target.dbname
    {
        return Err(CopyError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    if config.copy.table.is_empty() {
        return Err(CopyError::Config("copy.table is required".into()));
    }
    if config.copy.schema.is_empty() {
        return Err(CopyError::Config("copy.schema must not be empty".into()));
    }
    if config.copy.batch_size == 0 {
        return Err(CopyError::Config(
            "copy.batch_size must be at least 1".into(),
        ));
    }

    Ok(())
}

fn validate_db(db: &super::DbConfig, which: &str) -> Result<()> {
    if db.host.is_empty() {
        return Err(CopyError::Config(format!("{}.host is required", which)));
    }
    if db.dbname.is_empty() {
        return Err(CopyError::Config(format!("{}.dbname is required", which)));
    }
    if db.user.is_empty() {
        return Err(CopyError::Config(format!("{}.user is required", which)));
    }
    if !SSL_MODES.contains(&db.ssl_mode.to_lowercase().as_str()) {
        return Err(CopyError::Config(format!(
            "{}.ssl_mode '{}' is invalid. Valid options: disable, require, verify-ca, verify-full",
            which, db.ssl_mode
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CopyConfig, DbConfig, InsertErrorPolicy};

    fn db(host: &str, dbname: &str) -> DbConfig {
        DbConfig {
            host: host.to_string(),
            port: 5432,
            dbname: dbname.to_string(),
            user: "postgres".to_string(),
            password: "password".to_string(),
            ssl_mode: "disable".to_string(),
        }
    }

    fn valid_config() -> Config {
        Config {
            source: db("src.example.com", "source_db"),
            target: db("tgt.example.com", "target_db"),
            copy: CopyConfig {
                schema: "public".to_string(),
                table: "jobs".to_string(),
                batch_size: 5000,
                on_insert_error: InsertErrorPolicy::Continue,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_table() {
        let mut config = valid_config();
        config.copy.table = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid_config();
        config.copy.batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.target.ssl_mode = "maybe".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config = valid_config();
        config.target = config.source.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_same_host_different_dbname_allowed() {
        let mut config = valid_config();
        config.target = db("src.example.com", "other_db");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_db_config_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
