//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
source:
  host: src.example.com
  dbname: source_db
  user: postgres
  password: secret
target:
  host: tgt.example.com
  dbname: target_db
  user: postgres
  password: secret
copy:
  table: job_postings
"#;

    #[test]
    fn test_minimal_yaml_applies_defaults() {
        let config = Config::from_yaml(MINIMAL_YAML).unwrap();
        assert_eq!(config.source.port, 5432);
        assert_eq!(config.source.ssl_mode, "require");
        assert_eq!(config.copy.schema, "public");
        assert_eq!(config.copy.table, "job_postings");
        assert_eq!(config.copy.batch_size, 5000);
        assert_eq!(config.copy.on_insert_error, InsertErrorPolicy::Continue);
    }

    #[test]
    fn test_explicit_policy_parses() {
        let yaml = MINIMAL_YAML.replace(
            "  table: job_postings",
            "  table: job_postings\n  batch_size: 1000\n  on_insert_error: abort",
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.copy.batch_size, 1000);
        assert_eq!(config.copy.on_insert_error, InsertErrorPolicy::Abort);
    }

    #[test]
    fn test_missing_table_is_yaml_error() {
        let yaml = MINIMAL_YAML.replace("  table: job_postings", "  batch_size: 100");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Config::from_yaml("source: [").is_err());
    }
}
