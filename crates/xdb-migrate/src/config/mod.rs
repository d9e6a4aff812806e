//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::core::DialectResolver;
use crate::error::Result;
use crate::generator::{InsertType, ScriptGeneratorContext};
use sha2::{Digest, Sha256};
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

    /// Compute a SHA256 hash of the configuration, recorded in backups.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl SchemaConfig {
    /// Build a generator context for the configured dialect.
    pub fn context(&self, resolver: &DialectResolver) -> Result<ScriptGeneratorContext> {
        let mut ctx = ScriptGeneratorContext::new(resolver.require(&self.dialect)?)
            .with_object_types(self.object_types.iter().copied())
            .with_script_kinds(self.script_kinds.iter().copied());
        ctx.quoting = self.quoting;
        ctx.normalizer = self.normalizer;
        ctx.group_scripts_by = self.group_scripts_by;
        ctx.qualify_names = self.qualify_names;
        ctx.source_catalog = self.source_catalog.clone();
        ctx.source_schema = self.source_schema.clone();
        ctx.target_catalog = self.target_catalog.clone();
        ctx.target_schema = self.target_schema.clone();
        for spec in &self.type_specs {
            ctx.add_type_spec(spec);
        }
        Ok(ctx)
    }
}

impl LoadConfig {
    /// Insert type for a table, by bare name.
    pub fn insert_type_for(&self, table: &str) -> InsertType {
        self.table_insert_types
            .get(table)
            .copied()
            .unwrap_or(self.insert_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::format::FormatKind;
    use crate::core::IdentifierQuoting;
    use crate::generator::{ObjectType, ScriptKind};

    const SAMPLE: &str = r#"
target:
  host: localhost
  database: shop
  user: loader
  password: secret
  schema: public
  ssl_mode: verify-full
schema:
  dialect: postgresql
  quoting: minimal
  object_types: [table, column, primary_key]
  script_kinds: [drop, create]
  qualify_names: false
  type_specs:
    - type_code: -1
      template: VARCHAR(4000)
dump:
  format: text
  max_size: 1048576
load:
  threads: 8
  insert_type: replace
  table_insert_types:
    audit: insert
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let target = config.target.as_ref().unwrap();
        assert_eq!(target.port, 5432);
        assert_eq!(target.dialect, "postgres");
        assert_eq!(config.dump.format, FormatKind::Text);
        assert_eq!(config.dump.threads, 4);
        assert_eq!(config.load.threads, 8);
        assert_eq!(config.load.batch_size, 1000);
        assert!(config.schema.fail_on_empty_scripts);
        assert!(config.source.is_none());
    }

    #[test]
    fn test_schema_context() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let ctx = config
            .schema
            .context(&DialectResolver::with_builtins())
            .unwrap();
        assert_eq!(ctx.dialect().name(), "postgres");
        assert_eq!(ctx.quoting, IdentifierQuoting::Minimal);
        assert!(ctx.is_requested(ObjectType::PrimaryKey));
        assert!(!ctx.is_requested(ObjectType::ForeignKey));
        assert!(ctx.wants(ScriptKind::Drop));
        assert!(!ctx.qualify_names);
    }

    #[test]
    fn test_insert_type_overrides() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.load.insert_type_for("orders"), InsertType::Replace);
        assert_eq!(config.load.insert_type_for("audit"), InsertType::Insert);
    }

    #[test]
    fn test_hash_is_stable() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.hash(), config.hash());
        assert_eq!(config.hash().len(), 64);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Config::from_yaml("load: [not, a, map]").is_err());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.schema.object_types.len(), ObjectType::ALL.len());
    }
}
