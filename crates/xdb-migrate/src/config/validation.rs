//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::access::ValueCodec;
use crate::core::DialectResolver;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let resolver = DialectResolver::with_builtins();

    if let Some(source) = &config.source {
        validate_connection("source", source, &resolver)?;
    }
    if let Some(target) = &config.target {
        validate_connection("target", target, &resolver)?;
    }

    // Schema validation
    resolver.require(&config.schema.dialect)?;
    if config.schema.object_types.is_empty() {
        return Err(MigrateError::Config(
            "schema.object_types must not be empty".into(),
        ));
    }
    if config.schema.script_kinds.is_empty() {
        return Err(MigrateError::Config(
            "schema.script_kinds must not be empty".into(),
        ));
    }
    for spec in &config.schema.type_specs {
        if spec.template.trim().is_empty() {
            return Err(MigrateError::Config(format!(
                "schema.type_specs entry for type code {} has an empty template",
                spec.type_code
            )));
        }
    }

    // Dump validation
    if config.dump.threads == 0 {
        return Err(MigrateError::Config("dump.threads must be at least 1".into()));
    }
    if config.dump.buffer_size == 0 {
        return Err(MigrateError::Config(
            "dump.buffer_size must be at least 1".into(),
        ));
    }
    if let Some(0) = config.dump.max_size {
        return Err(MigrateError::Config("dump.max_size must be at least 1".into()));
    }
    ValueCodec::for_zone(&config.dump.time_zone)?;

    // Load validation
    if config.load.threads == 0 {
        return Err(MigrateError::Config("load.threads must be at least 1".into()));
    }
    if config.load.batch_size == 0 {
        return Err(MigrateError::Config(
            "load.batch_size must be at least 1".into(),
        ));
    }
    ValueCodec::for_zone(&config.load.time_zone)?;

    Ok(())
}

fn validate_connection(
    section: &str,
    connection: &ConnectionConfig,
    resolver: &DialectResolver,
) -> Result<()> {
    if connection.host.is_empty() {
        return Err(MigrateError::Config(format!("{}.host is required", section)));
    }
    if connection.database.is_empty() {
        return Err(MigrateError::Config(format!(
            "{}.database is required",
            section
        )));
    }
    if connection.user.is_empty() {
        return Err(MigrateError::Config(format!("{}.user is required", section)));
    }
    resolver.require(&connection.dialect)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::SslMode;

    fn connection() -> ConnectionConfig {
        ConnectionConfig {
            dialect: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "target_db".to_string(),
            user: "postgres".to_string(),
            password: "password".to_string(),
            catalog: None,
            schema: Some("public".to_string()),
            ssl_mode: SslMode::Disable,
        }
    }

    fn valid_config() -> Config {
        Config {
            target: Some(connection()),
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_target_host() {
        let mut config = valid_config();
        if let Some(target) = config.target.as_mut() {
            target.host = String::new();
        }
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("target.host"));
    }

    #[test]
    fn test_unknown_dialect() {
        let mut config = valid_config();
        config.schema.dialect = "oracle".to_string();
        assert!(matches!(validate(&config), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = valid_config();
        config.load.threads = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_time_zone_rejected() {
        let mut config = valid_config();
        config.dump.time_zone = "Mars/Olympus".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_debug_redacts_password() {
        let mut connection = connection();
        connection.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", connection);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_456"));
    }
}
