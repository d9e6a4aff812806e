//! Dialect resolver for explicit dependency injection.
//!
//! The [`DialectResolver`] maps dialect names and aliases to shared
//! [`Dialect`] strategies. It is constructed explicitly and handed to the
//! script generator and loader rather than living in global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::drivers::{AnsiDialect, MssqlDialect, MysqlDialect, NuodbDialect, PostgresDialect};
use crate::error::{MigrateError, Result};

use super::traits::Dialect;

/// Registry of dialects by name.
///
/// # Example
///
/// ```rust,ignore
/// let resolver = DialectResolver::with_builtins();
/// let dialect = resolver.require("postgresql")?;
/// assert_eq!(dialect.name(), "postgres");
/// ```
#[derive(Default)]
pub struct DialectResolver {
    dialects: HashMap<String, Arc<dyn Dialect>>,

    /// Alternative names mapped to a registered dialect name.
    aliases: HashMap<String, String>,
}

impl DialectResolver {
    /// Create a new empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with every built-in dialect and the usual aliases.
    pub fn with_builtins() -> Self {
        let mut resolver = Self::new();

        resolver.register(PostgresDialect::new());
        resolver.register(MysqlDialect::new());
        resolver.register(MssqlDialect::new());
        resolver.register(NuodbDialect::new());
        resolver.register(AnsiDialect::new());

        resolver.alias("postgresql", "postgres");
        resolver.alias("pg", "postgres");
        resolver.alias("mariadb", "mysql");
        resolver.alias("sqlserver", "mssql");
        resolver.alias("sql_server", "mssql");
        resolver.alias("sql2003", "ansi");

        resolver
    }

    /// Register a dialect under its own name.
    pub fn register(&mut self, dialect: impl Dialect + 'static) {
        self.register_arc(Arc::new(dialect));
    }

    /// Register a shared dialect under its own name.
    pub fn register_arc(&mut self, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(dialect.name().to_lowercase(), dialect);
    }

    /// Make `alias` resolve to the dialect registered as `name`.
    pub fn alias(&mut self, alias: impl Into<String>, name: impl Into<String>) {
        self.aliases
            .insert(alias.into().to_lowercase(), name.into().to_lowercase());
    }

    /// Get a dialect by name or alias (case-insensitive).
    pub fn get(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        let key = name.to_lowercase();
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.dialects.get(key).cloned()
    }

    /// Get a dialect by name, returning a configuration error if unknown.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Dialect>> {
        self.get(name).ok_or_else(|| {
            MigrateError::Config(format!(
                "Unknown database dialect: '{}'. Supported dialects: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Check if a dialect is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered dialect names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let resolver = DialectResolver::with_builtins();
        assert_eq!(
            resolver.names(),
            vec!["ansi", "mssql", "mysql", "nuodb", "postgres"]
        );
    }

    #[test]
    fn test_aliases_resolve() {
        let resolver = DialectResolver::with_builtins();
        assert_eq!(resolver.require("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(resolver.require("sqlserver").unwrap().name(), "mssql");
        assert_eq!(resolver.require("mariadb").unwrap().name(), "mysql");
    }

    #[test]
    fn test_unknown_dialect_is_config_error() {
        let resolver = DialectResolver::with_builtins();
        let err = resolver.require("oracle").err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_empty_resolver() {
        let resolver = DialectResolver::new();
        assert!(!resolver.contains("postgres"));
        assert!(resolver.names().is_empty());
    }
}
