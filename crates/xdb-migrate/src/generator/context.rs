//! Script generator context.
//!
//! Carries the target dialect, catalog/schema overrides for both sides,
//! identifier quoting and normalization, and the requested object types
//! and script kinds. A context is immutable during a generation call;
//! [`ScriptGeneratorContext::with_target`] derives a copy for names that
//! live in another namespace.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::identifier::{
    is_plain_identifier, validate_identifier, IdentifierNormalizer, IdentifierQuoting,
};
use crate::core::schema::{Column, Table, TableRef};
use crate::core::traits::Dialect;
use crate::dialect::{TypeNameMap, TypeSpec};
use crate::error::{MigrateError, Result};

/// Kind of schema object a script is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Table,
    Column,
    PrimaryKey,
    Index,
    ForeignKey,
    Check,
}

impl ObjectType {
    pub const ALL: [ObjectType; 6] = [
        ObjectType::Table,
        ObjectType::Column,
        ObjectType::PrimaryKey,
        ObjectType::Index,
        ObjectType::ForeignKey,
        ObjectType::Check,
    ];
}

/// Which statements are produced for requested objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Create,
    Drop,
}

/// Ordering of database-level create scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupScriptsBy {
    /// All tables, then all indexes, then all foreign keys.
    #[default]
    ObjectType,
    /// Each table followed by its indexes; foreign keys last.
    Table,
}

/// Settings for one generation call.
#[derive(Clone)]
pub struct ScriptGeneratorContext {
    dialect: Arc<dyn Dialect>,
    type_names: TypeNameMap,

    /// Only tables in this catalog are scripted.
    pub source_catalog: Option<String>,
    /// Only tables in this schema are scripted.
    pub source_schema: Option<String>,
    /// Catalog used to qualify generated names instead of the table's own.
    pub target_catalog: Option<String>,
    /// Schema used to qualify generated names instead of the table's own.
    pub target_schema: Option<String>,

    pub quoting: IdentifierQuoting,
    pub normalizer: IdentifierNormalizer,
    pub object_types: HashSet<ObjectType>,
    pub script_kinds: HashSet<ScriptKind>,
    pub group_scripts_by: GroupScriptsBy,

    /// Qualify table names with catalog and schema.
    pub qualify_names: bool,
}

impl fmt::Debug for ScriptGeneratorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptGeneratorContext")
            .field("dialect", &self.dialect.name())
            .field("source_catalog", &self.source_catalog)
            .field("source_schema", &self.source_schema)
            .field("target_catalog", &self.target_catalog)
            .field("target_schema", &self.target_schema)
            .field("quoting", &self.quoting)
            .field("normalizer", &self.normalizer)
            .field("qualify_names", &self.qualify_names)
            .finish()
    }
}

impl ScriptGeneratorContext {
    /// Context for `dialect` requesting create scripts for every object type.
    pub fn new(dialect: Arc<dyn Dialect>) -> Self {
        let type_names = dialect.type_names().clone();
        Self {
            dialect,
            type_names,
            source_catalog: None,
            source_schema: None,
            target_catalog: None,
            target_schema: None,
            quoting: IdentifierQuoting::default(),
            normalizer: IdentifierNormalizer::default(),
            object_types: ObjectType::ALL.into_iter().collect(),
            script_kinds: [ScriptKind::Create].into_iter().collect(),
            group_scripts_by: GroupScriptsBy::default(),
            qualify_names: true,
        }
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn dialect_arc(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }

    /// Override DDL type names for matching declared types.
    pub fn add_type_spec(&mut self, spec: &TypeSpec) {
        self.type_names.add_spec(spec);
    }

    pub fn with_object_types(mut self, types: impl IntoIterator<Item = ObjectType>) -> Self {
        self.object_types = types.into_iter().collect();
        self
    }

    pub fn with_script_kinds(mut self, kinds: impl IntoIterator<Item = ScriptKind>) -> Self {
        self.script_kinds = kinds.into_iter().collect();
        self
    }

    /// Derived context resolving names in another catalog and schema.
    pub fn with_target(&self, catalog: Option<&str>, schema: Option<&str>) -> Self {
        let mut derived = self.clone();
        derived.target_catalog = catalog.map(str::to_string);
        derived.target_schema = schema.map(str::to_string);
        derived
    }

    pub fn is_requested(&self, object_type: ObjectType) -> bool {
        self.object_types.contains(&object_type)
    }

    pub fn wants(&self, kind: ScriptKind) -> bool {
        self.script_kinds.contains(&kind)
    }

    /// Whether a table passes the source catalog/schema filter.
    pub fn includes_table(&self, table: &Table) -> bool {
        let matches = |filter: &Option<String>, value: &Option<String>| match filter {
            Some(f) => value.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(f)),
            None => true,
        };
        matches(&self.source_catalog, &table.catalog) && matches(&self.source_schema, &table.schema)
    }

    /// Render one identifier under the normalization and quoting policy.
    pub fn identifier(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        let name = self
            .normalizer
            .normalize(name, self.dialect.identifier_case());
        let quote = match self.quoting {
            IdentifierQuoting::Always => true,
            IdentifierQuoting::Never => false,
            IdentifierQuoting::Minimal => {
                !is_plain_identifier(&name) || self.dialect.is_reserved_word(&name)
            }
        };
        Ok(if quote {
            self.dialect.quote_ident(&name)
        } else {
            name
        })
    }

    /// Comma-separated list of rendered identifiers.
    pub fn identifiers(&self, names: &[String]) -> Result<String> {
        let rendered = names
            .iter()
            .map(|n| self.identifier(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join(", "))
    }

    /// Name of an object in a catalog and schema, qualified when enabled.
    ///
    /// The context's target catalog/schema take precedence over the
    /// object's own. Catalogs are only used by dialects that support them.
    pub fn qualified_name(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(3);
        if self.qualify_names {
            if self.dialect.supports_catalogs() {
                if let Some(catalog) = self.target_catalog.as_deref().or(catalog) {
                    parts.push(self.identifier(catalog)?);
                }
            }
            if let Some(schema) = self.target_schema.as_deref().or(schema) {
                parts.push(self.identifier(schema)?);
            }
        }
        parts.push(self.identifier(name)?);
        Ok(parts.join("."))
    }

    pub fn table_name(&self, table: &Table) -> Result<String> {
        self.qualified_name(table.catalog.as_deref(), table.schema.as_deref(), &table.name)
    }

    pub fn table_ref_name(&self, table: &TableRef) -> Result<String> {
        self.qualified_name(table.catalog.as_deref(), table.schema.as_deref(), &table.name)
    }

    /// DDL type of a column in the target dialect.
    ///
    /// Falls back to the declared type name when the dialect has no
    /// mapping for the type.
    pub fn column_type(&self, column: &Column) -> Result<String> {
        if let Some(name) = self.type_names.type_name(
            &column.type_desc,
            column.size,
            column.precision,
            column.scale,
        ) {
            return Ok(name);
        }
        column
            .type_desc
            .name
            .clone()
            .ok_or_else(|| MigrateError::TypeNotSupported(column.type_desc.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{codes, TypeDesc};
    use crate::drivers::{MssqlDialect, MysqlDialect, PostgresDialect};

    fn pg() -> ScriptGeneratorContext {
        ScriptGeneratorContext::new(Arc::new(PostgresDialect::new()))
    }

    #[test]
    fn test_identifier_quoting_policies() {
        let mut ctx = pg();
        assert_eq!(ctx.identifier("Users").unwrap(), "\"Users\"");

        ctx.quoting = IdentifierQuoting::Minimal;
        assert_eq!(ctx.identifier("users").unwrap(), "users");
        assert_eq!(ctx.identifier("order").unwrap(), "\"order\"");
        assert_eq!(ctx.identifier("my col").unwrap(), "\"my col\"");

        ctx.quoting = IdentifierQuoting::Never;
        ctx.normalizer = IdentifierNormalizer::Standard;
        assert_eq!(ctx.identifier("Users").unwrap(), "users");
    }

    #[test]
    fn test_qualified_name_uses_target_override() {
        let mut ctx = pg();
        assert_eq!(
            ctx.qualified_name(Some("db"), Some("app"), "t").unwrap(),
            "\"app\".\"t\""
        );
        ctx.target_schema = Some("archive".into());
        assert_eq!(
            ctx.qualified_name(None, Some("app"), "t").unwrap(),
            "\"archive\".\"t\""
        );
        ctx.qualify_names = false;
        assert_eq!(ctx.qualified_name(None, Some("app"), "t").unwrap(), "\"t\"");
    }

    #[test]
    fn test_catalog_qualification_depends_on_dialect() {
        let ctx = ScriptGeneratorContext::new(Arc::new(MssqlDialect::new()));
        assert_eq!(
            ctx.qualified_name(Some("sales"), Some("dbo"), "orders").unwrap(),
            "[sales].[dbo].[orders]"
        );
        let ctx = ScriptGeneratorContext::new(Arc::new(MysqlDialect::new()));
        assert_eq!(
            ctx.qualified_name(Some("sales"), None, "orders").unwrap(),
            "`sales`.`orders`"
        );
    }

    #[test]
    fn test_with_target_leaves_original_untouched() {
        let ctx = pg();
        let derived = ctx.with_target(None, Some("other"));
        assert_eq!(derived.target_schema.as_deref(), Some("other"));
        assert!(ctx.target_schema.is_none());
    }

    #[test]
    fn test_column_type_mapping_and_override() {
        let mut ctx = pg();
        let column = Column::new("n", TypeDesc::new(codes::LONGVARCHAR, "text"));
        assert_eq!(ctx.column_type(&column).unwrap(), "TEXT");

        ctx.add_type_spec(&TypeSpec {
            type_code: codes::LONGVARCHAR,
            type_name: None,
            template: "VARCHAR(4000)".into(),
        });
        assert_eq!(ctx.column_type(&column).unwrap(), "VARCHAR(4000)");

        let unknown = Column::new("g", TypeDesc::new(codes::OTHER, "geometry"));
        assert_eq!(ctx.column_type(&unknown).unwrap(), "geometry");
        let nameless = Column::new("x", TypeDesc::code(4242));
        assert!(ctx.column_type(&nameless).is_err());
    }

    #[test]
    fn test_source_filter() {
        let mut ctx = pg();
        ctx.source_schema = Some("app".into());
        assert!(ctx.includes_table(&Table::new("t").with_schema(None, Some("APP"))));
        assert!(!ctx.includes_table(&Table::new("t").with_schema(None, Some("audit"))));
        assert!(!ctx.includes_table(&Table::new("t")));
    }
}
