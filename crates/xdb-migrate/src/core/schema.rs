//! Schema object model: catalogs, schemas, tables, columns and constraints.
//!
//! The model is built once per run from introspected metadata and is
//! read-only afterwards. Tables carry their catalog and schema names so a
//! table (or a constraint paired with it) can be scripted on its own.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

use super::types::TypeDesc;

/// Identity of a table: catalog, schema and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(catalog: Option<&str>, schema: Option<&str>, name: &str) -> Self {
        Self {
            catalog: catalog.map(str::to_string),
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Whether both references live in the same catalog and schema.
    pub fn same_namespace(&self, other: &TableRef) -> bool {
        self.catalog == other.catalog && self.schema == other.schema
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        f.write_str(&self.name)
    }
}

/// Source database product information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub product_name: String,
    #[serde(default)]
    pub product_version: String,
    #[serde(default)]
    pub major_version: u32,
    #[serde(default)]
    pub minor_version: u32,
}

/// Root of the object model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub info: DatabaseInfo,
    #[serde(default)]
    pub catalogs: Vec<Catalog>,
}

/// A catalog (database in MySQL/MSSQL terms). Unnamed when the source has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,

    /// Non-primary key indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,

    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    /// Table-level check constraints.
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn with_schema(mut self, catalog: Option<&str>, schema: Option<&str>) -> Self {
        self.catalog = catalog.map(str::to_string);
        self.schema = schema.map(str::to_string);
        self
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    /// Get the dotted table name for logging.
    pub fn full_name(&self) -> String {
        self.table_ref().to_string()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check the ownership invariants of this table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(MigrateError::Schema(format!(
                    "table {} has duplicate column {}",
                    self.full_name(),
                    column.name
                )));
            }
        }

        if let Some(pk) = &self.primary_key {
            self.check_columns("primary key", &pk.columns)?;
        }
        for index in &self.indexes {
            self.check_columns(&format!("index {}", index.name), &index.columns)?;
        }
        for fk in &self.foreign_keys {
            self.check_columns("foreign key", &fk.columns)?;
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(MigrateError::Schema(format!(
                    "foreign key on {} has {} columns but references {}",
                    self.full_name(),
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
        }
        Ok(())
    }

    fn check_columns(&self, what: &str, columns: &[String]) -> Result<()> {
        if columns.is_empty() {
            return Err(MigrateError::Schema(format!(
                "{} on {} has no columns",
                what,
                self.full_name()
            )));
        }
        for name in columns {
            if self.column(name).is_none() {
                return Err(MigrateError::Schema(format!(
                    "{} on {} references unknown column {}",
                    what,
                    self.full_name(),
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// Declared type (type code plus database type name).
    #[serde(flatten)]
    pub type_desc: TypeDesc,

    /// Character length or binary size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Default value expression, emitted verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// Column-level check expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_desc: TypeDesc) -> Self {
        Self {
            name: name.into(),
            type_desc,
            size: None,
            precision: None,
            scale: None,
            nullable: true,
            default_value: None,
            check: None,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Referential action for ON UPDATE / ON DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Standard SQL keyword for this action.
    pub fn keyword(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// Foreign key owned by a table, possibly referencing another schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Columns on the owning table.
    pub columns: Vec<String>,

    pub referenced_table: TableRef,

    /// Columns on the referenced table, positionally paired with `columns`.
    pub referenced_columns: Vec<String>,

    #[serde(default)]
    pub on_update: ReferentialAction,

    #[serde(default)]
    pub on_delete: ReferentialAction,
}

/// Table-level check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub expression: String,
}

impl Database {
    /// Iterate all tables across catalogs and schemas.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.catalogs
            .iter()
            .flat_map(|c| c.schemas.iter())
            .flat_map(|s| s.tables.iter())
    }

    pub fn find_table(&self, table: &TableRef) -> Option<&Table> {
        self.tables().find(|t| t.table_ref() == *table)
    }

    /// Add a table, creating its catalog and schema entries as needed.
    pub fn add_table(&mut self, table: Table) {
        let catalog = match self.catalogs.iter().position(|c| c.name == table.catalog) {
            Some(i) => &mut self.catalogs[i],
            None => {
                self.catalogs.push(Catalog {
                    name: table.catalog.clone(),
                    schemas: Vec::new(),
                });
                let last = self.catalogs.len() - 1;
                &mut self.catalogs[last]
            }
        };
        let schema = match catalog.schemas.iter().position(|s| s.name == table.schema) {
            Some(i) => &mut catalog.schemas[i],
            None => {
                catalog.schemas.push(Schema {
                    name: table.schema.clone(),
                    tables: Vec::new(),
                });
                let last = catalog.schemas.len() - 1;
                &mut catalog.schemas[last]
            }
        };
        schema.tables.push(table);
    }

    /// Check model invariants: nesting consistency, column ownership,
    /// foreign key arity and reference resolution within the model.
    pub fn validate(&self) -> Result<()> {
        for catalog in &self.catalogs {
            for schema in &catalog.schemas {
                for table in &schema.tables {
                    if table.catalog != catalog.name || table.schema != schema.name {
                        return Err(MigrateError::Schema(format!(
                            "table {} is filed under the wrong catalog or schema",
                            table.full_name()
                        )));
                    }
                    table.validate()?;
                    for fk in &table.foreign_keys {
                        if let Some(target) = self.find_table(&fk.referenced_table) {
                            for column in &fk.referenced_columns {
                                if target.column(column).is_none() {
                                    return Err(MigrateError::Schema(format!(
                                        "foreign key on {} references unknown column {}.{}",
                                        table.full_name(),
                                        target.full_name(),
                                        column
                                    )));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::codes;

    fn int_column(name: &str) -> Column {
        Column::new(name, TypeDesc::new(codes::INTEGER, "INTEGER"))
    }

    fn parent_child() -> Database {
        let parent = Table::new("parent")
            .with_schema(None, Some("app"))
            .with_column(int_column("id"));
        let mut child = Table::new("child")
            .with_schema(None, Some("app"))
            .with_column(int_column("id"))
            .with_column(int_column("parent_id"));
        child.foreign_keys.push(ForeignKey {
            name: Some("fk_child_parent".into()),
            columns: vec!["parent_id".into()],
            referenced_table: parent.table_ref(),
            referenced_columns: vec!["id".into()],
            on_update: ReferentialAction::NoAction,
            on_delete: ReferentialAction::Cascade,
        });
        let mut db = Database::default();
        db.add_table(parent);
        db.add_table(child);
        db
    }

    #[test]
    fn test_add_table_builds_nesting() {
        let db = parent_child();
        assert_eq!(db.catalogs.len(), 1);
        assert_eq!(db.catalogs[0].schemas.len(), 1);
        assert_eq!(db.catalogs[0].schemas[0].tables.len(), 2);
        assert!(db.validate().is_ok());
    }

    #[test]
    fn test_fk_arity_mismatch_rejected() {
        let mut db = parent_child();
        db.catalogs[0].schemas[0].tables[1].foreign_keys[0]
            .referenced_columns
            .push("extra".into());
        let err = db.validate().unwrap_err();
        assert!(matches!(err, MigrateError::Schema(_)));
    }

    #[test]
    fn test_index_unknown_column_rejected() {
        let mut table = Table::new("t").with_column(int_column("a"));
        table.indexes.push(Index {
            name: "ix".into(),
            columns: vec!["b".into()],
            unique: false,
        });
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let table = Table::new("t")
            .with_column(int_column("a"))
            .with_column(int_column("a"));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_table_ref_display() {
        let r = TableRef::new(Some("db"), Some("app"), "users");
        assert_eq!(r.to_string(), "db.app.users");
        assert_eq!(TableRef::new(None, None, "t").to_string(), "t");
    }

    #[test]
    fn test_model_round_trips_through_json() {
        let db = parent_child();
        let json = serde_json::to_string(&db).unwrap();
        let back: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(back, db);
    }
}
