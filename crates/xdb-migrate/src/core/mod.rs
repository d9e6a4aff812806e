//! Core abstractions shared by generation, dump and load.
//!
//! - [`schema`]: catalog, schema, table, column and constraint metadata
//! - [`types`]: declared column types (type code plus type name)
//! - [`value`]: neutral value representation
//! - [`identifier`]: identifier validation, quoting policy and normalization
//! - [`traits`]: dialect and session traits
//! - [`catalog`]: dialect resolver for dependency injection
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` captures per-engine SQL syntax
//! - **Template Method**: default trait methods define the common behavior
//!   that dialects override only where their engine differs

pub mod catalog;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::DialectResolver;
pub use identifier::{IdentifierCase, IdentifierNormalizer, IdentifierQuoting};
pub use schema::{
    Catalog, Check, Column, Database, DatabaseInfo, ForeignKey, Index, PrimaryKey,
    ReferentialAction, Schema, Table, TableRef,
};
pub use traits::{
    Dialect, DropForeignKeySyntax, RowStream, Session, SessionFactory, SqlWarning,
};
pub use types::TypeDesc;
pub use value::{Lob, LobKind, Value, ValueClass};
