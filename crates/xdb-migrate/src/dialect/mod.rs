//! Dialect support shared by all database families.
//!
//! Each family in [`crate::drivers`] owns a [`TypeNameMap`] that renders
//! declared column types as DDL type names. User overrides are layered on
//! top of the built-in map by the script generator context.

mod typemap;

pub use typemap::{expand_template, TypeNameMap, TypeSpec};
