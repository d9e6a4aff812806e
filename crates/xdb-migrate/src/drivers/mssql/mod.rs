//! Microsoft SQL Server driver.
//!
//! Provides [`MssqlDialect`] for script generation and load statements.

mod dialect;

pub use dialect::MssqlDialect;
