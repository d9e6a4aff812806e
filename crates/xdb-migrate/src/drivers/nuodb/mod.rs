//! NuoDB driver.
//!
//! Only the SQL dialect is provided; scripts for NuoDB are exported to
//! files or standard output.

mod dialect;

pub use dialect::NuodbDialect;
