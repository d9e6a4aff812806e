//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PgSessionFactory`]: pooled sessions on deadpool-postgres
//! - [`PgSession`]: one pooled connection owned by a worker
//! - notice capture: server notices collected per connection

mod dialect;
mod notice;
mod session;
mod tls;

pub use dialect::PostgresDialect;
pub use session::{PgSession, PgSessionFactory};
pub use tls::SslMode;
