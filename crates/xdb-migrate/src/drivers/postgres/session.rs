//! PostgreSQL sessions on a deadpool-postgres pool.
//!
//! Each [`PgSession`] owns one pooled client until it is dropped, which
//! returns the client to the pool on every exit path. Server notices raised
//! by a statement come back from [`Session::execute`] as warnings.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use futures::{StreamExt, TryStreamExt};
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info};

use super::notice::{NoticeConnect, NoticeMailbox, NoticeMailboxes};

use crate::access::RowCursor;
use crate::config::ConnectionConfig;
use crate::core::traits::{RowStream, Session, SessionFactory, SqlWarning};
use crate::core::value::{Lob, LobKind, Value, ValueClass};
use crate::error::{MigrateError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Hands out pooled PostgreSQL sessions.
pub struct PgSessionFactory {
    pool: Pool,
    mailboxes: NoticeMailboxes,
}

impl PgSessionFactory {
    /// Build a pool of at most `max_size` connections and test it.
    pub async fn connect(config: &ConnectionConfig, max_size: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.keepalives(true);
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mailboxes = NoticeMailboxes::default();
        let mgr = match config.ssl_mode.connector() {
            Some(tls) => Manager::from_connect(
                pg_config,
                NoticeConnect::new(tls, mailboxes.clone()),
                mgr_config,
            ),
            None => Manager::from_connect(
                pg_config,
                NoticeConnect::new(tokio_postgres::NoTls, mailboxes.clone()),
                mgr_config,
            ),
        };
        let pool = Pool::builder(mgr)
            .max_size(max_size.max(1))
            .build()
            .map_err(|e| MigrateError::pool(e.to_string(), "creating PostgreSQL pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e.to_string(), "testing PostgreSQL connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );
        Ok(Self { pool, mailboxes })
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e.to_string(), "getting PostgreSQL connection"))?;
        let row = client.query_one("SELECT pg_backend_pid()", &[]).await?;
        let notices = self.mailboxes.get(row.get(0));
        Ok(Box::new(PgSession { client, notices }))
    }
}

pub struct PgSession {
    client: Object,
    notices: NoticeMailbox,
}

#[async_trait]
impl Session for PgSession {
    fn dialect_name(&self) -> &str {
        "postgres"
    }

    async fn execute(&mut self, sql: &str) -> Result<Vec<SqlWarning>> {
        // Drop notices left over from earlier work on this connection
        self.notices.drain();
        self.client.batch_execute(sql).await?;
        // Notices precede ReadyForQuery and are pushed before the reply lands
        let warnings = self.notices.drain();
        if !warnings.is_empty() {
            debug!("Statement raised {} notice(s)", warnings.len());
        }
        Ok(warnings)
    }

    async fn execute_batch(&mut self, sql: &str, rows: Vec<Vec<Value>>) -> Result<u64> {
        let tx = self.client.transaction().await?;
        let statement = tx.prepare(sql).await?;

        let mut written = 0u64;
        for row in &rows {
            let params: Vec<PgParam<'_>> = row.iter().map(PgParam).collect();
            let refs: Vec<&(dyn ToSql + Sync)> =
                params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
            written += tx.execute(&statement, &refs).await?;
        }
        tx.commit().await?;

        debug!("Wrote batch of {} rows", rows.len());
        Ok(written)
    }

    async fn query(&mut self, sql: &str) -> Result<RowStream> {
        let no_params: [&(dyn ToSql + Sync); 0] = [];
        let rows = self.client.query_raw(sql, no_params).await?;
        // The row stream borrows nothing from the client, so it can outlive it
        Ok(rows
            .map_ok(|row| Box::new(PgRow { row }) as Box<dyn RowCursor>)
            .map_err(MigrateError::from)
            .boxed())
    }
}

/// One row of a PostgreSQL result set.
struct PgRow {
    row: tokio_postgres::Row,
}

impl PgRow {
    fn column_type(&self, column: usize) -> Result<&Type> {
        self.row
            .columns()
            .get(column)
            .map(|c| c.type_())
            .ok_or_else(|| MigrateError::State(format!("column {} out of range", column + 1)))
    }

    fn try_get<'a, T: tokio_postgres::types::FromSql<'a>>(
        &'a self,
        column: usize,
    ) -> Result<Option<T>> {
        Ok(self.row.try_get::<_, Option<T>>(column)?)
    }
}

impl RowCursor for PgRow {
    fn column_count(&self) -> usize {
        self.row.len()
    }

    fn get(&self, column: usize, class: ValueClass) -> Result<Value> {
        let ty = self.column_type(column)?;
        let is_json = *ty == Type::JSON || *ty == Type::JSONB;

        let value = match class {
            ValueClass::Bool => self.try_get(column)?.map(Value::Bool),
            ValueClass::I16 => self.try_get(column)?.map(Value::I16),
            ValueClass::I32 => self.try_get(column)?.map(Value::I32),
            ValueClass::I64 => self.try_get(column)?.map(Value::I64),
            ValueClass::F32 => self.try_get(column)?.map(Value::F32),
            ValueClass::F64 => self.try_get(column)?.map(Value::F64),
            ValueClass::Decimal => self.try_get(column)?.map(Value::Decimal),
            ValueClass::Text if is_json => self
                .try_get::<serde_json::Value>(column)?
                .map(|j| Value::Text(j.to_string())),
            ValueClass::Text => self.try_get(column)?.map(Value::Text),
            ValueClass::Bytes => self.try_get(column)?.map(Value::Bytes),
            ValueClass::Lob if *ty == Type::BYTEA => self
                .try_get::<Vec<u8>>(column)?
                .map(|b| Value::Lob(Lob::binary(b))),
            ValueClass::Lob => self
                .try_get::<String>(column)?
                .map(|s| Value::Lob(Lob::character(s))),
            ValueClass::Uuid => self.try_get(column)?.map(Value::Uuid),
            ValueClass::Date => self.try_get(column)?.map(Value::Date),
            ValueClass::Time => self.try_get(column)?.map(Value::Time),
            ValueClass::Timestamp => self.try_get(column)?.map(Value::Timestamp),
            ValueClass::TimestampTz => self
                .try_get::<chrono::DateTime<chrono::Utc>>(column)?
                .map(|t| Value::TimestampTz(t.into())),
        };
        Ok(value.unwrap_or(Value::Null(class)))
    }
}

/// Binds a [`Value`] to whatever parameter type the server inferred.
#[derive(Debug)]
struct PgParam<'a>(&'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null(_) => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            // Integers are widened or narrowed to the column's width
            Value::I16(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I32(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I64(v) => int_to_sql(*v, ty, out),
            Value::F32(v) if *ty == Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
            Value::F32(v) => v.to_sql(ty, out),
            Value::F64(v) => v.to_sql(ty, out),
            Value::Decimal(v) => v.to_sql(ty, out),
            Value::Text(v) if *ty == Type::JSON || *ty == Type::JSONB => {
                serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
            }
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Lob(lob) => match lob.kind {
                LobKind::Binary => (&lob.data[..]).to_sql(ty, out),
                LobKind::Character => std::str::from_utf8(&lob.data)?.to_sql(ty, out),
            },
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Time(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn int_to_sql(
    v: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        _ => v.to_sql(ty, out),
    }
}
