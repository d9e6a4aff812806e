//! Server notices for pooled PostgreSQL connections.
//!
//! deadpool-postgres drives each connection on its own task and drops the
//! notices it receives. [`NoticeConnect`] drives the connection itself,
//! collecting `NOTICE`/`WARNING` messages into a mailbox registered under
//! the connection's backend pid. A session looks its mailbox up once when
//! it takes a client from the pool and drains it after every statement.

use std::collections::HashMap;
use std::sync::Arc;

use deadpool_postgres::Connect;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::error::DbError;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{AsyncMessage, Client, Config as PgConfig, Socket};
use tracing::{debug, warn};

use crate::core::traits::SqlWarning;

/// Notices received on one connection and not yet drained.
#[derive(Debug, Clone, Default)]
pub struct NoticeMailbox {
    notices: Arc<Mutex<Vec<SqlWarning>>>,
}

impl NoticeMailbox {
    pub fn push(&self, warning: SqlWarning) {
        self.notices.lock().push(warning);
    }

    /// Take every notice received so far.
    pub fn drain(&self) -> Vec<SqlWarning> {
        std::mem::take(&mut *self.notices.lock())
    }
}

/// Mailboxes of live connections keyed by backend pid.
#[derive(Debug, Clone, Default)]
pub struct NoticeMailboxes {
    by_pid: Arc<Mutex<HashMap<i32, NoticeMailbox>>>,
}

impl NoticeMailboxes {
    pub fn register(&self, pid: i32, mailbox: NoticeMailbox) {
        self.by_pid.lock().insert(pid, mailbox);
    }

    pub fn remove(&self, pid: i32) {
        self.by_pid.lock().remove(&pid);
    }

    /// Mailbox of a connection; an empty one when the pid is unknown.
    pub fn get(&self, pid: i32) -> NoticeMailbox {
        self.by_pid.lock().get(&pid).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_pid.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn warning_from_notice(notice: &DbError) -> SqlWarning {
    SqlWarning {
        code: Some(notice.code().code().to_string()),
        message: notice.message().to_string(),
    }
}

/// Connects like deadpool-postgres does, keeping the notices.
pub struct NoticeConnect<T> {
    tls: T,
    mailboxes: NoticeMailboxes,
}

impl<T> NoticeConnect<T> {
    pub fn new(tls: T, mailboxes: NoticeMailboxes) -> Self {
        Self { tls, mailboxes }
    }
}

impl<T> Connect for NoticeConnect<T>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    fn connect(
        &self,
        pg_config: &PgConfig,
    ) -> BoxFuture<'_, Result<(Client, JoinHandle<()>), tokio_postgres::Error>> {
        let tls = self.tls.clone();
        let pg_config = pg_config.clone();
        let mailboxes = self.mailboxes.clone();
        async move {
            let (client, mut connection) = pg_config.connect(tls).await?;

            let mailbox = NoticeMailbox::default();
            let pid_slot: Arc<Mutex<Option<i32>>> = Arc::default();
            let handle = {
                let mailbox = mailbox.clone();
                let pid_slot = pid_slot.clone();
                let mailboxes = mailboxes.clone();
                let mut messages =
                    futures::stream::poll_fn(move |cx| connection.poll_message(cx));
                tokio::spawn(async move {
                    while let Some(message) = messages.next().await {
                        match message {
                            Ok(AsyncMessage::Notice(notice)) => {
                                debug!("PostgreSQL notice: {}", notice.message());
                                mailbox.push(warning_from_notice(&notice));
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("PostgreSQL connection error: {}", e);
                                break;
                            }
                        }
                    }
                    if let Some(pid) = *pid_slot.lock() {
                        mailboxes.remove(pid);
                    }
                })
            };

            let pid: i32 = client.query_one("SELECT pg_backend_pid()", &[]).await?.get(0);
            *pid_slot.lock() = Some(pid);
            mailboxes.register(pid, mailbox);
            Ok((client, handle))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warning(message: &str) -> SqlWarning {
        SqlWarning {
            code: Some("01000".into()),
            message: message.into(),
        }
    }

    #[test]
    fn test_mailbox_drain_empties() {
        let mailbox = NoticeMailbox::default();
        mailbox.push(warning("first"));
        mailbox.push(warning("second"));
        let drained = mailbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[1].message, "second");
        assert!(mailbox.drain().is_empty());
    }

    #[test]
    fn test_mailboxes_share_notices_by_pid() {
        let mailboxes = NoticeMailboxes::default();
        let mailbox = NoticeMailbox::default();
        mailboxes.register(42, mailbox.clone());

        // The connection task pushes through its own handle
        mailbox.push(warning("table \"t\" does not exist, skipping"));
        let seen = mailboxes.get(42).drain();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code.as_deref(), Some("01000"));

        mailboxes.remove(42);
        assert!(mailboxes.is_empty());
        assert!(mailboxes.get(42).drain().is_empty());
    }
}
