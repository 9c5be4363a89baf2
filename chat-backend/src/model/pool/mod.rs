//! PostgreSQL connection pool.
//!
//! At most `pool_size` connections are checked out at once; each checkout
//! holds a semaphore permit. Returned connections wait in a FIFO queue and are
//! reused oldest first. Connections are opened on demand, and a background
//! task closes the ones that broke or sat idle longer than `idle_timeout`.
//!
//! Repositories run each call in its own [`Transaction`]:
//!
//! ```ignore
//! let mut transaction = pool.transaction().await?;
//! let rows = transaction.query_cached("SELECT 1", &[]).await?;
//! transaction.commit().await?;
//! ```
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

use super::Error;
use crate::config::Database;

pub mod connection;
pub mod transaction;

pub use connection::Connection;
pub use transaction::Transaction;

/// How often idle connections are checked.
const REAP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pool_size: usize,
    /// Longest wait for a connection, including opening it.
    pub checkout_timeout: Duration,
    pub idle_timeout: Duration,
}

impl From<&Database> for PoolConfig {
    fn from(database: &Database) -> Self {
        Self {
            pool_size: database.pool_size.max(1),
            checkout_timeout: database.checkout_timeout(),
            idle_timeout: database.idle_timeout(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    database_url: String,
    config: PoolConfig,
    idle: Mutex<VecDeque<Connection>>,
    permits: Arc<Semaphore>,
}

impl Inner {
    fn reap(&self) {
        let idle_timeout = self.config.idle_timeout;
        let mut idle = self.idle.lock();
        let before = idle.len();

        idle.retain(|connection| !connection.bad() && connection.idle_for() <= idle_timeout);

        if idle.len() < before {
            debug!("closed {} idle connections", before - idle.len());
        }
    }

    fn check_in(&self, connection: Connection) {
        if !connection.bad() {
            self.idle.lock().push_back(connection);
        }
    }
}

/// Connection pool. Clones share the same connections.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

impl Pool {
    /// Create a pool without connecting. Needs a Tokio runtime for the reaper task,
    /// which stops when the last clone of the pool is dropped.
    pub fn new(database_url: &str, config: PoolConfig) -> Self {
        let inner = Arc::new(Inner {
            database_url: database_url.to_string(),
            permits: Arc::new(Semaphore::new(config.pool_size)),
            idle: Mutex::new(VecDeque::new()),
            config,
        });

        tokio::spawn(reaper(Arc::downgrade(&inner)));

        Self { inner }
    }

    pub fn from_config(database: &Database) -> Self {
        Self::new(&database.database_url(), PoolConfig::from(database))
    }

    /// Check out a connection. Fails with [`Error::PoolTimeout`] if none frees up
    /// and none can be opened within `checkout_timeout`.
    pub async fn get(&self) -> Result<PooledConnection, Error> {
        tokio::time::timeout(self.inner.config.checkout_timeout, self.checkout())
            .await
            .map_err(|_| Error::PoolTimeout)?
    }

    /// Check out a connection and `BEGIN` on it.
    pub async fn transaction(&self) -> Result<Transaction, Error> {
        Transaction::begin(self.get().await?).await
    }

    async fn checkout(&self) -> Result<PooledConnection, Error> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolTimeout)?;

        let reused = {
            let mut idle = self.inner.idle.lock();
            std::iter::from_fn(|| idle.pop_front()).find(|connection| !connection.bad())
        };

        let connection = match reused {
            Some(connection) => connection,
            None => Connection::new(&self.inner.database_url).await?,
        };

        Ok(PooledConnection {
            connection: Some(connection),
            permit: Some(permit),
            inner: Arc::clone(&self.inner),
            rollback: false,
        })
    }
}

async fn reaper(inner: Weak<Inner>) {
    loop {
        tokio::time::sleep(REAP_INTERVAL).await;

        match inner.upgrade() {
            Some(inner) => inner.reap(),
            None => return,
        }
    }
}

/// A checked out connection. Dropping it returns the connection to the pool.
pub struct PooledConnection {
    connection: Option<Connection>,
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<Inner>,
    rollback: bool,
}

impl PooledConnection {
    /// A transaction is open on the connection; roll it back before it's reused.
    pub(super) fn rollback_on_release(&mut self) {
        self.rollback = true;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let (Some(mut connection), Some(permit)) = (self.connection.take(), self.permit.take())
        else {
            return;
        };
        connection.touch();

        if !self.rollback {
            self.inner.check_in(connection);
            drop(permit);
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match connection.query_cached("ROLLBACK", &[]).await {
                Ok(_) => inner.check_in(connection),
                Err(err) => error!("rollback of an abandoned transaction failed: {}", err),
            }
            drop(permit);
        });
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection
            .as_ref()
            .expect("connection is only taken on drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("connection is only taken on drop")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::get_config;

    const SIZE: usize = 3;

    fn pool(pool_size: usize) -> Pool {
        Pool::new(
            &get_config().database.database_url(),
            PoolConfig {
                pool_size,
                checkout_timeout: Duration::from_millis(500),
                idle_timeout: Duration::from_secs(60),
            },
        )
    }

    fn checked_out(pool: &Pool) -> usize {
        SIZE - pool.inner.permits.available_permits()
    }

    fn idle(pool: &Pool) -> usize {
        pool.inner.idle.lock().len()
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_checkout_and_reuse() -> Result<(), Error> {
        let pool = pool(SIZE);

        let first = pool.get().await?;
        let rows = first.client().query("SELECT 1", &[]).await?;
        assert_eq!(rows.len(), 1);

        let mut others = vec![];
        for _ in 1..SIZE {
            others.push(pool.get().await?);
        }
        assert_eq!(checked_out(&pool), SIZE);
        assert!(matches!(pool.get().await, Err(Error::PoolTimeout)));

        drop(first);
        assert_eq!(idle(&pool), 1);
        assert_eq!(checked_out(&pool), SIZE - 1);

        let again = pool.get().await?;
        assert_eq!(idle(&pool), 0);

        drop(again);
        others.clear();
        assert_eq!(idle(&pool), SIZE);
        assert_eq!(checked_out(&pool), 0);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL"]
    async fn test_uncommitted_transaction_rolls_back() -> Result<(), Error> {
        let pool = pool(1);

        {
            let mut transaction = pool.transaction().await?;
            transaction
                .query_cached("CREATE TEMPORARY TABLE pool_test (id BIGINT)", &[])
                .await?;
        }

        // The permit comes back once the rollback task is done with the connection.
        let mut conn = pool.get().await?;
        let rows = conn
            .query_cached("SELECT to_regclass('pool_test') IS NOT NULL", &[])
            .await?;
        let exists: bool = rows[0].get(0);
        assert!(!exists);

        Ok(())
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let pool = Pool::new(
            "postgres://nobody@127.0.0.1:1/nothing",
            PoolConfig {
                pool_size: 1,
                checkout_timeout: Duration::from_secs(5),
                idle_timeout: Duration::from_secs(1),
            },
        );

        assert!(pool.get().await.is_err());
        // The permit is given back.
        assert_eq!(pool.inner.permits.available_permits(), 1);
        assert!(pool.get().await.is_err());
    }
}
