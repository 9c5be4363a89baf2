//! One PostgreSQL session and its prepared statements.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Statement};
use tracing::{error, info};

use super::Error;
use crate::colors::MaybeColorize;
use crate::config::get_config;

#[derive(Debug)]
pub struct Connection {
    client: Client,
    statements: HashMap<String, Statement>,
    broken: Arc<AtomicBool>,
    touched: Instant,
}

impl Connection {
    /// Open a session. The socket is driven by a separate task, which ends when
    /// the client is dropped or the server goes away.
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let (client, driver) = tokio_postgres::connect(database_url, NoTls).await?;
        let broken = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&broken);
        tokio::spawn(async move {
            if let Err(err) = driver.await {
                flag.store(true, Ordering::Relaxed);
                error!("postgres connection lost: {}", err);
            }
        });

        Ok(Self {
            client,
            statements: HashMap::new(),
            broken,
            touched: Instant::now(),
        })
    }

    /// Run `query`, preparing it on first use and reusing the statement after that.
    pub async fn query_cached(
        &mut self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Error> {
        let started = Instant::now();

        let statement = match self.statements.get(query) {
            Some(statement) => statement.clone(),
            None => {
                let statement = self.client.prepare(query).await?;
                self.statements.insert(query.to_string(), statement.clone());
                statement
            }
        };

        let rows = self.client.query(&statement, params).await;

        if get_config().general.log_queries {
            info!(
                "{} ({:.3} ms)",
                query.purple(),
                started.elapsed().as_secs_f64() * 1000.0
            );
        }

        rows.map_err(|err| {
            // A schema change invalidates cached plans. Close the session to drop them.
            if err.code() == Some(&SqlState::FEATURE_NOT_SUPPORTED) {
                self.broken.store(true, Ordering::Relaxed);
            }
            Error::from(err)
        })
    }

    /// The session is unusable and must not go back into the pool.
    pub fn bad(&self) -> bool {
        self.broken.load(Ordering::Relaxed) || self.client.is_closed()
    }

    pub(super) fn touch(&mut self) {
        self.touched = Instant::now();
    }

    /// Time since the connection was last returned to the pool.
    pub(super) fn idle_for(&self) -> Duration {
        self.touched.elapsed()
    }

    /// The client, for statements that shouldn't be prepared.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
