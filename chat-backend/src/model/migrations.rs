//! Database schema migrations.
//!
//! Migrations are compiled into the binary and applied in version order at startup.
//! Applied versions are recorded in the `_chat_migrations` table; each migration runs
//! in its own transaction, together with its record, so it is applied exactly once.
use tracing::{error, info};

use super::{Error, Pool};
use crate::colors::MaybeColorize;
use crate::config::get_config;

/// A migration shipped with the service.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations, in version order.
pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "chat_message",
    sql: include_str!("../../migrations/1_chat_message.up.sql"),
}];

const BOOTSTRAP: &str = r#"CREATE TABLE IF NOT EXISTS "_chat_migrations" (
    "version" BIGINT PRIMARY KEY,
    "name" TEXT NOT NULL,
    "applied_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()
)"#;

impl Migration {
    /// Statements in the migration, without empty ones.
    fn queries(&self) -> Vec<&'static str> {
        self.sql
            .split(";")
            .map(|query| query.trim())
            .filter(|query| !query.is_empty())
            .collect()
    }
}

/// Apply all migrations that haven't been applied yet.
///
/// Safe to call from several instances at once: the migrations table is locked
/// while a migration runs.
pub async fn migrate(pool: &Pool) -> Result<(), Error> {
    {
        let mut conn = pool.get().await?;
        conn.query_cached(BOOTSTRAP, &[]).await?;
    }

    let log_queries = get_config().general.log_queries;

    for migration in MIGRATIONS {
        let mut transaction = pool.transaction().await?;

        transaction
            .query_cached(r#"LOCK TABLE "_chat_migrations" IN EXCLUSIVE MODE"#, &[])
            .await?;

        let applied = transaction
            .query_cached(
                r#"SELECT 1 FROM "_chat_migrations" WHERE "version" = $1"#,
                &[&migration.version],
            )
            .await?;

        if !applied.is_empty() {
            info!(r#"migration "{}" already applied"#, migration.name);
            continue;
        }

        info!(r#"applying migration "{}""#, migration.name.green());

        transaction
            .query_cached("SET LOCAL client_min_messages TO WARNING", &[])
            .await?;

        for query in migration.queries() {
            if let Err(err) = transaction.client().query(query, &[]).await {
                error!(r#"migration "{}" failed: {:?}"#, migration.name, err);
                return Err(Error::MigrationError(format!(
                    "{}_{} failed",
                    migration.version, migration.name
                )));
            }

            if log_queries {
                info!("{}", query);
            }
        }

        transaction
            .query_cached(
                r#"INSERT INTO "_chat_migrations" ("version", "name") VALUES ($1, $2)"#,
                &[&migration.version, &migration.name],
            )
            .await?;

        transaction.commit().await?;

        info!(r#"migration "{}" applied"#, migration.name);
    }

    Ok(())
}
