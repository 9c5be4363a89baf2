//! Errors returned by the storage layer.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0:?}")]
    DatabaseError(#[from] tokio_postgres::Error),

    #[error("pool timeout")]
    PoolTimeout,

    #[error("query returned no rows: {0}")]
    NoRows(&'static str),

    #[error("migration error: \"{0}\"")]
    MigrationError(String),
}
