//! Storage layer: the chat message record, the repositories that persist it,
//! and the service the API calls into.
//!
//! Messages are kept in PostgreSQL by [`PostgresRepository`]. [`MemoryRepository`]
//! holds them in memory instead, for tests and local development.
pub mod chat_message;
pub mod error;
pub mod migrations;
pub mod page;
pub mod pool;
pub mod repository;
pub mod service;

pub use chat_message::ChatMessage;
pub use error::Error;
pub use migrations::migrate;
pub use page::{Direction, Order, Page, Pageable};
pub use pool::{Connection, Pool, PooledConnection, Transaction};
pub use repository::{MemoryRepository, PostgresRepository, Repository};
pub use service::ChatMessageService;

/// Convert a PostgreSQL row to a Rust struct.
pub trait FromRow: Clone + Send {
    /// Convert a [`tokio_postgres::Row`] to [`Self`].
    fn from_row(row: tokio_postgres::Row) -> Result<Self, Error>
    where
        Self: Sized;
}
