//! Where chat messages are kept.
//!
//! The rest of the service talks to storage only through the [`Repository`] trait.
//! Every call is a complete unit of work: implementations that use a database
//! run each call in its own transaction and commit it before returning.
use async_trait::async_trait;

use super::{ChatMessage, Direction, Error, Page, Pageable};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Chat message storage.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Store a new message. The returned message has its `id` assigned;
    /// any `id` already set on the argument is ignored.
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage, Error>;

    /// Fetch one page of messages and the total number of messages.
    async fn select_page(&self, pageable: &Pageable) -> Result<Page<ChatMessage>, Error>;

    /// Fetch a message by id.
    async fn select_by_id(&self, id: i64) -> Result<Option<ChatMessage>, Error>;

    /// Name used in logs.
    fn repository_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Columns to sort by, in order.
///
/// Properties that don't map to a column are skipped. Ties are always broken
/// by `id`, so paging through the same data twice returns the same pages.
pub(crate) fn sort_columns(pageable: &Pageable) -> Vec<(&'static str, Direction)> {
    let mut columns = pageable
        .orders()
        .iter()
        .filter_map(|order| ChatMessage::sortable(&order.property).map(|c| (c, order.direction)))
        .collect::<Vec<_>>();

    if !columns.iter().any(|(column, _)| *column == "id") {
        columns.push(("id", Direction::Asc));
    }

    columns
}
