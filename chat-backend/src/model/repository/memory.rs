//! Chat messages kept in memory. Nothing survives a restart.
use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{sort_columns, Repository};
use crate::model::{ChatMessage, Direction, Error, Page, Pageable};

#[derive(Debug)]
struct Inner {
    messages: Vec<ChatMessage>,
    next_id: i64,
}

/// In-memory repository. Ids start at 1 and are never reused.
///
/// Cloning it is cheap; clones share the same messages.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                messages: vec![],
                next_id: 1,
            })),
        }
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compare(a: &ChatMessage, b: &ChatMessage, column: &str) -> Ordering {
        match column {
            "id" => a.id.cmp(&b.id),
            "message" => a.message.cmp(&b.message),
            "user_name" => a.user_name.cmp(&b.user_name),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => Ordering::Equal,
        }
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert(&self, message: ChatMessage) -> Result<ChatMessage, Error> {
        let mut inner = self.inner.lock();

        let message = ChatMessage {
            id: Some(inner.next_id),
            ..message
        };
        inner.next_id += 1;
        inner.messages.push(message.clone());

        Ok(message)
    }

    async fn select_page(&self, pageable: &Pageable) -> Result<Page<ChatMessage>, Error> {
        let mut messages = self.inner.lock().messages.clone();
        let total = messages.len() as i64;
        let columns = sort_columns(pageable);

        messages.sort_by(|a, b| {
            columns
                .iter()
                .map(|(column, direction)| match direction {
                    Direction::Asc => Self::compare(a, b, column),
                    Direction::Desc => Self::compare(b, a, column),
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let offset = usize::try_from(pageable.offset()).unwrap_or(usize::MAX);
        let size = usize::try_from(pageable.size()).unwrap_or(usize::MAX);

        let content = messages.into_iter().skip(offset).take(size).collect();

        Ok(Page::new(content, pageable.clone(), total))
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<ChatMessage>, Error> {
        Ok(self
            .inner
            .lock()
            .messages
            .iter()
            .find(|message| message.id == Some(id))
            .cloned())
    }
}
