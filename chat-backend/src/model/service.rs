//! Chat message operations used by the API.
use std::sync::Arc;

use tracing::debug;

use super::{ChatMessage, Error, Page, Pageable, Repository};

/// Saves and lists chat messages.
///
/// Holds whichever [`Repository`] it was constructed with.
#[derive(Clone)]
pub struct ChatMessageService {
    repository: Arc<dyn Repository>,
}

impl ChatMessageService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Save a message and return it with its assigned `id`.
    pub async fn save(&self, message: ChatMessage) -> Result<ChatMessage, Error> {
        debug!("Request to save ChatMessage : {}", message);
        self.repository.insert(message).await
    }

    /// Get one page of messages.
    pub async fn find_all(&self, pageable: &Pageable) -> Result<Page<ChatMessage>, Error> {
        debug!("Request to get all ChatMessages: {:?}", pageable);
        self.repository.select_page(pageable).await
    }

    /// Get a message by id.
    pub async fn find_one(&self, id: i64) -> Result<Option<ChatMessage>, Error> {
        debug!("Request to get ChatMessage : {}", id);
        self.repository.select_by_id(id).await
    }

    pub fn repository_name(&self) -> &'static str {
        self.repository.repository_name()
    }
}

impl std::fmt::Debug for ChatMessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ChatMessageService")
            .field("repository", &self.repository_name())
            .finish()
    }
}
