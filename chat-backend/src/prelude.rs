//! What a binary needs to assemble the service.
//!
//! ```
//! use chat_backend::prelude::*;
//! ```
pub use crate::controller::{ChatMessageController, RestController};
pub use crate::logging::Logger;
pub use crate::model::{
    ChatMessage, ChatMessageService, MemoryRepository, Pool, PostgresRepository, Repository,
};
