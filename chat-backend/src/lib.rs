//! A chat message service.
//!
//! `POST /api/chat-messages` stores a message and `GET /api/chat-messages` pages
//! through them. Messages live in PostgreSQL, or in memory for tests and local runs.
//!
//! Nothing is wired up implicitly. A binary picks a [`model::Repository`], wraps it
//! in a [`model::ChatMessageService`], hands that to a
//! [`controller::ChatMessageController`] and serves the controller with an
//! [`http::Server`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chat_backend::http::Server;
//! use chat_backend::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chat_backend::Error> {
//!     Logger::init();
//!
//!     let service = ChatMessageService::new(Arc::new(MemoryRepository::new()));
//!     let server = Server::new(vec![ChatMessageController::new(service).rest("/api/chat-messages")])?;
//!
//!     server.launch().await?;
//!     Ok(())
//! }
//! ```
pub mod colors;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod logging;
pub mod model;
pub mod prelude;

pub use error::Error;
