//! Errors that stop the service.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("server: {0}")]
    Server(#[from] crate::http::Error),

    #[error("storage: {0}")]
    Storage(#[from] crate::model::Error),
}
