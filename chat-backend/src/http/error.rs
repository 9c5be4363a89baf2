//! Errors raised while reading requests and serving connections.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("request body is larger than {0} bytes")]
    ContentTooLarge(usize),

    #[error("transfer encoding \"{0}\" is not supported")]
    UnsupportedEncoding(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("route: {0}")]
    Route(#[from] regex::Error),
}

impl Error {
    /// Status sent to the client before the connection is closed.
    pub fn code(&self) -> u16 {
        match self {
            Error::MalformedRequest(_) | Error::Json(_) => 400,
            Error::ContentTooLarge(_) => 413,
            Error::UnsupportedEncoding(_) => 501,
            Error::Io(_) | Error::Route(_) => 500,
        }
    }
}
