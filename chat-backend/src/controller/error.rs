//! Controller errors. Storage, HTTP and JSON errors convert with `?`.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage: {0}")]
    Storage(#[from] crate::model::Error),

    #[error("http: {0}")]
    Http(#[from] crate::http::Error),
}

impl Error {
    /// Status the client gets. Storage failures are never the client's fault.
    pub fn code(&self) -> u16 {
        match self {
            Error::Json(_) => 400,
            Error::Http(err) => err.code(),
            Error::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_code() {
        let err = Error::from(crate::http::Error::MalformedRequest("body"));
        assert_eq!(err.code(), 400);
        assert_eq!(Error::from(crate::model::Error::PoolTimeout).code(), 500);

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(json).code(), 400);
    }
}
