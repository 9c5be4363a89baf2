//! HTTP/1.1: reading requests, routing them to controllers and writing responses.
pub mod error;
pub mod headers;
pub mod query;
pub mod request;
pub mod response;
pub mod route;
pub mod server;
pub mod url;

pub use error::Error;
pub use headers::Headers;
pub use query::Query;
pub use request::{Method, Request};
pub use response::Response;
pub use route::{Handler, Router};
pub use server::Server;
pub use url::urldecode;
