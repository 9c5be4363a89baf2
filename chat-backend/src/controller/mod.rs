//! Controllers turn routed requests into responses.
//!
//! [`Controller::handle_internal`] is what the server calls. It answers CORS
//! preflights itself and turns errors into JSON error responses. A
//! [`RestController`] only has to implement list, get and create.
use std::str::FromStr;

use async_trait::async_trait;
use tracing::error;

pub mod chat_messages;
pub mod error;

pub use chat_messages::ChatMessageController;
pub use error::Error;

use crate::config::get_config;
use crate::http::{Handler, Method, Request, Response};

#[async_trait]
pub trait Controller: Send + Sync {
    async fn handle(&self, request: &Request) -> Result<Response, Error>;

    /// Sent as `Access-Control-Allow-Methods` in preflight responses.
    fn allowed_methods(&self) -> &'static str {
        "GET, POST, OPTIONS"
    }

    async fn handle_internal(&self, request: &Request) -> Response {
        let response = if request.method() == &Method::Options {
            let headers = request
                .header("access-control-request-headers")
                .map(String::as_str)
                .unwrap_or("content-type");

            Response::no_content()
                .header("access-control-allow-methods", self.allowed_methods())
                .header("access-control-allow-headers", headers)
                .header("access-control-max-age", 1800)
        } else {
            self.handle(request).await.unwrap_or_else(|err| {
                error!("{} failed: {}", self.controller_name(), err);
                Response::problem(err.code())
            })
        };

        response.header(
            "access-control-allow-origin",
            &get_config().http.cors_allowed_origin,
        )
    }

    fn controller_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A collection of resources addressed by id.
///
/// | Request        | Method   |
/// |----------------|----------|
/// | `GET /`        | `list`   |
/// | `POST /`       | `create` |
/// | `GET /:id`     | `get`    |
///
/// Anything else is `405 Method Not Allowed`. An id that doesn't parse as
/// [`RestController::Resource`] is `400 Bad Request`.
#[async_trait]
pub trait RestController: Controller {
    type Resource: FromStr + Send + Sync;

    async fn dispatch(&self, request: &Request) -> Result<Response, Error> {
        let id = match request.id().map(str::parse::<Self::Resource>) {
            None => None,
            Some(Ok(id)) => Some(id),
            Some(Err(_)) => return Ok(Response::bad_request()),
        };

        match (request.method(), id) {
            (Method::Get, None) => self.list(request).await,
            (Method::Post, None) => self.create(request).await,
            (Method::Get, Some(id)) => self.get(request, &id).await,
            _ => Ok(Response::method_not_allowed()),
        }
    }

    /// Serve the collection at `path` with this controller.
    fn rest(self, path: &str) -> Handler
    where
        Self: Sized + 'static,
    {
        Handler::rest(path, self)
    }

    async fn list(&self, request: &Request) -> Result<Response, Error>;

    async fn get(&self, request: &Request, id: &Self::Resource) -> Result<Response, Error>;

    async fn create(&self, request: &Request) -> Result<Response, Error>;
}
