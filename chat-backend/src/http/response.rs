//! Response builder and its wire format.
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{Error, Headers};

/// Reason phrase for the status codes the server sends.
fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Content Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}

/// An HTTP/1.1 response.
///
/// `Content-Length` is computed when the response is written.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// An empty `200 OK`.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Headers::from([("server", "chat-backend"), ("connection", "keep-alive")]),
            body: vec![],
        }
    }

    /// Set the status code.
    ///
    /// ```
    /// use chat_backend::http::Response;
    ///
    /// let response = Response::new().text("created").code(201);
    /// assert_eq!(response.status(), 201);
    /// ```
    pub fn code(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Serialize `body` as the JSON body.
    pub fn json(self, body: impl Serialize) -> Result<Self, Error> {
        let body = serde_json::to_vec(&body)?;
        Ok(self.with_body("application/json", body))
    }

    pub fn text(self, body: impl Into<String>) -> Self {
        self.with_body("text/plain; charset=utf-8", body.into().into_bytes())
    }

    fn with_body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.headers.insert("content-type", content_type);
        self.body = body;
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: &str, value: impl ToString) -> Self {
        self.headers.insert(name, value.to_string());
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Ask the client not to send anything else on this connection.
    pub fn close(self) -> Self {
        self.header("connection", "close")
    }

    /// Write the status line, headers and body. The stream is not flushed.
    pub async fn send(&self, stream: &mut (impl AsyncWrite + Unpin)) -> Result<(), std::io::Error> {
        let mut headers = self.headers.clone();
        headers.insert("content-length", self.body.len());

        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason(self.status)).into_bytes();
        head.extend(headers.to_bytes());
        head.extend_from_slice(b"\r\n");

        stream.write_all(&head).await?;
        stream.write_all(&self.body).await
    }

    /// A JSON error body: `{"title": "Not Found", "status": 404}`.
    pub fn problem(status: u16) -> Self {
        let body = json!({
            "title": reason(status),
            "status": status,
        });

        Self::new().with_body("application/json", body.to_string().into_bytes()).code(status)
    }

    pub fn not_found() -> Self {
        Self::problem(404)
    }

    pub fn bad_request() -> Self {
        Self::problem(400)
    }

    pub fn method_not_allowed() -> Self {
        Self::problem(405)
    }

    /// Generic 500. The cause stays in the logs.
    pub fn internal_error() -> Self {
        Self::problem(500)
    }

    pub fn no_content() -> Self {
        Self::new().code(204)
    }
}
