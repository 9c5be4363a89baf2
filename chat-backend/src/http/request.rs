//! Reading HTTP/1.x requests off a connection.
//!
//! The head is limited to `http.header_max_size` bytes and the body to
//! `http.body_max_size`. Bodies are framed by `Content-Length` or by
//! `Transfer-Encoding: chunked`. A request whose framing can't be trusted is
//! an error, and the server closes the connection after answering it, so
//! leftover bytes are never read as the next request.
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::{Error, Headers, Query};
use crate::config::get_config;

/// Longest chunk size or trailer line accepted in a chunked body.
const CHUNK_LINE_MAX: usize = 1024;

/// Request method.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Other(String),
}

impl Method {
    fn parse(name: &str) -> Self {
        match name {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request, read into memory in full.
///
/// Clones share the body.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    http10: bool,
    headers: Headers,
    body: Arc<[u8]>,
    peer: SocketAddr,
    id: Option<String>,
    received_at: OffsetDateTime,
}

impl Request {
    /// Read the next request from the connection, with the configured size limits.
    pub async fn read<R>(peer: SocketAddr, stream: &mut R) -> Result<Self, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let http = &get_config().http;
        Self::read_limited(peer, stream, http.header_max_size, http.body_max_size).await
    }

    pub(crate) async fn read_limited<R>(
        peer: SocketAddr,
        stream: &mut R,
        head_max: usize,
        body_max: usize,
    ) -> Result<Self, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut budget = head_max;

        let line = read_line(stream, &mut budget).await?;
        let mut parts = line.split(' ');
        let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(method), Some(target), Some(version), None)
                if !method.is_empty() && target.starts_with('/') =>
            {
                (method, target, version)
            }
            _ => return Err(Error::MalformedRequest("request line")),
        };

        let http10 = match version {
            "HTTP/1.1" => false,
            "HTTP/1.0" => true,
            _ => return Err(Error::MalformedRequest("http version")),
        };

        let target = target.split('#').next().unwrap_or_default();
        let (path, query) = match target.split_once('?') {
            Some((_, query)) if query.contains('?') => {
                return Err(Error::MalformedRequest("query"))
            }
            Some((path, query)) => (path, Query::parse(query)),
            None => (target, Query::default()),
        };

        let mut headers = Headers::new();
        loop {
            let line = read_line(stream, &mut budget).await?;
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or(Error::MalformedRequest("header"))?;

            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(Error::MalformedRequest("header name"));
            }

            let framing = name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("transfer-encoding");
            if framing && headers.get(name).is_some() {
                return Err(Error::MalformedRequest("repeated framing header"));
            }

            headers.insert(name, value.trim());
        }

        let body = match (
            headers.get("transfer-encoding"),
            headers.get("content-length"),
        ) {
            (Some(_), Some(_)) => {
                return Err(Error::MalformedRequest(
                    "both content-length and transfer-encoding",
                ))
            }
            (Some(encoding), None) if encoding.eq_ignore_ascii_case("chunked") => {
                read_chunked(stream, body_max).await?
            }
            (Some(encoding), None) => return Err(Error::UnsupportedEncoding(encoding.clone())),
            (None, Some(length)) => read_sized(stream, content_length(length)?, body_max).await?,
            (None, None) => vec![],
        };

        Ok(Request {
            method: Method::parse(method),
            path: path.to_string(),
            query,
            http10,
            headers,
            body: body.into(),
            peer,
            id: None,
            received_at: OffsetDateTime::now_utc(),
        })
    }

    /// Attach the resource id the route captured from the path.
    pub(crate) fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query, e.g. `/api/chat-messages/5`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Header value. Names are case insensitive.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    /// The `:id` segment under a REST route, if the path has one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as a JSON document. Anything after the document is an error.
    pub fn json_raw(&self) -> Result<Value, serde_json::Error> {
        self.json()
    }

    /// The body deserialized from JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// When the server finished reading the request.
    pub fn received_at(&self) -> OffsetDateTime {
        self.received_at
    }

    /// HTTP/1.1 keeps the connection open unless the client asks to close it.
    /// HTTP/1.0 closes it unless the client asks to keep it.
    pub fn keep_alive(&self) -> bool {
        let connection = self
            .header("connection")
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_default();

        if self.http10 {
            connection.contains("keep-alive")
        } else {
            !connection.contains("close")
        }
    }
}

/// Read one CRLF terminated line, charging its length to `budget`.
async fn read_line<R>(stream: &mut R, budget: &mut usize) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *stream)
        .take(*budget as u64)
        .read_until(b'\n', &mut line)
        .await?;
    *budget -= read;

    if line.last() != Some(&b'\n') {
        return Err(if *budget == 0 {
            Error::MalformedRequest("line too long")
        } else {
            Error::Io(std::io::ErrorKind::UnexpectedEof.into())
        });
    }

    line.pop();
    if line.pop() != Some(b'\r') {
        return Err(Error::MalformedRequest("line not terminated by crlf"));
    }

    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn content_length(value: &str) -> Result<usize, Error> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::MalformedRequest("content-length"));
    }

    value
        .parse()
        .map_err(|_| Error::MalformedRequest("content-length"))
}

async fn read_sized<R>(stream: &mut R, length: usize, max: usize) -> Result<Vec<u8>, Error>
where
    R: AsyncBufRead + Unpin,
{
    if length > max {
        return Err(Error::ContentTooLarge(max));
    }

    let mut body = vec![0u8; length];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|_| Error::MalformedRequest("body shorter than content-length"))?;

    Ok(body)
}

/// Decode a `Transfer-Encoding: chunked` body. Chunk extensions and trailers
/// are read and dropped.
async fn read_chunked<R>(stream: &mut R, max: usize) -> Result<Vec<u8>, Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();

    loop {
        let mut budget = CHUNK_LINE_MAX;
        let line = read_line(stream, &mut budget).await?;
        let size = line.split(';').next().unwrap_or_default().trim();

        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedRequest("chunk size"));
        }

        let size =
            usize::from_str_radix(size, 16).map_err(|_| Error::MalformedRequest("chunk size"))?;
        if size == 0 {
            break;
        }

        if size > max - body.len() {
            return Err(Error::ContentTooLarge(max));
        }

        let start = body.len();
        body.resize(start + size, 0);
        stream
            .read_exact(&mut body[start..])
            .await
            .map_err(|_| Error::MalformedRequest("chunk shorter than its size"))?;

        let mut crlf = [0u8; 2];
        stream
            .read_exact(&mut crlf)
            .await
            .map_err(|_| Error::MalformedRequest("chunk terminator"))?;
        if &crlf != b"\r\n" {
            return Err(Error::MalformedRequest("chunk terminator"));
        }
    }

    loop {
        let mut budget = CHUNK_LINE_MAX;
        if read_line(stream, &mut budget).await?.is_empty() {
            break;
        }
    }

    Ok(body)
}
