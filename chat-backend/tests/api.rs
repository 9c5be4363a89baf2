use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chat_backend::http::Server;
use chat_backend::prelude::*;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

struct Reply {
    code: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("JSON body")
    }
}

async fn server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let service = ChatMessageService::new(Arc::new(MemoryRepository::new()));
    let server = Server::new(vec![
        ChatMessageController::new(service).rest("/api/chat-messages")
    ])
    .unwrap();

    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });

    addr
}

/// Read one response off the stream.
async fn read_reply(stream: &mut BufReader<TcpStream>) -> Reply {
    let mut status = String::new();
    stream.read_line(&mut status).await.unwrap();

    let code = status
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status line");

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        stream.read_line(&mut line).await.unwrap();
        let line = line.trim_end();

        if line.is_empty() {
            break;
        }

        let (name, value) = line.split_once(": ").expect("header");
        headers.insert(name.to_lowercase(), value.to_string());
    }

    let length = headers
        .get("content-length")
        .and_then(|length| length.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).await.unwrap();

    Reply {
        code,
        headers,
        body: String::from_utf8(body).unwrap(),
    }
}

async fn send(addr: SocketAddr, raw: &str) -> Reply {
    let mut stream = BufReader::new(TcpStream::connect(addr).await.unwrap());
    stream.get_mut().write_all(raw.as_bytes()).await.unwrap();
    read_reply(&mut stream).await
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    )
}

fn get(path: &str) -> String {
    format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    )
}

#[tokio::test]
async fn test_create_and_list() {
    let addr = server().await;

    let reply = send(
        addr,
        &post("/api/chat-messages", r#"{"message":"hi","userName":"alice"}"#),
    )
    .await;
    assert_eq!(reply.code, 201);
    assert_eq!(
        reply.headers.get("location").map(|l| l.as_str()),
        Some("/api/chat-messages/1")
    );
    assert_eq!(reply.headers.get("connection").map(|c| c.as_str()), Some("close"));
    let created = reply.json();
    assert_eq!(created["id"], json!(1));

    let reply = send(addr, &post("/api/chat-messages", r#"{"message":"hi"}"#)).await;
    assert_eq!(reply.code, 400);
    assert_eq!(reply.json()["fieldErrors"][0]["field"], json!("userName"));

    let reply = send(addr, &get("/api/chat-messages?sort=id,desc")).await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.json(), json!([created]));

    let reply = send(addr, &get("/api/chat-messages/1")).await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.json(), created);
}

#[tokio::test]
async fn test_keep_alive() {
    let addr = server().await;
    let mut stream = BufReader::new(TcpStream::connect(addr).await.unwrap());

    let body = r#"{"message":"first","userName":"bob"}"#;
    let raw = format!(
        "POST /api/chat-messages HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.get_mut().write_all(raw.as_bytes()).await.unwrap();
    let reply = read_reply(&mut stream).await;
    assert_eq!(reply.code, 201);
    assert_eq!(
        reply.headers.get("connection").map(|c| c.as_str()),
        Some("keep-alive")
    );

    stream
        .get_mut()
        .write_all(b"GET /api/chat-messages HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let reply = read_reply(&mut stream).await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.json().as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn test_errors() {
    let addr = server().await;

    let reply = send(addr, &get("/api/users")).await;
    assert_eq!(reply.code, 404);
    assert_eq!(reply.json(), json!({"title": "Not Found", "status": 404}));

    let reply = send(
        addr,
        "DELETE /api/chat-messages/1 HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(reply.code, 405);

    let reply = send(
        addr,
        "POST /api/chat-messages HTTP/1.1\r\nContent-Length: 999999999\r\n\r\n",
    )
    .await;
    assert_eq!(reply.code, 413);
    assert_eq!(reply.headers.get("connection").map(|c| c.as_str()), Some("close"));

    let reply = send(addr, "GET /api/chat-messages HTTP/1.1\n\r\n").await;
    assert_eq!(reply.code, 400);
}

#[tokio::test]
async fn test_unparseable_content_length_closes_connection() {
    let addr = server().await;
    let mut stream = BufReader::new(TcpStream::connect(addr).await.unwrap());

    stream
        .get_mut()
        .write_all(b"POST /api/chat-messages HTTP/1.1\r\nContent-Length: 3x\r\n\r\nGET /api/chat-messages/1 HTTP/1.1\r\n\r\n")
        .await
        .unwrap();

    let reply = read_reply(&mut stream).await;
    assert_eq!(reply.code, 400);
    assert_eq!(reply.headers.get("connection").map(|c| c.as_str()), Some("close"));

    // Nothing else is answered: the bytes after the head are never read as a request.
    let mut rest = vec![];
    let _ = stream.read_to_end(&mut rest).await;
    assert!(rest.is_empty(), "{}", String::from_utf8_lossy(&rest));
}

#[tokio::test]
async fn test_chunked_create() {
    let addr = server().await;
    let mut stream = BufReader::new(TcpStream::connect(addr).await.unwrap());

    let body = r#"{"message":"hi","userName":"alice"}"#;
    let (first, second) = body.split_at(10);
    let raw = format!(
        "POST /api/chat-messages HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n{:x}\r\n{}\r\n{:x}\r\n{}\r\n0\r\n\r\n",
        first.len(),
        first,
        second.len(),
        second
    );
    stream.get_mut().write_all(raw.as_bytes()).await.unwrap();

    let reply = read_reply(&mut stream).await;
    assert_eq!(reply.code, 201);
    assert_eq!(reply.json()["userName"], json!("alice"));

    stream
        .get_mut()
        .write_all(b"GET /api/chat-messages HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let reply = read_reply(&mut stream).await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.json().as_array().map(|a| a.len()), Some(1));

    let reply = send(
        addr,
        "POST /api/chat-messages HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n",
    )
    .await;
    assert_eq!(reply.code, 501);
    assert_eq!(reply.headers.get("connection").map(|c| c.as_str()), Some("close"));
}
