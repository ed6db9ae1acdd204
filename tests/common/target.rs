use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// In-process HTTP service the engine runs its steps against
pub struct TestTarget {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl TestTarget {
    pub async fn spawn() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/ping", get(ping))
            .route("/login", post(login))
            .route("/echo", post(echo))
            .route("/users/{id}", get(user))
            .route("/slow", get(slow))
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn ping(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "message": "pong" }))
}

async fn login(State(hits): State<Arc<AtomicUsize>>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "token": "tok-123",
        "user": { "id": 7, "role": "qa" }
    }))
}

/// Reflects the request body and headers back at the caller
async fn echo(
    State(hits): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);

    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    let echoed = body.map(|Json(v)| v).unwrap_or(Value::Null);
    Json(json!({ "echo": echoed, "headers": header_map }))
}

async fn user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "id": id, "name": format!("user-{}", id) }))
}

/// Never answers within any sane step timeout
async fn slow() -> Json<Value> {
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    Json(json!({ "message": "late" }))
}

/// A target whose first `failures` connections die before any response.
/// Connections after that get a fixed 200 JSON body.
pub struct FlakyTarget {
    pub addr: SocketAddr,
    attempts: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyTarget {
    pub async fn spawn(failures: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = attempts.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    // Closing with the request unread resets the connection
                    drop(socket);
                    continue;
                }

                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;

                let body = r#"{"ok":true}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { addr, attempts }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
