#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use survey_client::client::config::ClientConfig;
use survey_client::client::token::TokenStore;
use survey_client::state::AppState;

#[derive(Debug, Clone)]
pub struct Canned {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Content-Length to announce when it should differ from the body,
    /// so the connection closes mid-body.
    pub declared_length: Option<usize>,
}

impl Canned {
    pub fn json(method: &'static str, path: &str, status: u16, body: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            content_type: "application/json",
            body: body.to_string(),
            declared_length: None,
        }
    }

    pub fn csv(path: &str, body: &str) -> Self {
        Self {
            method: "GET",
            path: path.to_string(),
            status: 200,
            content_type: "text/csv",
            body: body.to_string(),
            declared_length: None,
        }
    }

    /// A CSV reply that announces `declared` bytes but sends fewer.
    pub fn truncated_csv(path: &str, body: &str, declared: usize) -> Self {
        Self {
            declared_length: Some(declared),
            ..Self::csv(path, body)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP/1.1 responder: matches method and path against canned
/// replies and records every request it saw.
pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl StubServer {
    pub async fn start(routes: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);
        let seen = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    handle(stream, &routes, &seen).await;
                });
            }
        });
        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<Captured> {
        self.requests.lock().await.clone()
    }

    pub fn config(&self, root: &std::path::Path) -> ClientConfig {
        let mut config = ClientConfig::default_for(root);
        config.api_url = self.base_url();
        config.timeout_secs = 5;
        config
    }

    pub fn app(&self, tokens: TokenStore) -> AppState {
        let root = temp_dir("survey-app");
        AppState::new(&self.config(&root), tokens).expect("app state")
    }
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::new_v4()))
}

async fn handle(mut stream: TcpStream, routes: &[Canned], seen: &Mutex<Vec<Captured>>) {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect::<Vec<(String, String)>>();
    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body_end = (body_start + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();

    seen.lock().await.push(Captured {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });

    let reply = routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .cloned()
        .unwrap_or_else(|| Canned::json("GET", &path, 404, r#"{"detail":"Not Found"}"#));
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason(reply.status),
        reply.content_type,
        reply.declared_length.unwrap_or(reply.body.len()),
        reply.body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        401 => "Unauthorized",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

pub const SURVEY_JSON: &str = r#"{
    "id": 7,
    "title": "Team retro",
    "description": "Quarterly check-in",
    "created_by": 1,
    "created_at": "2024-03-01T09:30:00.123456",
    "questions": [
        {"id": 1, "survey_id": 7, "question_text": "How was the quarter?", "question_type": "RATING", "options": null},
        {"id": 2, "survey_id": 7, "question_text": "Favourite colour", "question_type": "MULTIPLE_CHOICE", "options": ["Red", "Green"]}
    ]
}"#;
