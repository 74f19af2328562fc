//! Mock GitHub Issues API server
//!
//! [`MockTrackerServer`] answers `POST /repos/{owner}/{repo}/issues` with
//! queued responses and records every request it receives, so tests can
//! exercise [`crate::tracker::GitHubTracker`] without network access.
//!
//! ```ignore
//! let server = MockTrackerServer::builder()
//!     .with_error(401, r#"{"message":"Bad credentials"}"#)
//!     .build()
//!     .await?;
//! let config = TrackerConfig { api_base: server.url().to_string(), ..Default::default() };
//! // ... file an issue ...
//! let requests = server.requests().await;
//! server.stop().await;
//! ```

use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};

const MAX_HEADER_BYTES: usize = 16 * 1024;

/// How the server answers the next issue request.
#[derive(Debug, Clone)]
pub enum MockTrackerResponse {
    /// 201 with a `{number, html_url}` body
    Created { number: u64 },
    /// Any status with a raw body
    Error { status: u16, body: String },
    /// 201 with a body that is not a GitHub issue
    Malformed(String),
}

/// One request as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Default)]
struct ServerState {
    responses: Vec<MockTrackerResponse>,
    served: usize,
    requests: Vec<RecordedRequest>,
}

pub struct MockTrackerServer {
    url: String,
    state: Arc<Mutex<ServerState>>,
    shutdown_tx: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockTrackerServer {
    pub fn builder() -> MockTrackerServerBuilder {
        MockTrackerServerBuilder::default()
    }

    /// Bind to an OS-assigned local port and start serving.
    pub async fn start(responses: Vec<MockTrackerResponse>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);

        let state = Arc::new(Mutex::new(ServerState {
            responses,
            ..ServerState::default()
        }));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(accept_loop(listener, state.clone(), shutdown_rx));

        Ok(Self {
            url,
            state,
            shutdown_tx,
            handle,
        })
    }

    /// Base URL, usable as the tracker `api_base`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

#[derive(Debug, Default)]
pub struct MockTrackerServerBuilder {
    responses: Vec<MockTrackerResponse>,
}

impl MockTrackerServerBuilder {
    /// Queue a successful creation. Once the queue is exhausted every
    /// request succeeds with the next sequential number.
    pub fn with_created(mut self, number: u64) -> Self {
        self.responses.push(MockTrackerResponse::Created { number });
        self
    }

    pub fn with_error(mut self, status: u16, body: impl Into<String>) -> Self {
        self.responses.push(MockTrackerResponse::Error {
            status,
            body: body.into(),
        });
        self
    }

    pub fn with_malformed(mut self, body: impl Into<String>) -> Self {
        self.responses.push(MockTrackerResponse::Malformed(body.into()));
        self
    }

    pub async fn build(self) -> std::io::Result<MockTrackerServer> {
        MockTrackerServer::start(self.responses).await
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<Mutex<ServerState>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _addr)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state).await {
                                tracing::debug!("mock tracker connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::debug!("mock tracker accept error: {}", e);
                    }
                }
            }
        }
    }
}

/// Read one request: headers up to the blank line, then `Content-Length`
/// bytes of body.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<RecordedRequest>> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Ok(None);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    }))
}

fn is_issue_create(request: &RecordedRequest) -> bool {
    let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
    request.method == "POST"
        && segments.len() == 4
        && segments[0] == "repos"
        && segments[3] == "issues"
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<ServerState>>,
) -> std::io::Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };

    if !is_issue_create(&request) {
        state.lock().await.requests.push(request);
        return write_http_response(&mut stream, 404, r#"{"message":"Not Found"}"#).await;
    }

    let response = {
        let mut state = state.lock().await;
        let (owner, repo) = {
            let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();
            (segments[1].to_string(), segments[2].to_string())
        };
        state.requests.push(request);
        let next = state.served;
        state.served += 1;
        let response = state
            .responses
            .get(next)
            .cloned()
            .unwrap_or(MockTrackerResponse::Created {
                number: next as u64 + 1,
            });
        (response, owner, repo)
    };

    match response {
        (MockTrackerResponse::Created { number }, owner, repo) => {
            let body = serde_json::json!({
                "number": number,
                "html_url": format!("https://github.com/{}/{}/issues/{}", owner, repo, number),
            })
            .to_string();
            write_http_response(&mut stream, 201, &body).await
        }
        (MockTrackerResponse::Error { status, body }, _, _) => {
            write_http_response(&mut stream, status, &body).await
        }
        (MockTrackerResponse::Malformed(body), _, _) => {
            write_http_response(&mut stream, 201, &body).await
        }
    }
}

async fn write_http_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let status_text = match status {
        200 => "OK",
        201 => "Created",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    };

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body,
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}
