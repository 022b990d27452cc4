//! In-process stand-in for the GitHub Contents API.
//!
//! Stores files per (branch, path), hashes content with sha256 for the blob
//! `sha`, enforces the sha check on writes the way GitHub does, and can be
//! scripted to fail the next reads or writes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub api_version: Option<String>,
    /// `sha` sent with a write
    pub sha: Option<String>,
}

#[derive(Default)]
struct MockRepo {
    files: HashMap<(String, String), StoredFile>,
    read_failures: VecDeque<(StatusCode, String)>,
    write_failures: VecDeque<(StatusCode, String)>,
    requests: Vec<RecordedRequest>,
}

struct StoredFile {
    content: Vec<u8>,
    sha: String,
}

type Shared = Arc<Mutex<MockRepo>>;

pub struct MockGitHub {
    state: Shared,
    base: Url,
    server: JoinHandle<()>,
}

impl MockGitHub {
    pub async fn start() -> anyhow::Result<Self> {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(read_file).put(write_file),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            state,
            base: Url::parse(&format!("http://127.0.0.1:{port}/"))?,
            server,
        })
    }

    pub fn base(&self) -> Url {
        self.base.clone()
    }

    /// Put a file in place as if someone else committed it; returns its sha
    pub fn seed(&self, branch: &str, path: &str, text: &str) -> String {
        let sha = blob_sha(text.as_bytes());
        self.state.lock().unwrap().files.insert(
            (branch.to_string(), path.to_string()),
            StoredFile {
                content: text.as_bytes().to_vec(),
                sha: sha.clone(),
            },
        );
        sha
    }

    pub fn stored(&self, branch: &str, path: &str) -> Option<(String, String)> {
        let repo = self.state.lock().unwrap();
        repo.files
            .get(&(branch.to_string(), path.to_string()))
            .map(|f| (String::from_utf8(f.content.clone()).unwrap(), f.sha.clone()))
    }

    pub fn fail_next_read(&self, status: StatusCode, body: &str) {
        self.state
            .lock()
            .unwrap()
            .read_failures
            .push_back((status, body.to_string()));
    }

    pub fn fail_next_write(&self, status: StatusCode, body: &str) {
        self.state
            .lock()
            .unwrap()
            .write_failures
            .push_back((status, body.to_string()));
    }

    /// Answer the next read with this exact status and body
    pub fn reply_next_read(&self, status: StatusCode, body: &str) {
        self.fail_next_read(status, body);
    }

    /// Answer the next write with this exact status and body, storing nothing
    pub fn reply_next_write(&self, status: StatusCode, body: &str) {
        self.fail_next_write(status, body);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn reads(&self) -> usize {
        self.count("GET")
    }

    pub fn writes(&self) -> usize {
        self.count("PUT")
    }

    /// `sha` of every write attempt, in order
    pub fn write_shas(&self) -> Vec<Option<String>> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "PUT")
            .map(|r| r.sha)
            .collect()
    }

    fn count(&self, method: &str) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }
}

impl Drop for MockGitHub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

fn record(
    repo: &mut MockRepo,
    method: &'static str,
    path: &str,
    headers: &HeaderMap,
    sha: Option<String>,
) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    repo.requests.push(RecordedRequest {
        method,
        path: path.to_string(),
        authorization: header("authorization"),
        accept: header("accept"),
        api_version: header("x-github-api-version"),
        sha,
    });
}

#[derive(Deserialize)]
struct ReadQuery {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

async fn read_file(
    State(state): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(query): Query<ReadQuery>,
    headers: HeaderMap,
) -> Response {
    let mut repo = state.lock().unwrap();
    record(&mut repo, "GET", &path, &headers, None);

    if let Some((status, body)) = repo.read_failures.pop_front() {
        return (status, body).into_response();
    }

    let branch = query.git_ref.unwrap_or_else(|| "main".to_string());
    match repo.files.get(&(branch, path.clone())) {
        Some(file) => {
            // GitHub wraps base64 content at 60 columns
            let encoded = STANDARD.encode(&file.content);
            let wrapped: String = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| format!("{}\n", std::str::from_utf8(c).unwrap()))
                .collect();
            Json(json!({
                "type": "file",
                "encoding": "base64",
                "path": path,
                "size": file.content.len(),
                "sha": file.sha,
                "content": wrapped,
            }))
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"message": "Not Found", "status": "404"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct WriteBody {
    message: String,
    content: String,
    branch: String,
    sha: Option<String>,
}

async fn write_file(
    State(state): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<WriteBody>,
) -> Response {
    let mut repo = state.lock().unwrap();
    record(&mut repo, "PUT", &path, &headers, body.sha.clone());

    if let Some((status, text)) = repo.write_failures.pop_front() {
        return (status, text).into_response();
    }

    let Ok(content) = STANDARD.decode(body.content.as_bytes()) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64").into_response();
    };
    let key = (body.branch.clone(), path.clone());

    let created = match (repo.files.get(&key), body.sha.as_deref()) {
        (Some(_), None) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "Invalid request.\n\n\"sha\" wasn't supplied."})),
            )
                .into_response();
        }
        (Some(existing), Some(sha)) if existing.sha != sha => {
            return (
                StatusCode::CONFLICT,
                Json(json!({"message": format!("{} does not match {}", path, sha)})),
            )
                .into_response();
        }
        (Some(_), Some(_)) => false,
        (None, _) => true,
    };

    let sha = blob_sha(&content);
    repo.files.insert(
        key,
        StoredFile {
            content,
            sha: sha.clone(),
        },
    );

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "content": {"path": path, "sha": sha},
            "commit": {"sha": blob_sha(body.message.as_bytes()), "message": body.message},
        })),
    )
        .into_response()
}
