/// GitHub Contents API synchronization
///
/// Reads and writes one JSON document at a fixed path using the blob `sha` as
/// an optimistic-concurrency tag. A save runs in three phases: resolve the
/// tag, write, and on a version conflict recover exactly once (re-read the tag,
/// write again).
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::codec;
use crate::error::{is_conflict_status, SyncError, SyncResult};
use crate::model::{Credential, RemoteDocument, RemoteLocation, VersionTag};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Sync knitting library";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("knit-sync/", env!("CARGO_PKG_VERSION"));

/// Read response; only the fields the sync routine needs
#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: Option<String>,
    #[serde(default)]
    content: Option<String>,
    /// `base64` normally, `none` when the file is too large to inline
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

impl ContentsFile {
    /// Parse the inlined document.
    ///
    /// Only a file that is really empty reads as `{}`; content the API left
    /// out (files over 1 MB come back with `encoding: none`) is an error.
    fn document(&self) -> SyncResult<serde_json::Value> {
        let content = self.content.as_deref().unwrap_or_default();

        match self.encoding.as_deref() {
            None | Some("base64") => {}
            Some(_) if self.size == Some(0) && content.trim().is_empty() => {}
            Some(other) => return Err(SyncError::UnsupportedEncoding(other.to_string())),
        }

        if content.trim().is_empty() && self.size.unwrap_or(0) > 0 {
            return Err(SyncError::UnsupportedEncoding(format!(
                "empty content for a {} byte file",
                self.size.unwrap_or(0)
            )));
        }

        let text = codec::decode_text(content)?;
        if text.trim().is_empty() {
            Ok(serde_json::Value::Object(Default::default()))
        } else {
            Ok(serde_json::from_str(&text)?)
        }
    }
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenFile,
}

#[derive(Debug, Deserialize)]
struct WrittenFile {
    sha: String,
}

/// Contents API client.
///
/// Holds no per-document state: the caller threads the [`VersionTag`]
/// returned by [`ContentsClient::save`] into the next call.
#[derive(Debug, Clone)]
pub struct ContentsClient {
    client: Client,
    api_base: Url,
    commit_message: String,
}

impl ContentsClient {
    /// Client for api.github.com. No timeout is set; the transport default applies.
    pub fn new() -> SyncResult<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let api_base = Url::parse(DEFAULT_API_BASE)
            .map_err(|e| SyncError::InvalidLocation(e.to_string()))?;

        Ok(Self {
            client,
            api_base,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        })
    }

    /// Point the client at another API root (GitHub Enterprise, a local mock)
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = message.into();
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Fetch the document and the tag of its current content.
    ///
    /// An empty file reads as `{}`; a file the API did not inline fails with
    /// [`SyncError::UnsupportedEncoding`]. Any non-2xx status fails with
    /// [`SyncError::RemoteRead`]; nothing is retried.
    pub async fn fetch(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
    ) -> SyncResult<RemoteDocument> {
        let file = self.read_file(location, credential).await?;
        let document = file.document()?;

        Ok(RemoteDocument {
            document,
            sha: file.sha.map(VersionTag::from),
        })
    }

    /// Current tag only. The content is not decoded, so a file that no longer
    /// parses can still be overwritten.
    async fn current_sha(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
    ) -> SyncResult<Option<VersionTag>> {
        let file = self.read_file(location, credential).await?;
        Ok(file.sha.map(VersionTag::from))
    }

    async fn read_file(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
    ) -> SyncResult<ContentsFile> {
        let url = location.read_url(&self.api_base)?;
        tracing::debug!(%location, "reading remote document");

        let response = self
            .request(self.client.get(url), credential)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            return Err(SyncError::RemoteRead { status, body });
        }

        parse_body(response).await
    }

    /// Fetch and deserialize into a caller type, returning the tag alongside
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
    ) -> SyncResult<(T, Option<VersionTag>)> {
        let RemoteDocument { document, sha } = self.fetch(location, credential).await?;
        Ok((serde_json::from_value(document)?, sha))
    }

    /// Write `document` and return the tag of the new content.
    ///
    /// With `known_sha` the write goes straight out; without it the current
    /// tag is looked up first. A 409/422 answer triggers one recovery cycle.
    /// The returned tag must be used for the next save.
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
        document: &T,
        known_sha: Option<&VersionTag>,
    ) -> SyncResult<VersionTag> {
        let content = codec::encode_text(&serde_json::to_string(document)?);

        let sha = match known_sha {
            Some(sha) => Some(sha.clone()),
            None => self.resolve_sha(location, credential).await,
        };

        let first = match self.write(location, credential, &content, sha.as_ref()).await {
            Ok(sha) => return Ok(sha),
            Err(err) if err.is_conflict() => err,
            Err(err) => return Err(err),
        };

        // One recovery cycle only. If the tag cannot be re-read, the original
        // write failure is what the caller sees.
        tracing::info!(%location, error = %first, "version conflict, refreshing sha");
        let fresh = match self.current_sha(location, credential).await {
            Ok(sha) => sha,
            Err(err) => {
                tracing::warn!(%location, error = %err, "sha refresh failed, giving up");
                return Err(first);
            }
        };

        self.write(location, credential, &content, fresh.as_ref())
            .await
    }

    /// Best-effort tag discovery before a write without a known tag.
    ///
    /// A missing file means "create". Other failures are not fatal here and
    /// also fall through to a tagless write; they are logged, since a transient
    /// error is indistinguishable from a missing file at this point.
    async fn resolve_sha(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
    ) -> Option<VersionTag> {
        match self.current_sha(location, credential).await {
            Ok(sha) => sha,
            Err(err) if err.is_not_found() => {
                tracing::debug!(%location, "no remote document yet, creating");
                None
            }
            Err(err) => {
                tracing::warn!(%location, error = %err, "sha lookup failed, writing without sha");
                None
            }
        }
    }

    async fn write(
        &self,
        location: &RemoteLocation,
        credential: Option<&Credential>,
        content: &str,
        sha: Option<&VersionTag>,
    ) -> SyncResult<VersionTag> {
        let url = location.contents_url(&self.api_base)?;
        let body = WriteRequest {
            message: &self.commit_message,
            content,
            branch: &location.branch,
            sha: sha.map(VersionTag::as_str),
        };
        tracing::debug!(%location, sha = ?body.sha, "writing remote document");

        let response = self
            .request(self.client.put(url), credential)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = status_and_body(response).await;
            if is_conflict_status(status) {
                tracing::debug!(%location, %status, "write rejected as conflict");
            }
            return Err(SyncError::RemoteWrite { status, body });
        }

        let written: WriteResponse = parse_body(response).await?;
        Ok(VersionTag::from(written.content.sha))
    }

    fn request(
        &self,
        builder: RequestBuilder,
        credential: Option<&Credential>,
    ) -> RequestBuilder {
        let builder = builder
            .header(header::ACCEPT, ACCEPT)
            .header(API_VERSION_HEADER, API_VERSION);

        match credential {
            Some(credential) => builder.header(header::AUTHORIZATION, credential.bearer()),
            None => builder,
        }
    }
}

/// Success bodies that do not match the expected shape are reported as JSON
/// errors; only failures while receiving the bytes count as transport errors.
async fn parse_body<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn status_and_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}
