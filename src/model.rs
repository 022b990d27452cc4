use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Where the synced document lives: one file on one branch of one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLocation {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Branch the document is read from and committed to
    pub branch: String,

    /// File path inside the repository, `/` separated
    pub path: String,
}

impl RemoteLocation {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            path: path.into(),
        }
    }

    /// Reject locations that cannot address a single file
    pub fn validate(&self) -> SyncResult<()> {
        for (field, value) in [
            ("owner", &self.owner),
            ("repo", &self.repo),
            ("branch", &self.branch),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::InvalidLocation(format!("{field} is empty")));
            }
            if is_dot_segment(value) {
                return Err(SyncError::InvalidLocation(format!("{field} is `{value}`")));
            }
        }
        if self.path_segments().next().is_none() {
            return Err(SyncError::InvalidLocation("path is empty".to_string()));
        }
        // URL normalization would resolve these and address a different file
        if let Some(dot) = self.path_segments().find(|s| is_dot_segment(s)) {
            return Err(SyncError::InvalidLocation(format!(
                "path {} contains a `{dot}` segment",
                self.path
            )));
        }
        Ok(())
    }

    /// Contents endpoint for this file, `{api}/repos/{owner}/{repo}/contents/{path}`.
    /// Each path segment is percent-encoded on its own.
    pub fn contents_url(&self, api_base: &Url) -> SyncResult<Url> {
        self.validate()?;

        let mut url = api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidLocation(format!("{api_base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "contents"])
            .extend(self.path_segments());
        url.set_query(None);
        Ok(url)
    }

    /// Read endpoint, restricted to the configured branch
    pub fn read_url(&self, api_base: &Url) -> SyncResult<Url> {
        let mut url = self.contents_url(api_base)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

fn is_dot_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}:{}", self.owner, self.repo, self.branch, self.path)
    }
}

/// Personal access token sent as a bearer credential.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// `None` for blank input, so an empty settings field means "no credential"
    pub fn from_token(token: Option<&str>) -> Option<Self> {
        token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Self(t.to_string()))
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Content hash reported by the remote store (the blob `sha`).
///
/// Stale as soon as anyone writes the file again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VersionTag {
    fn from(sha: String) -> Self {
        Self(sha)
    }
}

impl From<&str> for VersionTag {
    fn from(sha: &str) -> Self {
        Self(sha.to_string())
    }
}

/// A fetched document together with the tag identifying its exact content
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub document: serde_json::Value,
    pub sha: Option<VersionTag>,
}
