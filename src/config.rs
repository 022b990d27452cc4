/// Sync settings
///
/// Where the library lives and how to authenticate. Loaded from a TOML file
/// or from `KNIT_SYNC_*` environment variables (a `.env` file is honored).
/// The sync client never reads these itself; they are turned into plain call
/// parameters with [`SyncSettings::location`] and [`SyncSettings::credential`].
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::model::{Credential, RemoteLocation};
use crate::sync::ContentsClient;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_PATH: &str = "knitting.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_path")]
    pub path: String,

    /// Personal access token (optional, public repositories are readable without one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// API root, for GitHub Enterprise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

impl SyncSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let owner = get("KNIT_SYNC_OWNER").context("KNIT_SYNC_OWNER not set")?;
        let repo = get("KNIT_SYNC_REPO").context("KNIT_SYNC_REPO not set")?;

        let settings = Self {
            owner,
            repo,
            branch: get("KNIT_SYNC_BRANCH").unwrap_or_else(default_branch),
            path: get("KNIT_SYNC_PATH").unwrap_or_else(default_path),
            token: get("KNIT_SYNC_TOKEN"),
            api_base: get("KNIT_SYNC_API_BASE"),
            commit_message: get("KNIT_SYNC_COMMIT_MESSAGE"),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.location()
            .validate()
            .context("Settings do not name a single file")?;
        if let Some(base) = &self.api_base {
            let url = Url::parse(base).with_context(|| format!("Invalid api_base {base}"))?;
            if url.cannot_be_a_base() {
                bail!("api_base {base} cannot be used as a base URL");
            }
        }
        Ok(())
    }

    pub fn location(&self) -> RemoteLocation {
        RemoteLocation::new(&self.owner, &self.repo, &self.branch, &self.path)
    }

    pub fn credential(&self) -> Option<Credential> {
        Credential::from_token(self.token.as_deref())
    }

    /// Build a client honoring `api_base` and `commit_message`
    pub fn client(&self) -> Result<ContentsClient> {
        let mut client = ContentsClient::new()?;
        if let Some(base) = &self.api_base {
            client = client.with_api_base(Url::parse(base)?);
        }
        if let Some(message) = &self.commit_message {
            client = client.with_commit_message(message.clone());
        }
        Ok(client)
    }
}
