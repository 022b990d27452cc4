//! # knit-sync - Knitting Library Sync over the GitHub Contents API
//!
//! Keeps a knitting pattern library and the active projects in one JSON file
//! inside a GitHub repository.
//!
//! ## Features
//!
//! - **Optimistic concurrency**: every write carries the blob `sha` it replaces
//! - **Single-shot recovery**: a stale `sha` is refreshed and the write retried once
//! - **UTF-8 safe transport**: content is base64 over UTF-8 bytes
//! - **Typed or opaque documents**: sync a [`Library`] or any `serde` value
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use knit_sync::{ContentsClient, Credential, Library, RemoteLocation};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ContentsClient::new()?;
//!     let location = RemoteLocation::new("ada", "stitches", "main", "knitting.json");
//!     let token = Credential::new("ghp_...");
//!
//!     let (mut library, sha) = client.fetch_as::<Library>(&location, Some(&token)).await?;
//!     library.touch();
//!     let sha = client.save(&location, Some(&token), &library, sha.as_ref()).await?;
//!     println!("saved as {sha}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod library;
pub mod model;
pub mod sync;

// Re-export main types for library consumers
pub use config::SyncSettings;
pub use error::{SyncError, SyncResult};
pub use library::{Library, Pattern, PatternKind, Project};
pub use model::{Credential, RemoteDocument, RemoteLocation, VersionTag};
pub use sync::ContentsClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
