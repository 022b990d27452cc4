pub mod codec;
pub mod contents;

pub use contents::{ContentsClient, DEFAULT_API_BASE, DEFAULT_COMMIT_MESSAGE};
