//! Portrait QA Adapters - External adapters for portrait-qa.
//!
//! This crate provides adapters for:
//! - Filesystem photo discovery
//! - Filesystem object storage
//! - HTTP feature providers and image fetching

pub mod fetch;
pub mod fs;
pub mod http;
pub mod providers;
pub mod storage;

pub use fetch::HttpImageFetcher;
pub use fs::FsImageSource;
pub use http::HttpSettings;
pub use providers::{DeepAnalysisProvider, VisionProvider};
pub use storage::FsObjectStorage;
