//! Upload videos to YouTube with metadata, thumbnail, subtitles and playlist.

pub mod api;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;

pub use api::{VideoApi, YouTubeClient};
pub use config::AppConfig;
pub use error::UploadError;
pub use orchestrator::{PostUploadStep, Uploader};
pub use request::{Privacy, UploadRequest, UploadResult};
