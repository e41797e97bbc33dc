use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot read video file '{}': {source}", path.display())]
    VideoFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read '{}': {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YouTube API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to YouTube failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("YouTube response is missing {0}")]
    MissingField(&'static str),
}
