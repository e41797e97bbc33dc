use std::path::PathBuf;

/// Failures of the credential lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no code received")]
    NoCode,

    #[error("timeout")]
    Timeout,

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("credential has no refresh token")]
    MissingRefreshToken,

    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to bind callback listener on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("token file '{}': {source}", path.display())]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("token file '{}' is not a valid credential: {source}", path.display())]
    TokenFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("callback listener stopped before authorization completed")]
    CallbackDropped,
}
