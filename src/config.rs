use std::path::{Path, PathBuf};
use yt_oauth::{CALLBACK_PATH, OAUTH_CALLBACK_PORT, OAuthConfig};

pub const ENV_CLIENT_ID: &str = "YOUTUBE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "YOUTUBE_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "YOUTUBE_REDIRECT_URI";
pub const ENV_TOKEN_PATH: &str = "YOUTUBE_TOKEN_PATH";

pub const DEFAULT_TOKEN_FILE: &str = ".youtube-token.json";
const ENV_FILE: &str = ".env";
const APP_DIR: &str = "yt-upload";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "missing {0} in .env; create OAuth2 credentials (Desktop app) for the \
         YouTube Data API v3 at console.cloud.google.com"
    )]
    MissingVar(&'static str),

    #[error("invalid YOUTUBE_REDIRECT_URI '{uri}': {reason}")]
    InvalidRedirectUri { uri: String, reason: String },
}

/// Client identity and local paths for the OAuth flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub callback_port: u16,
    pub token_path: PathBuf,
}

impl AppConfig {
    /// Read `<base>/.env` (if any) and the process environment.
    ///
    /// Both `.env` and the token file live in [`base_dir`], never in the
    /// working directory, so the tool behaves the same wherever it is run.
    pub fn load() -> Result<Self, ConfigError> {
        let base = base_dir();
        let env_file = base.join(ENV_FILE);
        match dotenvy::from_path(&env_file) {
            Ok(()) => tracing::debug!(path = %env_file.display(), "loaded environment file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(path = %env_file.display(), error = %e, "ignoring bad .env"),
        }
        Self::from_lookup(&base, |key| std::env::var(key).ok())
    }

    /// Relative token paths are resolved against `base`.
    pub fn from_lookup(
        base: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        let client_id = required(ENV_CLIENT_ID)?;
        let client_secret = required(ENV_CLIENT_SECRET)?;

        let (redirect_uri, callback_port) = match lookup(ENV_REDIRECT_URI) {
            Some(uri) if !uri.trim().is_empty() => {
                let port = callback_port_of(&uri)?;
                (uri, port)
            }
            _ => (
                format!("http://127.0.0.1:{}{}", OAUTH_CALLBACK_PORT, CALLBACK_PATH),
                OAUTH_CALLBACK_PORT,
            ),
        };

        let token_path = base.join(
            lookup(ENV_TOKEN_PATH)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string()),
        );

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            callback_port,
            token_path,
        })
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.token_path.clone(),
        )
        .with_redirect(self.redirect_uri.clone(), self.callback_port)
    }
}

/// Per-user directory holding `.env` and the token file.
///
/// `<config dir>/yt-upload` (e.g. `~/.config/yt-upload`), or the directory of
/// the executable on platforms without one.
pub fn base_dir() -> PathBuf {
    if let Some(config) = dirs::config_dir() {
        return config.join(APP_DIR);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The listener serves only the callback path, so the redirect must match it.
fn callback_port_of(uri: &str) -> Result<u16, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidRedirectUri {
        uri: uri.to_string(),
        reason,
    };

    let url = reqwest::Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("loopback redirect must use http".to_string()));
    }
    if url.path() != CALLBACK_PATH {
        return Err(invalid(format!("path must be {}", CALLBACK_PATH)));
    }
    url.port_or_known_default()
        .ok_or_else(|| invalid("no port".to_string()))
}
