use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod callback;
mod endpoint;
mod error;
mod manager;

pub use callback::CALLBACK_PATH;
pub use endpoint::{GoogleTokenEndpoint, TokenEndpoint, generate_auth_url, generate_pkce};
pub use error::AuthError;
pub use manager::{BrowserLauncher, SystemBrowser, TokenManager};

/// Default OAuth callback port
pub const OAUTH_CALLBACK_PORT: u16 = 3333;

/// Scopes requested during interactive authorization
pub const YOUTUBE_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/youtube.upload",
    "https://www.googleapis.com/auth/youtube",
    "https://www.googleapis.com/auth/youtube.force-ssl",
];

/// How long the callback listener waits for the browser redirect
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// OAuth 2.0 credential as persisted in the token file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token for getting new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated granted scopes
    #[serde(default)]
    pub scope: String,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiry time in milliseconds since epoch
    pub expiry_date: u64,
}

impl Credential {
    /// A credential is usable only while its expiry lies strictly in the future.
    pub fn is_usable_at(&self, now_ms: u64) -> bool {
        self.expiry_date > now_ms
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(now_millis())
    }

    /// Load credential from file
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| AuthError::TokenFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| AuthError::TokenFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save credential to file with secure permissions
    pub fn save(&self, path: &Path) -> Result<(), AuthError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|source| AuthError::TokenFormat {
                path: path.to_path_buf(),
                source,
            })?;

        let io_err = |source| AuthError::TokenFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)?;

        // Owner read/write only on Unix-like systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path, permissions).map_err(io_err)?;
        }

        Ok(())
    }
}

/// OAuth configuration
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered for the desktop client
    pub redirect_uri: String,
    /// OAuth scopes requested during authorization
    pub scopes: Vec<String>,
    /// Loopback port the callback listener binds to
    pub callback_port: u16,
    /// Where the credential is persisted
    pub token_path: PathBuf,
    /// Upper bound on waiting for the browser redirect
    pub auth_timeout: Duration,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Create new OAuth configuration with YouTube upload defaults
    pub fn new(client_id: String, client_secret: String, token_path: impl Into<PathBuf>) -> Self {
        Self {
            client_id,
            client_secret,
            // The listener binds IPv4 loopback only; "localhost" may resolve to ::1.
            redirect_uri: format!(
                "http://127.0.0.1:{}{}",
                OAUTH_CALLBACK_PORT, CALLBACK_PATH
            ),
            scopes: YOUTUBE_SCOPES.iter().map(|s| s.to_string()).collect(),
            callback_port: OAUTH_CALLBACK_PORT,
            token_path: token_path.into(),
            auth_timeout: AUTH_TIMEOUT,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Use a different redirect URI; the listener port follows it.
    pub fn with_redirect(mut self, redirect_uri: String, callback_port: u16) -> Self {
        self.redirect_uri = redirect_uri;
        self.callback_port = callback_port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expiry_date: u64) -> Credential {
        Credential {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            scope: YOUTUBE_SCOPES.join(" "),
            token_type: "Bearer".to_string(),
            expiry_date,
        }
    }

    #[test]
    fn usable_only_strictly_before_expiry() {
        let cred = credential(1_000);
        assert!(cred.is_usable_at(999));
        assert!(!cred.is_usable_at(1_000));
        assert!(!cred.is_usable_at(1_001));
    }

    #[test]
    fn save_then_load_keeps_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".youtube-token.json");
        let cred = credential(now_millis() + 60_000);

        cred.save(&path).unwrap();
        assert_eq!(Credential::load(&path).unwrap(), cred);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn reads_token_files_written_by_other_clients() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{
                "access_token": "abc",
                "token_type": "Bearer",
                "expiry_date": 1700000000000,
                "id_token": "ignored"
            }"#,
        )
        .unwrap();

        let cred = Credential::load(&path).unwrap();
        assert_eq!(cred.access_token, "abc");
        assert_eq!(cred.refresh_token, None);
        assert_eq!(cred.scope, "");
        assert_eq!(cred.expiry_date, 1_700_000_000_000);
    }

    #[test]
    fn garbage_token_file_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            Credential::load(&path),
            Err(AuthError::TokenFormat { .. })
        ));
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yt-upload").join(".youtube-token.json");
        let cred = Credential {
            access_token: "a".into(),
            refresh_token: None,
            scope: String::new(),
            token_type: "Bearer".into(),
            expiry_date: 1,
        };

        cred.save(&path).unwrap();
        assert_eq!(Credential::load(&path).unwrap(), cred);
    }

    #[test]
    fn default_config_targets_google_and_port_3333() {
        let config = OAuthConfig::new("id".into(), "secret".into(), "token.json");
        assert_eq!(config.redirect_uri, "http://127.0.0.1:3333/oauth2callback");
        assert_eq!(config.callback_port, 3333);
        assert_eq!(config.scopes.len(), 3);
        assert_eq!(config.auth_timeout, Duration::from_secs(120));
    }
}
