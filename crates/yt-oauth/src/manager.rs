use crate::callback::{CallbackServer, CodeExchange};
use crate::{
    AuthError, Credential, GoogleTokenEndpoint, OAuthConfig, TokenEndpoint, generate_auth_url,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Opens the consent page for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the platform's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        webbrowser::open(url)
    }
}

/// Produces a usable credential: cached, refreshed or freshly authorized.
pub struct TokenManager {
    config: OAuthConfig,
    endpoint: Arc<dyn TokenEndpoint>,
    browser: Box<dyn BrowserLauncher>,
    // One interactive attempt (and listener) at a time.
    authorizing: Mutex<()>,
}

impl TokenManager {
    /// Manager talking to Google's token endpoint and the system browser
    pub fn new(config: OAuthConfig) -> Self {
        let endpoint = Arc::new(GoogleTokenEndpoint::new(&config));
        Self::with_parts(config, endpoint, Box::new(SystemBrowser))
    }

    pub fn with_parts(
        config: OAuthConfig,
        endpoint: Arc<dyn TokenEndpoint>,
        browser: Box<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            config,
            endpoint,
            browser,
            authorizing: Mutex::new(()),
        }
    }

    /// Return a credential whose `expiry_date` lies in the future.
    ///
    /// A persisted, unexpired credential is returned as-is without touching the
    /// network. An expired one is refreshed once; if that fails the interactive
    /// browser flow runs instead of giving up.
    pub async fn obtain_credential(&self) -> Result<Credential, AuthError> {
        if let Some(stored) = self.load_stored() {
            if stored.is_usable() {
                tracing::debug!("using stored OAuth token");
                return Ok(stored);
            }

            if stored.refresh_token.is_some() {
                match self.refresh(&stored).await {
                    Ok(credential) => return Ok(credential),
                    Err(e) => {
                        tracing::warn!(error = %e, "token refresh failed, re-authenticating");
                    }
                }
            }
        }

        self.authorize().await
    }

    /// Run the interactive browser flow regardless of any stored credential.
    pub async fn authorize(&self) -> Result<Credential, AuthError> {
        let _attempt = self.authorizing.lock().await;

        let (auth_url, verifier) = generate_auth_url(&self.config);
        let server = CallbackServer::bind(
            self.config.callback_port,
            CodeExchange {
                endpoint: Arc::clone(&self.endpoint),
                verifier,
                redirect_uri: self.config.redirect_uri.clone(),
                token_path: self.config.token_path.clone(),
            },
        )
        .await?;

        tracing::info!("=== YouTube Authentication ===");
        tracing::info!(
            url = %auth_url,
            listener = %server.local_addr(),
            "opening browser for authentication"
        );
        if let Err(e) = self.browser.open(&auth_url) {
            tracing::warn!(error = %e, "could not open a browser, visit the URL above manually");
        }

        let credential = server.wait(self.config.auth_timeout).await?;
        tracing::info!("authentication successful, token saved");
        Ok(credential)
    }

    async fn refresh(&self, stored: &Credential) -> Result<Credential, AuthError> {
        let credential = self.endpoint.refresh(stored).await?;
        credential.save(&self.config.token_path)?;
        tracing::info!("token refreshed successfully");
        Ok(credential)
    }

    fn load_stored(&self) -> Option<Credential> {
        let path = &self.config.token_path;
        if !path.exists() {
            return None;
        }
        match Credential::load(path) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable token file");
                None
            }
        }
    }
}
