use crate::{AuthError, Credential, OAuthConfig, now_millis};
use async_trait::async_trait;
use serde::Deserialize;

/// Lifetime assumed when the provider omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// The two grants the token lifecycle needs from the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange the credential's refresh token for a fresh credential
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;

    /// Exchange an authorization code (plus PKCE verifier) for a credential
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, issued_at_ms: u64) -> Credential {
        let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope: self.scope.unwrap_or_default(),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expiry_date: issued_at_ms.saturating_add(expires_in.saturating_mul(1000)),
        }
    }
}

/// Google's OAuth 2.0 token endpoint over reqwest
#[derive(Debug, Clone)]
pub struct GoogleTokenEndpoint {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
}

impl GoogleTokenEndpoint {
    pub fn new(config: &OAuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
        }
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<Credential, AuthError> {
        let issued_at = now_millis();
        let response = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(AuthError::TokenEndpoint { status, body });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_credential(issued_at))
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or(AuthError::MissingRefreshToken)?;

        tracing::debug!("refreshing OAuth token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let mut refreshed = self.post_form(&params).await?;

        // Google omits the refresh token on refresh responses
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = credential.refresh_token.clone();
        }
        if refreshed.scope.is_empty() {
            refreshed.scope = credential.scope.clone();
        }

        Ok(refreshed)
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<Credential, AuthError> {
        tracing::debug!("exchanging authorization code for tokens");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        self.post_form(&params).await
    }
}

/// Generate PKCE verifier and challenge
pub fn generate_pkce() -> (String, String) {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use rand::Rng;
    use rand::distributions::Alphanumeric;
    use sha2::{Digest, Sha256};

    let verifier: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    // base64url(SHA256(verifier))
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));

    (verifier, challenge)
}

/// Build the consent URL; returns it together with the PKCE verifier.
pub fn generate_auth_url(config: &OAuthConfig) -> (String, String) {
    let (verifier, challenge) = generate_pkce();

    let auth_url = format!(
        "{}?\
        client_id={}&\
        redirect_uri={}&\
        response_type=code&\
        scope={}&\
        code_challenge={}&\
        code_challenge_method=S256&\
        access_type=offline&\
        prompt=consent",
        config.auth_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&config.scopes.join(" ")),
        urlencoding::encode(&challenge),
    );

    (auth_url, verifier)
}
