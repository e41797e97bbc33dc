//! Single-use loopback listener that receives the OAuth redirect.
//!
//! The listener is owned by a [`CallbackServer`] guard for the duration of one
//! authorization attempt. It is shut down on success, on failure and on
//! timeout, and aborted outright if the guard is dropped while still running.

use crate::{AuthError, Credential, TokenEndpoint};
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// Path the provider redirects the browser to
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Upper bound on flushing the final browser response during shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = r#"<html>
  <body style="font-family: sans-serif; text-align: center; padding: 50px;">
    <h1>Authentication Successful!</h1>
    <p>You can close this window and return to the terminal.</p>
  </body>
</html>"#;

type Outcome = Result<Credential, AuthError>;

/// Everything the callback handler needs to finish the exchange on its own.
pub(crate) struct CodeExchange {
    pub(crate) endpoint: Arc<dyn TokenEndpoint>,
    pub(crate) verifier: String,
    pub(crate) redirect_uri: String,
    pub(crate) token_path: PathBuf,
}

/// Taken by the first callback; `accepted` fires before the exchange starts.
struct Reply {
    accepted: oneshot::Sender<()>,
    outcome: oneshot::Sender<Outcome>,
}

#[derive(Clone)]
struct CallbackState {
    exchange: Arc<CodeExchange>,
    reply: Arc<Mutex<Option<Reply>>>,
}

#[derive(Deserialize)]
struct AuthCallback {
    code: Option<String>,
    error: Option<String>,
}

/// Running callback listener. Close it with [`CallbackServer::close`].
pub(crate) struct CallbackServer {
    addr: SocketAddr,
    accepted: Option<oneshot::Receiver<()>>,
    outcome: Option<oneshot::Receiver<Outcome>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:<port>` and start serving the callback route.
    pub(crate) async fn bind(port: u16, exchange: CodeExchange) -> Result<Self, AuthError> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| AuthError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AuthError::Bind { addr, source })?;

        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state = CallbackState {
            exchange: Arc::new(exchange),
            reply: Arc::new(Mutex::new(Some(Reply {
                accepted: accepted_tx,
                outcome: outcome_tx,
            }))),
        };

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .fallback(not_found)
            .with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        });
        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::warn!(error = %e, "callback listener exited with error");
            }
        });

        tracing::debug!(addr = %local_addr, "callback listener started");

        Ok(Self {
            addr: local_addr,
            accepted: Some(accepted_rx),
            outcome: Some(outcome_rx),
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the redirect, then close the listener whatever the outcome.
    ///
    /// `timeout` bounds only the wait for a callback to arrive. Once one is
    /// accepted its exchange runs to completion, so the page shown in the
    /// browser and the returned outcome always agree.
    pub(crate) async fn wait(mut self, timeout: Duration) -> Outcome {
        let outcome = match (self.accepted.take(), self.outcome.take()) {
            (Some(accepted), Some(outcome)) => {
                match tokio::time::timeout(timeout, accepted).await {
                    Ok(Ok(())) => outcome.await.unwrap_or(Err(AuthError::CallbackDropped)),
                    Ok(Err(_)) => Err(AuthError::CallbackDropped),
                    Err(_) => {
                        tracing::warn!(?timeout, "no OAuth callback received");
                        Err(AuthError::Timeout)
                    }
                }
            }
            _ => Err(AuthError::CallbackDropped),
        };

        self.close().await;
        outcome
    }

    /// Stop accepting, let the in-flight response finish, then release the port.
    pub(crate) async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }
        tracing::debug!(addr = %self.addr, "callback listener closed");
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<AuthCallback>,
) -> Response {
    let Some(Reply { accepted, outcome }) = state.reply.lock().await.take() else {
        return (StatusCode::CONFLICT, "Authorization already handled").into_response();
    };
    let _ = accepted.send(());

    tracing::info!("received OAuth callback");

    if let Some(error) = params.error {
        let response = (
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {}", error),
        )
            .into_response();
        let _ = outcome.send(Err(AuthError::Denied(error)));
        return response;
    }

    let Some(code) = params.code else {
        let _ = outcome.send(Err(AuthError::NoCode));
        return (StatusCode::BAD_REQUEST, "No code received").into_response();
    };

    let exchange = &state.exchange;
    let result = match exchange
        .endpoint
        .exchange_code(&code, &exchange.verifier, &exchange.redirect_uri)
        .await
    {
        Ok(credential) => credential.save(&exchange.token_path).map(|()| credential),
        Err(e) => Err(e),
    };

    match result {
        Ok(credential) => {
            tracing::info!(path = %exchange.token_path.display(), "token obtained and saved");
            let _ = outcome.send(Ok(credential));
            Html(SUCCESS_PAGE).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "authentication error");
            let response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication failed: {}", e),
            )
                .into_response();
            let _ = outcome.send(Err(e));
            response
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
