//! Desktop browser sign-in over a loopback redirect
//!
//! Opens the provider's login page in the system browser and serves the
//! redirect URI on `127.0.0.1` until the provider calls back.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::RawQuery;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use bike_common::auth::{ExternalUserAgent, UserAgentError};
use bike_domain::OAuthSettings;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::{Host, Url};

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Complete</title></head>
<body><h1>Sign-in Successful</h1><p>You can close this window and return to the app.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in Failed</title></head>
<body><h1>Sign-in Failed</h1><p>The provider did not return an authorization code.</p></body>
</html>"#;

/// Launches the login page; receives the full authorization URL
pub type BrowserOpener = Arc<dyn Fn(&Url) -> std::io::Result<()> + Send + Sync>;

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<Option<String>>>>>;

/// [`ExternalUserAgent`] for desktop processes
///
/// Only loopback `http` redirect URIs can be served; custom app schemes need
/// a platform web-authentication session instead.
pub struct LoopbackUserAgent {
    redirect_uri: Url,
    bind_addr: SocketAddr,
    timeout: Duration,
    opener: BrowserOpener,
}

impl LoopbackUserAgent {
    /// Serve `redirect_uri`, giving the user `timeout` to finish signing in
    ///
    /// # Errors
    ///
    /// Returns [`UserAgentError::Unavailable`] unless `redirect_uri` is an
    /// `http` URL on a loopback host
    pub fn new(redirect_uri: &str, timeout: Duration) -> Result<Self, UserAgentError> {
        let redirect_uri = Url::parse(redirect_uri).map_err(|e| {
            UserAgentError::Unavailable(format!("invalid redirect URI {redirect_uri}: {e}"))
        })?;

        if redirect_uri.scheme() != "http" {
            return Err(UserAgentError::Unavailable(format!(
                "redirect scheme {} cannot be served from a loopback listener",
                redirect_uri.scheme()
            )));
        }

        let ip = match redirect_uri.host() {
            Some(Host::Ipv4(ip)) if ip.is_loopback() => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) if ip.is_loopback() => IpAddr::V6(ip),
            Some(Host::Domain("localhost")) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            _ => {
                return Err(UserAgentError::Unavailable(format!(
                    "redirect host of {redirect_uri} is not a loopback address"
                )))
            }
        };
        let port = redirect_uri.port_or_known_default().unwrap_or(80);

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            redirect_uri,
            timeout,
            opener: Arc::new(|url: &Url| open::that_detached(url.as_str())),
        })
    }

    /// Build from the OAuth settings' redirect URI and sign-in timeout
    ///
    /// # Errors
    ///
    /// See [`LoopbackUserAgent::new`]
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self, UserAgentError> {
        Self::new(&settings.redirect_uri, Duration::from_secs(settings.sign_in_timeout_secs))
    }

    /// Replace the system browser launcher
    #[must_use]
    pub fn with_opener<F>(mut self, opener: F) -> Self
    where
        F: Fn(&Url) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.opener = Arc::new(opener);
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

impl std::fmt::Debug for LoopbackUserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackUserAgent")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExternalUserAgent for LoopbackUserAgent {
    async fn present(&self, url: &Url, _callback_scheme: &str) -> Result<Url, UserAgentError> {
        let (server, callback) = CallbackServer::start(self.bind_addr, self.redirect_uri.path())
            .await?;

        (self.opener)(url)
            .map_err(|e| UserAgentError::Unavailable(format!("failed to open browser: {e}")))?;
        info!(redirect_uri = %self.redirect_uri, timeout = ?self.timeout, "Waiting for sign-in callback");

        let query = match tokio::time::timeout(self.timeout, callback).await {
            Ok(Ok(query)) => query,
            Ok(Err(_)) => {
                return Err(UserAgentError::Failed(
                    "callback listener stopped before the redirect arrived".into(),
                ))
            }
            Err(_) => return Err(UserAgentError::TimedOut(self.timeout)),
        };

        server.shutdown().await;

        let mut callback_url = self.redirect_uri.clone();
        callback_url.set_query(query.as_deref());
        debug!("Sign-in callback received");
        Ok(callback_url)
    }
}

/// One-shot HTTP listener for the provider redirect
struct CallbackServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Bind `addr` and deliver the first callback's raw query string
    async fn start(
        addr: SocketAddr,
        path: &str,
    ) -> Result<(Self, oneshot::Receiver<Option<String>>), UserAgentError> {
        let listener = TcpListener::bind(addr).await.map_err(|err| {
            UserAgentError::Unavailable(format!("failed to bind sign-in callback listener on {addr}: {err}"))
        })?;

        let (callback_tx, callback_rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(callback_tx)));

        let app = Router::new().route(
            path,
            get(move |query: RawQuery| handle_callback(query, sender.clone())),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!("Sign-in callback server error: {}", err);
            }
        });

        Ok((Self { shutdown_tx: Some(shutdown_tx), handle: Some(handle) }, callback_rx))
    }

    /// Stop serving after in-flight responses are written
    async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("Sign-in callback server panicked: {err}");
                }
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                handle.abort();
            }
        }
    }
}

async fn handle_callback(RawQuery(query): RawQuery, sender: CallbackSender) -> Html<&'static str> {
    let has_code = query
        .as_deref()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "code"))
        .unwrap_or(false);

    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(query);
    }

    if has_code {
        Html(SUCCESS_PAGE)
    } else {
        Html(FAILURE_PAGE)
    }
}
