//! Shared HTTP plumbing: client construction and cancellable GET requests.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tooldeck_core::{Error, Result, Settings};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("tooldeck/", env!("CARGO_PKG_VERSION"));

/// Build a client honouring the configured timeout.
///
/// # Errors
///
/// Fails only if the TLS backend cannot be initialized.
pub fn client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(settings.http_timeout())
        .build()
        .map_err(|e| Error::configuration(format!("failed to create HTTP client: {e}")))
}

/// Send a GET request, failing on non-success statuses.
///
/// # Errors
///
/// [`Error::Transport`] for connection failures, [`Error::Http`] for non-2xx
/// responses and [`Error::Cancelled`] if `cancel` fires first.
pub async fn get(
    client: &Client,
    url: &str,
    token: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Response> {
    debug!(%url, authenticated = token.is_some(), "GET");
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = tokio::select! {
        response = request.send() => response.map_err(|e| Error::transport(url, e.to_string()))?,
        () = cancel.cancelled() => return Err(Error::cancelled(format!("GET {url}"))),
    };

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// GET `url` and return the body as text.
///
/// # Errors
///
/// See [`get`]; body read failures are transport errors.
pub async fn get_text(
    client: &Client,
    url: &str,
    token: Option<&str>,
    cancel: &CancellationToken,
) -> Result<String> {
    let response = get(client, url, token, cancel).await?;
    tokio::select! {
        text = response.text() => text.map_err(|e| Error::transport(url, e.to_string())),
        () = cancel.cancelled() => Err(Error::cancelled(format!("GET {url}"))),
    }
}

/// GET `url` and decode the body as JSON.
///
/// # Errors
///
/// See [`get`]; undecodable bodies are [`Error::MalformedResponse`].
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    token: Option<&str>,
    cancel: &CancellationToken,
) -> Result<T> {
    let text = get_text(client, url, token, cancel).await?;
    serde_json::from_str(&text).map_err(|e| Error::malformed(url, e.to_string()))
}
