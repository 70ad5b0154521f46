use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use sandbox::SandboxError;

/// Per-request timeout unless the request sets its own (exec does).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// Key/secret pair sent as `Modal-Key` / `Modal-Secret` headers.
    TokenPair { id: String, secret: String },
}

/// HTTP client for one provider API: connection pool, base URL and credentials.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpClient {
    pub fn new(base_url: &str, auth: Auth) -> sandbox::Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SandboxError::BackendNotAvailable(format!("http client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                auth,
            }),
        })
    }

    /// Build an authenticated request. `path` is appended to the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let req = self.inner.client.request(method, url);
        match &self.inner.auth {
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::TokenPair { id, secret } => {
                req.header("Modal-Key", id).header("Modal-Secret", secret)
            }
        }
    }
}

/// Send a request and decode a JSON body. Errors carry `what`, the status and the body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    what: &str,
) -> Result<T, String> {
    let resp = req.send().await.map_err(|e| format!("{what}: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("{what} {status}: {body}"));
    }

    resp.json()
        .await
        .map_err(|e| format!("{what} decode: {e}"))
}

/// Send a request whose response body is irrelevant.
pub(crate) async fn send_ok(req: RequestBuilder, what: &str) -> Result<(), String> {
    let resp = req.send().await.map_err(|e| format!("{what}: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("{what} {status}: {body}"));
    }
    Ok(())
}
