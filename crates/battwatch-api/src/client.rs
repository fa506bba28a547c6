// Domoticz JSON API client
//
// Wraps `reqwest::Client` with base-URL joining and envelope checking.
// Response routing stays out of this crate: callers receive the
// envelope with its `title` tag and decide what the payload means.

use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::ApiEnvelope;
use crate::request::ApiRequest;
use crate::transport::TransportConfig;

/// HTTP client for a Domoticz server's `/json.htm` API.
///
/// Stateless beyond the connection pool -- the API needs no session,
/// no cookies and no authentication headers.
pub struct DomoClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DomoClient {
    /// Build a client from a server base URL and transport settings.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Build a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute one request and unwrap the response envelope.
    ///
    /// Fails on transport errors, non-2xx statuses, and envelope
    /// `status` values other than `"OK"`. The caller logs and absorbs
    /// all of these; the next periodic poll re-converges.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiEnvelope, Error> {
        let url = self.base_url.join(&request.url).map_err(Error::InvalidUrl)?;
        debug!(%url, "dispatching request");

        let resp = self
            .http
            .request(request.method.clone(), url)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let envelope: ApiEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;

        trace!(title = %envelope.title, entries = envelope.result.len(), "envelope received");

        if envelope.status != "OK" {
            return Err(Error::Api {
                status: envelope.status,
                title: envelope.title,
            });
        }
        Ok(envelope)
    }
}
