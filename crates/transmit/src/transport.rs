//! HTTP transport for message-creation requests.

use std::time::Duration;

use {
    async_trait::async_trait,
    murmur_config::MurmurConfig,
    secrecy::{ExposeSecret, Secret},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::{
    error::{Context, Result},
    traits::MessageTransport,
    types::SendMessageRequest,
};

/// Why a send request did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status. `body` is the decoded
    /// JSON body, if it was JSON.
    #[error("server returned HTTP {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("network error: {message}")]
    Network { message: String },
}

impl TransportError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    fn body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => body.as_ref(),
            Self::Timeout | Self::Network { .. } => None,
        }
    }

    /// String field `key` of a JSON object body. Any other body shape,
    /// arrays included, has no fields.
    fn body_field(body: &Value, key: &str) -> Option<String> {
        body.as_object()
            .and_then(|fields| fields.get(key))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    /// `message`, extended with the server's explanation for 4xx responses.
    /// Other failures carry nothing worth showing to the user.
    #[must_use]
    pub fn error_message(&self, message: &str) -> String {
        let server_msg = match self {
            Self::Status { status: 400..=499, body: Some(body) } => {
                Self::body_field(body, "msg")
            },
            _ => None,
        };
        match server_msg {
            Some(msg) if message.is_empty() => msg,
            Some(msg) => format!("{message}: {msg}"),
            None => message.to_string(),
        }
    }

    /// Machine-readable error code from the response body, or `""` when the
    /// body is absent or not shaped like `{"code": "..."}`.
    #[must_use]
    pub fn server_code(&self) -> String {
        self.body()
            .and_then(|body| Self::body_field(body, "code"))
            .unwrap_or_default()
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Posts messages to `{realm_url}{messages_path}` as form data.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    basic_auth: Option<(String, Secret<String>)>,
}

impl HttpTransport {
    pub fn new(realm_url: &str, messages_path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for message transport")?;

        Ok(Self {
            client,
            url: format!("{}{}", realm_url.trim_end_matches('/'), messages_path),
            basic_auth: None,
        })
    }

    #[must_use]
    pub fn with_basic_auth(mut self, email: impl Into<String>, api_key: Secret<String>) -> Self {
        self.basic_auth = Some((email.into(), api_key));
        self
    }

    pub fn from_config(config: &MurmurConfig) -> Result<Self> {
        let server = &config.server;
        let transport = Self::new(
            &server.realm_url,
            &server.messages_path,
            config.transmit.request_timeout(),
        )?;
        Ok(match (&server.email, &server.api_key) {
            (Some(email), Some(api_key)) => transport.with_basic_auth(email.clone(), api_key.clone()),
            _ => transport,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MessageTransport for HttpTransport {
    async fn post_message(
        &self,
        request: &SendMessageRequest,
    ) -> std::result::Result<Value, TransportError> {
        let mut req = self.client.post(&self.url).form(&request.form_fields());
        if let Some((email, api_key)) = &self.basic_auth {
            req = req.basic_auth(email, Some(api_key.expose_secret()));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_success() {
            debug!(local_id = %request.local_id, %status, "message accepted");
            return Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)));
        }

        warn!(local_id = %request.local_id, %status, "message rejected");
        Err(TransportError::Status {
            status: status.as_u16(),
            body: serde_json::from_str(&body).ok(),
        })
    }
}
