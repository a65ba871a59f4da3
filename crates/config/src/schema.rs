use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub server: ServerConfig,
    pub transmit: TransmitConfig,
}

impl MurmurConfig {
    /// Check values that serde cannot reject on its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.server.realm_url)
            .map_err(|e| anyhow::anyhow!("invalid server.realm_url {:?}: {e}", self.server.realm_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server.realm_url must be http(s), got {}", url.scheme());
        }
        if !self.server.messages_path.starts_with('/') {
            anyhow::bail!("server.messages_path must start with '/'");
        }
        if self.server.email.is_some() != self.server.api_key.is_some() {
            anyhow::bail!("server.email and server.api_key must be set together");
        }
        Ok(())
    }
}

/// Chat server the client talks to.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the organization, e.g. "https://chat.example.com".
    pub realm_url: String,
    /// Message-creation endpoint, relative to `realm_url`.
    pub messages_path: String,
    /// Account e-mail for HTTP basic auth. Session-authenticated clients leave
    /// this unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        serialize_with = "serialize_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("realm_url", &self.realm_url)
            .field("messages_path", &self.messages_path)
            .field("email", &self.email)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            realm_url: "http://localhost:9991".into(),
            messages_path: "/json/messages".into(),
            email: None,
            api_key: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_str(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Send pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransmitConfig {
    /// How long after the server ack the message event may take before the
    /// event queue is restarted.
    pub event_receipt_timeout_secs: u64,
    /// Transport-level timeout for the send request.
    pub request_timeout_secs: u64,
}

impl TransmitConfig {
    #[must_use]
    pub fn event_receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.event_receipt_timeout_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            event_receipt_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}
