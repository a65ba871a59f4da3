use std::fmt;

use {
    murmur_common::{MessageId, StreamId, UserId},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Client-generated id for an outgoing message, unique per send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Where an outgoing message is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageTarget {
    /// Channel message; `to` names the stream.
    Stream { topic: String },
    /// Direct message; `to` is a JSON list of recipient e-mails.
    Private,
}

impl MessageTarget {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Stream { .. } => "stream",
            Self::Private => "private",
        }
    }
}

/// Payload of a message-creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub local_id: LocalId,
    pub sender_id: UserId,
    /// Event queue the server should deliver the resulting event to.
    pub queue_id: Option<String>,
    pub to: String,
    pub content: String,
    pub target: MessageTarget,
    /// The message is already tracked from an earlier attempt.
    pub resend: bool,
    pub locally_echoed: bool,
}

impl SendMessageRequest {
    /// Form fields posted to the server. The client-only `resend` and
    /// `locally_echoed` flags are not sent.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("type", self.target.type_name().to_string()),
            ("local_id", self.local_id.to_string()),
            ("sender_id", self.sender_id.to_string()),
            ("to", self.to.clone()),
            ("content", self.content.clone()),
        ];
        if let Some(queue_id) = &self.queue_id {
            fields.push(("queue_id", queue_id.clone()));
        }
        if let MessageTarget::Stream { topic } = &self.target {
            fields.push(("topic", topic.clone()));
        }
        fields
    }
}

/// A received message, as needed to reply to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_full_name: String,
    #[serde(flatten)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    Stream {
        stream_id: StreamId,
        topic: String,
    },
    Private {
        display_recipient: Vec<DisplayRecipient>,
    },
    #[serde(other)]
    Unknown,
}

/// One participant of a direct message conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisplayRecipient {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

/// Arguments to [`crate::Reloader::initiate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReloadOptions {
    /// Reload now rather than waiting for the client to go idle.
    pub immediate: bool,
    /// Preserve the compose box contents across the reload.
    pub save_compose: bool,
    /// Send the preserved composition once the client is back.
    pub send_after_reload: bool,
}

/// How a send ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The server accepted the message; `response` is the raw response body.
    Sent { response: Value },
    /// The send failed. `code` is the server's machine-readable error code, or
    /// empty when the response carried none.
    Failed { message: String, code: String },
    /// The failure was handed to a pending reload, which will resend.
    Reloading,
}

impl SendOutcome {
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}
