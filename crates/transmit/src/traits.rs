//! Seams to the collaborators that own the event stream, reloads, the
//! user/stream directory, and the HTTP transport.

use {
    async_trait::async_trait,
    murmur_common::{StreamId, UserId},
    serde_json::Value,
};

use crate::{
    transport::TransportError,
    types::{Message, ReloadOptions, SendMessageRequest},
};

/// The long-polling event stream client.
pub trait EventQueue: Send + Sync {
    /// Id of the registered event queue, if one is active.
    fn queue_id(&self) -> Option<String>;

    /// Tear down and re-establish the event stream.
    fn restart_event_queue(&self);
}

/// The client reload machinery.
pub trait Reloader: Send + Sync {
    /// Whether the server has asked for a reload that has not happened yet.
    fn is_pending(&self) -> bool;

    fn initiate(&self, options: ReloadOptions);
}

/// User and stream lookups needed to address replies.
pub trait Directory: Send + Sync {
    fn current_user_id(&self) -> UserId;

    fn stream_name(&self, stream_id: StreamId) -> Option<String>;

    /// Markup that mentions the given user.
    fn mention_syntax(&self, full_name: &str, user_id: UserId) -> String;

    /// Comma-separated e-mails to address a reply to a direct message, or
    /// `None` when the message is not a direct message or has no recipients.
    fn pm_reply_to(&self, message: &Message) -> Option<String>;
}

/// Posts message-creation requests.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Submit `request`, returning the decoded response body on success.
    async fn post_message(&self, request: &SendMessageRequest) -> Result<Value, TransportError>;
}
