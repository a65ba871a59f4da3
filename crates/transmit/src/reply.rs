//! Application-triggered replies.
//!
//! Used by widget-aware bots that offer canned one-click answers: the click
//! sends a reply to the message the widget lives in, on the user's behalf.

use tracing::{debug, error};

use crate::{
    error::{Error, Result},
    transmit::Transmitter,
    types::{LocalId, Message, MessageKind, MessageTarget, SendMessageRequest, SendOutcome},
};

impl Transmitter {
    /// Reply to `message` with `content`.
    ///
    /// Channel replies go to the same stream and topic and mention the
    /// original sender; direct message replies go to the same participants.
    /// The send runs in the background and its outcome is only logged; a
    /// failed reply is dropped from the tracking table since nothing will
    /// resend it. Returns the local id of the reply.
    ///
    /// Must be called within a tokio runtime: the send is spawned.
    pub fn reply_message(&self, message: &Message, content: &str) -> Result<LocalId> {
        let local_id = self.sent.get_new_local_id();
        let sender_id = self.directory.current_user_id();
        let queue_id = self.events.queue_id();

        let (to, content, target) = match &message.kind {
            MessageKind::Stream { stream_id, topic } => {
                let Some(stream_name) = self.directory.stream_name(*stream_id) else {
                    error!(message_id = %message.id, stream_id = %stream_id, "reply to a message in an unknown stream");
                    return Err(Error::UnknownStream {
                        stream_id: *stream_id,
                    });
                };
                let mention = self
                    .directory
                    .mention_syntax(&message.sender_full_name, message.sender_id);
                (
                    stream_name,
                    format!("{mention} {content}"),
                    MessageTarget::Stream {
                        topic: topic.clone(),
                    },
                )
            },
            MessageKind::Private { .. } => {
                let Some(recipients) = self.directory.pm_reply_to(message) else {
                    error!(message_id = %message.id, "reply to a direct message without recipients");
                    return Err(Error::MissingRecipient {
                        message_id: message.id,
                    });
                };
                let emails: Vec<&str> = recipients.split(',').collect();
                (
                    serde_json::to_string(&emails)?,
                    content.to_string(),
                    MessageTarget::Private,
                )
            },
            MessageKind::Unknown => {
                error!(message_id = %message.id, content, "unknown message type");
                return Err(Error::UnknownMessageType {
                    message_id: message.id,
                });
            },
        };

        let request = SendMessageRequest {
            local_id: local_id.clone(),
            sender_id,
            queue_id,
            to,
            content,
            target,
            resend: false,
            locally_echoed: false,
        };

        // TODO: let the widget pass a handler so it can show the outcome.
        let send = self.send_message(request, |_| {})?;
        let sent = self.sent.clone();
        let reply_id = local_id.clone();
        tokio::spawn(async move {
            let outcome = send.await;
            debug!(local_id = %reply_id, ?outcome, "widget reply finished");
            if matches!(outcome, SendOutcome::Failed { .. }) {
                sent.forget(&reply_id);
            }
        });
        Ok(local_id)
    }
}
