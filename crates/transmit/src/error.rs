use murmur_common::{FromMessage, MessageId, StreamId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A send was registered twice under the same local id.
    #[error("local id {local_id} is already being tracked")]
    DuplicateLocalId { local_id: String },

    #[error("no stream with id {stream_id}")]
    UnknownStream { stream_id: StreamId },

    #[error("message {message_id} has no direct message recipient")]
    MissingRecipient { message_id: MessageId },

    #[error("message {message_id} has an unknown message type")]
    UnknownMessageType { message_id: MessageId },

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

murmur_common::impl_context!();
