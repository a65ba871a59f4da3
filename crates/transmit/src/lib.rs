//! Outgoing message pipeline.
//!
//! [`Transmitter::send_message`] posts a composed message, tracks its local
//! echo in [`SentMessages`] until both the server ack and the matching event
//! have been seen, and turns failures into either a reload (when one is
//! already pending) or a [`SendOutcome::Failed`] for the caller.
//! [`Transmitter::reply_message`] sends an application-triggered reply to an
//! existing message.
//!
//! The event stream, reload machinery and user/stream directory are owned by
//! the embedding client and reached through the traits in [`traits`].

pub mod error;
pub mod people;
mod reply;
pub mod sent_messages;
pub mod traits;
pub mod transmit;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    error::{Error, Result},
    people::{Person, Roster},
    sent_messages::{MessageState, SendStatus, SentMessages},
    traits::{Directory, EventQueue, MessageTransport, Reloader},
    transmit::Transmitter,
    transport::{HttpTransport, TransportError},
    types::{
        DisplayRecipient, LocalId, Message, MessageKind, MessageTarget, ReloadOptions,
        SendMessageRequest, SendOutcome,
    },
};
