//! Shared identifiers, error definitions, and utilities used across all murmur crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    types::{MessageId, StreamId, UserId},
};
