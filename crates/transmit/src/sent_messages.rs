//! Local-echo bookkeeping for messages this client has sent.
//!
//! A [`MessageState`] is created when a send starts and records whether the
//! server has acknowledged the message and whether the matching event has
//! arrived on the event stream. Records are dropped once both have happened,
//! or when the caller gives up on a failed send.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    tokio::time::Instant,
    tracing::{debug, error},
};

#[cfg(feature = "metrics")]
use murmur_metrics::{gauge, transmit as tx_metrics};

use crate::{
    error::{Error, Result},
    types::LocalId,
};

/// Where a tracked send is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Submitted, no server response yet.
    Pending,
    /// Acknowledged by the server, event not seen yet.
    AwaitingEvent,
    /// Acknowledged and delivered back through the event stream.
    Confirmed,
    /// The last attempt failed.
    Failed,
}

/// State of one outgoing message.
#[derive(Debug, Clone)]
pub struct MessageState {
    local_id: LocalId,
    locally_echoed: bool,
    created_at: Instant,
    send_started_at: Option<Instant>,
    acked_at: Option<Instant>,
    server_acked: bool,
    saw_event: bool,
    errored: bool,
}

impl MessageState {
    #[must_use]
    pub fn new(local_id: LocalId, locally_echoed: bool) -> Self {
        Self {
            local_id,
            locally_echoed,
            created_at: Instant::now(),
            send_started_at: None,
            acked_at: None,
            server_acked: false,
            saw_event: false,
            errored: false,
        }
    }

    pub fn local_id(&self) -> &LocalId {
        &self.local_id
    }

    pub fn locally_echoed(&self) -> bool {
        self.locally_echoed
    }

    pub fn server_acked(&self) -> bool {
        self.server_acked
    }

    pub fn saw_event(&self) -> bool {
        self.saw_event
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    /// Mark the start of a (re)send attempt.
    pub fn start_send(&mut self) {
        self.send_started_at = Some(Instant::now());
        self.errored = false;
    }

    pub fn report_server_ack(&mut self) {
        if !self.server_acked {
            self.server_acked = true;
            self.acked_at = Some(Instant::now());
        }
    }

    pub fn report_event_received(&mut self) {
        self.saw_event = true;
    }

    pub fn report_error(&mut self) {
        self.errored = true;
    }

    #[must_use]
    pub fn status(&self) -> SendStatus {
        match (self.errored, self.server_acked, self.saw_event) {
            (true, ..) => SendStatus::Failed,
            (false, true, true) => SendStatus::Confirmed,
            (false, true, false) => SendStatus::AwaitingEvent,
            (false, false, _) => SendStatus::Pending,
        }
    }

    /// Time from the latest send attempt (or creation) to the server ack.
    #[must_use]
    pub fn round_trip(&self) -> Option<Duration> {
        let started = self.send_started_at.unwrap_or(self.created_at);
        self.acked_at.map(|acked| acked.saturating_duration_since(started))
    }

    fn is_resolved(&self) -> bool {
        self.server_acked && self.saw_event
    }
}

#[derive(Default)]
struct Tracked {
    messages: HashMap<LocalId, MessageState>,
    next_local_id: u64,
}

/// Table of in-flight messages, keyed by local id.
///
/// Cloning is cheap and clones share the table. The lock is never held
/// across an `.await`.
#[derive(Clone, Default)]
pub struct SentMessages {
    inner: Arc<Mutex<Tracked>>,
}

impl SentMessages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tracked) -> T) -> T {
        let mut tracked = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let out = f(&mut tracked);
        #[cfg(feature = "metrics")]
        gauge!(tx_metrics::TRACKED_MESSAGES).set(tracked.messages.len() as f64);
        out
    }

    /// Allocate a fresh local id (`loc-1`, `loc-2`, ...).
    pub fn get_new_local_id(&self) -> LocalId {
        self.with(|t| {
            t.next_local_id += 1;
            LocalId::new(format!("loc-{}", t.next_local_id))
        })
    }

    /// Register a new send. Re-using a tracked id is a caller bug.
    pub fn start_tracking_message(&self, local_id: LocalId, locally_echoed: bool) -> Result<()> {
        self.with(|t| {
            if t.messages.contains_key(&local_id) {
                error!(local_id = %local_id, "local id is already being tracked");
                return Err(Error::DuplicateLocalId {
                    local_id: local_id.to_string(),
                });
            }
            debug!(local_id = %local_id, locally_echoed, "tracking sent message");
            t.messages
                .insert(local_id.clone(), MessageState::new(local_id, locally_echoed));
            Ok(())
        })
    }

    /// Snapshot of a tracked send. `None` means it already resolved or was
    /// never tracked.
    pub fn get_message_state(&self, local_id: &LocalId) -> Option<MessageState> {
        self.with(|t| t.messages.get(local_id).cloned())
    }

    pub fn start_send(&self, local_id: &LocalId) {
        self.update(local_id, MessageState::start_send);
    }

    /// Record the server ack and return the resulting state.
    pub fn report_server_ack(&self, local_id: &LocalId) -> Option<MessageState> {
        self.update(local_id, MessageState::report_server_ack)
    }

    /// Record that the event for this message arrived on the event stream.
    pub fn report_event_received(&self, local_id: &LocalId) -> Option<MessageState> {
        self.update(local_id, MessageState::report_event_received)
    }

    pub fn report_error(&self, local_id: &LocalId) -> Option<MessageState> {
        self.update(local_id, MessageState::report_error)
    }

    /// Whether the server acked this message but its event has not arrived.
    pub fn is_awaiting_event(&self, local_id: &LocalId) -> bool {
        self.with(|t| {
            t.messages
                .get(local_id)
                .is_some_and(|s| s.server_acked && !s.saw_event)
        })
    }

    /// Stop tracking a send, e.g. after the user discards a failed message.
    pub fn forget(&self, local_id: &LocalId) -> Option<MessageState> {
        self.with(|t| t.messages.remove(local_id))
    }

    pub fn len(&self) -> usize {
        self.with(|t| t.messages.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(
        &self,
        local_id: &LocalId,
        apply: impl FnOnce(&mut MessageState),
    ) -> Option<MessageState> {
        self.with(|t| {
            let state = t.messages.get_mut(local_id)?;
            apply(state);
            let snapshot = state.clone();
            if snapshot.is_resolved() {
                t.messages.remove(local_id);
                debug!(local_id = %local_id, "sent message confirmed");
            }
            Some(snapshot)
        })
    }
}
