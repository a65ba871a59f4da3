//! In-process fakes for the collaborator traits.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    murmur_common::UserId,
    serde_json::Value,
    tracing::{
        Event, Level, Subscriber,
        field::{Field, Visit},
        subscriber::DefaultGuard,
    },
    tracing_subscriber::{Layer, layer::Context, prelude::*},
};

use crate::{
    people::{Person, Roster},
    traits::{EventQueue, MessageTransport, Reloader},
    transmit::Transmitter,
    transport::TransportError,
    types::{ReloadOptions, SendMessageRequest},
};

/// Replies with queued results in order; records every request it sees.
#[derive(Default)]
pub(crate) struct FakeTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<SendMessageRequest>>,
}

impl FakeTransport {
    pub(crate) fn replying(reply: Result<Value, TransportError>) -> Arc<Self> {
        let transport = Self::default();
        transport.push(reply);
        Arc::new(transport)
    }

    pub(crate) fn push(&self, reply: Result<Value, TransportError>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<SendMessageRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MessageTransport for FakeTransport {
    async fn post_message(&self, request: &SendMessageRequest) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        tokio::task::yield_now().await;
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Err(TransportError::Network {
                message: "no reply queued".into(),
            }))
    }
}

#[derive(Default)]
pub(crate) struct CountingEventQueue {
    pub(crate) restarts: AtomicUsize,
}

impl EventQueue for CountingEventQueue {
    fn queue_id(&self) -> Option<String> {
        Some("1700000000:7".into())
    }

    fn restart_event_queue(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingReloader {
    pub(crate) pending: AtomicBool,
    pub(crate) initiated: Mutex<Vec<ReloadOptions>>,
}

impl RecordingReloader {
    pub(crate) fn pending() -> Arc<Self> {
        let reloader = Self::default();
        reloader.pending.store(true, Ordering::SeqCst);
        Arc::new(reloader)
    }

    pub(crate) fn initiated(&self) -> Vec<ReloadOptions> {
        self.initiated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Reloader for RecordingReloader {
    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    fn initiate(&self, options: ReloadOptions) {
        self.initiated
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(options);
    }
}

pub(crate) const ME: UserId = UserId(10);

/// Directory with the current user, two users sharing a name, and a stream.
pub(crate) fn roster() -> Roster {
    let mut roster = Roster::new(ME);
    roster.add_user(Person::new(ME, "Hamlet", "hamlet@example.com"));
    roster.add_user(Person::new(UserId(11), "Iago", "iago@example.com"));
    roster.add_user(Person::new(UserId(12), "Cordelia", "cordelia@example.com"));
    roster.add_user(Person::new(UserId(13), "Cordelia", "cordelia2@example.com"));
    roster.add_stream(murmur_common::StreamId(7), "design");
    roster
}

pub(crate) struct Harness {
    pub(crate) transmitter: Transmitter,
    pub(crate) transport: Arc<FakeTransport>,
    pub(crate) events: Arc<CountingEventQueue>,
    pub(crate) reloader: Arc<RecordingReloader>,
}

impl Harness {
    pub(crate) fn new(transport: Arc<FakeTransport>, reloader: Arc<RecordingReloader>) -> Self {
        let events = Arc::new(CountingEventQueue::default());
        let transmitter = Transmitter::new(
            Arc::clone(&transport) as Arc<dyn MessageTransport>,
            Arc::clone(&events) as Arc<dyn EventQueue>,
            Arc::clone(&reloader) as Arc<dyn Reloader>,
            Arc::new(roster()),
        );
        Self {
            transmitter,
            transport,
            events,
            reloader,
        }
    }

    pub(crate) fn restarts(&self) -> usize {
        self.events.restarts.load(Ordering::SeqCst)
    }
}

/// Layer keeping the level and message of every event, for asserting on
/// diagnostics.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    /// Capture events on the current thread until the guard drops.
    pub(crate) fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));
        (logs, guard)
    }

    pub(crate) fn count(&self, level: Level, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(l, message)| *l == level && message.contains(needle))
            .count()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.into();
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((*event.metadata().level(), visitor.message));
    }
}
