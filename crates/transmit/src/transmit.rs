//! Submitting messages and reacting to the server's answer.

use std::{sync::Arc, time::Duration};

use {
    futures::{FutureExt, future::BoxFuture},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use murmur_metrics::{counter, histogram, labels, transmit as tx_metrics};

use crate::{
    error::Result,
    sent_messages::SentMessages,
    traits::{Directory, EventQueue, MessageTransport, Reloader},
    transport::TransportError,
    types::{LocalId, ReloadOptions, SendMessageRequest, SendOutcome},
};

/// Prefix of the error message reported for a failed send.
const SEND_ERROR_MESSAGE: &str = "Error sending message";

/// Default wait between the server ack and restarting the event queue.
pub const DEFAULT_EVENT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends messages on behalf of the local user.
///
/// Cloning is cheap; clones share the tracking table and collaborators.
#[derive(Clone)]
pub struct Transmitter {
    pub(crate) sent: SentMessages,
    pub(crate) transport: Arc<dyn MessageTransport>,
    pub(crate) events: Arc<dyn EventQueue>,
    pub(crate) reloader: Arc<dyn Reloader>,
    pub(crate) directory: Arc<dyn Directory>,
    event_receipt_timeout: Duration,
}

impl Transmitter {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        events: Arc<dyn EventQueue>,
        reloader: Arc<dyn Reloader>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            sent: SentMessages::new(),
            transport,
            events,
            reloader,
            directory,
            event_receipt_timeout: DEFAULT_EVENT_RECEIPT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_event_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.event_receipt_timeout = timeout;
        self
    }

    /// The tracking table. The event stream handler reports received
    /// messages here.
    pub fn sent_messages(&self) -> &SentMessages {
        &self.sent
    }

    /// Submit `request`.
    ///
    /// Unless `request.resend` is set, the message is tracked before this
    /// returns, so the record exists before any response can arrive. The
    /// returned future performs the request. `on_complete` runs with the
    /// outcome before the server ack is recorded; it is not called when the
    /// failure is handed to a pending reload.
    ///
    /// Must be polled within a tokio runtime: a successful send may spawn the
    /// delayed event receipt check.
    pub fn send_message<F>(
        &self,
        request: SendMessageRequest,
        on_complete: F,
    ) -> Result<BoxFuture<'static, SendOutcome>>
    where
        F: FnOnce(&SendOutcome) + Send + 'static,
    {
        if !request.resend {
            self.sent
                .start_tracking_message(request.local_id.clone(), request.locally_echoed)?;
        }
        let this = self.clone();
        Ok(async move { this.transmit(request, on_complete).await }.boxed())
    }

    async fn transmit<F>(self, request: SendMessageRequest, on_complete: F) -> SendOutcome
    where
        F: FnOnce(&SendOutcome),
    {
        self.sent.start_send(&request.local_id);
        match self.transport.post_message(&request).await {
            Ok(response) => {
                let outcome = SendOutcome::Sent { response };
                on_complete(&outcome);
                self.handle_ack(&request);
                outcome
            },
            Err(err) => self.handle_failure(&request, err, on_complete),
        }
    }

    fn handle_ack(&self, request: &SendMessageRequest) {
        #[cfg(feature = "metrics")]
        counter!(tx_metrics::MESSAGES_SENT_TOTAL, labels::MESSAGE_TYPE => request.target.type_name())
            .increment(1);

        let Some(state) = self.sent.report_server_ack(&request.local_id) else {
            debug!(local_id = %request.local_id, "ack for a message that is no longer tracked");
            return;
        };

        if let Some(elapsed) = state.round_trip() {
            debug!(local_id = %request.local_id, elapsed_ms = elapsed.as_millis() as u64, "server acked message");
            #[cfg(feature = "metrics")]
            histogram!(tx_metrics::ACK_DURATION_SECONDS).record(elapsed.as_secs_f64());
        }

        // A slow server is not a broken event loop, so the clock only starts
        // once the server has answered.
        if !state.saw_event() {
            self.arm_event_receipt_check(request.local_id.clone());
        }
    }

    /// After the timeout, restart the event queue if the message's event
    /// still has not arrived. Not cancelled; it re-checks when it fires.
    fn arm_event_receipt_check(&self, local_id: LocalId) {
        let sent = self.sent.clone();
        let events = Arc::clone(&self.events);
        let timeout = self.event_receipt_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !sent.is_awaiting_event(&local_id) {
                return;
            }
            info!(
                local_id = %local_id,
                "restarting event queue due to delayed receipt of sent message"
            );
            #[cfg(feature = "metrics")]
            counter!(tx_metrics::EVENT_QUEUE_RESTARTS_TOTAL).increment(1);
            events.restart_event_queue();
        });
    }

    fn handle_failure<F>(
        &self,
        request: &SendMessageRequest,
        err: TransportError,
        on_complete: F,
    ) -> SendOutcome
    where
        F: FnOnce(&SendOutcome),
    {
        self.sent.report_error(&request.local_id);

        // The failure may come from a server upgrade; the reload will resend
        // the composition once the client is back.
        if !err.is_timeout() && self.reloader.is_pending() {
            info!(local_id = %request.local_id, error = %err, "send failed with a reload pending, reloading now");
            #[cfg(feature = "metrics")]
            counter!(tx_metrics::RELOADS_TOTAL).increment(1);
            self.reloader.initiate(ReloadOptions {
                immediate: true,
                save_compose: true,
                send_after_reload: true,
            });
            return SendOutcome::Reloading;
        }

        let message = err.error_message(SEND_ERROR_MESSAGE);
        let code = err.server_code();
        warn!(local_id = %request.local_id, error = %err, code = %code, "failed to send message");
        #[cfg(feature = "metrics")]
        counter!(tx_metrics::SEND_ERRORS_TOTAL, labels::ERROR_CODE => code.clone()).increment(1);

        let outcome = SendOutcome::Failed { message, code };
        on_complete(&outcome);
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use {murmur_common::UserId, serde_json::json, tracing::Level};

    use super::*;
    use crate::{
        sent_messages::SendStatus,
        test_support::{CapturedLogs, FakeTransport, Harness, RecordingReloader},
        types::MessageTarget,
    };

    fn request(local_id: &str) -> SendMessageRequest {
        SendMessageRequest {
            local_id: LocalId::new(local_id),
            sender_id: UserId(10),
            queue_id: Some("1700000000:7".into()),
            to: "design".into(),
            content: "hello".into(),
            target: MessageTarget::Stream {
                topic: "colors".into(),
            },
            resend: false,
            locally_echoed: true,
        }
    }

    const DELAYED_RECEIPT: &str = "due to delayed receipt of sent message";

    fn ok_body() -> std::result::Result<serde_json::Value, TransportError> {
        Ok(json!({"result": "success", "msg": "", "id": 99}))
    }

    fn bad_request(body: serde_json::Value) -> std::result::Result<serde_json::Value, TransportError> {
        Err(TransportError::Status {
            status: 400,
            body: Some(body),
        })
    }

    #[tokio::test]
    async fn tracks_before_the_response_arrives() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let send = h.transmitter.send_message(request("loc-1"), |_| {}).unwrap();

        let state = h
            .transmitter
            .sent_messages()
            .get_message_state(&LocalId::new("loc-1"))
            .unwrap();
        assert_eq!(state.status(), SendStatus::Pending);
        assert!(state.locally_echoed());
        assert!(h.transport.requests().is_empty());

        assert!(send.await.is_sent());
        assert_eq!(h.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn resend_does_not_register_again() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let sent = h.transmitter.sent_messages();
        sent.start_tracking_message(LocalId::new("loc-1"), true).unwrap();
        sent.report_error(&LocalId::new("loc-1"));

        let mut retry = request("loc-1");
        retry.resend = true;
        let outcome = h.transmitter.send_message(retry, |_| {}).unwrap().await;
        assert!(outcome.is_sent());
        let state = sent.get_message_state(&LocalId::new("loc-1")).unwrap();
        assert_eq!(state.status(), SendStatus::AwaitingEvent);
    }

    #[tokio::test]
    async fn duplicate_local_id_is_rejected_without_sending() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let _first = h.transmitter.send_message(request("loc-1"), |_| {}).unwrap();
        let second = h.transmitter.send_message(request("loc-1"), |_| {});
        assert!(matches!(second, Err(crate::Error::DuplicateLocalId { .. })));
    }

    #[tokio::test]
    async fn success_callback_runs_before_ack() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let sent = h.transmitter.sent_messages().clone();
        let acked_during_callback = Arc::new(Mutex::new(None));
        let observed = Arc::clone(&acked_during_callback);

        let outcome = h
            .transmitter
            .send_message(request("loc-1"), move |outcome| {
                assert!(outcome.is_sent());
                let state = sent.get_message_state(&LocalId::new("loc-1")).unwrap();
                *observed.lock().unwrap() = Some(state.server_acked());
            })
            .unwrap()
            .await;

        assert_eq!(outcome, SendOutcome::Sent {
            response: json!({"result": "success", "msg": "", "id": 99})
        });
        assert_eq!(*acked_during_callback.lock().unwrap(), Some(false));
        assert!(
            h.transmitter
                .sent_messages()
                .get_message_state(&LocalId::new("loc-1"))
                .unwrap()
                .server_acked()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_record_on_success_is_harmless() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let sent = h.transmitter.sent_messages().clone();
        let outcome = h
            .transmitter
            .send_message(request("loc-1"), move |_| {
                sent.forget(&LocalId::new("loc-1"));
            })
            .unwrap()
            .await;
        assert!(outcome.is_sent());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.restarts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_event_queue_once_when_event_is_late() {
        let (logs, _guard) = CapturedLogs::install();
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        h.transmitter
            .send_message(request("loc-1"), |_| {})
            .unwrap()
            .await;

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(h.restarts(), 0);
        assert_eq!(logs.count(Level::INFO, DELAYED_RECEIPT), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(h.restarts(), 1);
        assert_eq!(logs.count(Level::INFO, DELAYED_RECEIPT), 1);

        // the check fires once and leaves the record untouched
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(h.restarts(), 1);
        assert_eq!(logs.count(Level::INFO, DELAYED_RECEIPT), 1);
        assert!(
            h.transmitter
                .sent_messages()
                .is_awaiting_event(&LocalId::new("loc-1"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_restart_when_event_arrives_in_time() {
        let (logs, _guard) = CapturedLogs::install();
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        h.transmitter
            .send_message(request("loc-1"), |_| {})
            .unwrap()
            .await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.transmitter
            .sent_messages()
            .report_event_received(&LocalId::new("loc-1"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.restarts(), 0);
        assert_eq!(logs.count(Level::INFO, DELAYED_RECEIPT), 0);
        assert!(h.transmitter.sent_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_timer_when_event_beat_the_ack() {
        let h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        let send = h.transmitter.send_message(request("loc-1"), |_| {}).unwrap();
        h.transmitter
            .sent_messages()
            .report_event_received(&LocalId::new("loc-1"));
        assert!(send.await.is_sent());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.restarts(), 0);
        assert!(h.transmitter.sent_messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_event_receipt_timeout() {
        let mut h = Harness::new(FakeTransport::replying(ok_body()), Default::default());
        h.transmitter = h
            .transmitter
            .clone()
            .with_event_receipt_timeout(Duration::from_secs(1));
        h.transmitter
            .send_message(request("loc-1"), |_| {})
            .unwrap()
            .await;
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(h.restarts(), 1);
    }

    #[tokio::test]
    async fn error_while_reload_pending_reloads_instead_of_reporting() {
        let h = Harness::new(
            FakeTransport::replying(bad_request(json!({"code": "BAD_REQUEST"}))),
            RecordingReloader::pending(),
        );
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);

        let outcome = h
            .transmitter
            .send_message(request("loc-1"), move |_| flag.store(true, Ordering::SeqCst))
            .unwrap()
            .await;

        assert_eq!(outcome, SendOutcome::Reloading);
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(h.reloader.initiated(), vec![ReloadOptions {
            immediate: true,
            save_compose: true,
            send_after_reload: true,
        }]);
        let state = h
            .transmitter
            .sent_messages()
            .get_message_state(&LocalId::new("loc-1"))
            .unwrap();
        assert_eq!(state.status(), SendStatus::Failed);
    }

    #[tokio::test]
    async fn timeout_is_reported_even_with_reload_pending() {
        let h = Harness::new(
            FakeTransport::replying(Err(TransportError::Timeout)),
            RecordingReloader::pending(),
        );
        let reported = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&reported);

        let outcome = h
            .transmitter
            .send_message(request("loc-1"), move |outcome| {
                *slot.lock().unwrap() = Some(outcome.clone());
            })
            .unwrap()
            .await;

        let expected = SendOutcome::Failed {
            message: "Error sending message".into(),
            code: String::new(),
        };
        assert_eq!(outcome, expected);
        assert_eq!(*reported.lock().unwrap(), Some(expected));
        assert!(h.reloader.initiated().is_empty());
    }

    #[tokio::test]
    async fn error_reports_message_and_server_code() {
        let h = Harness::new(
            FakeTransport::replying(bad_request(json!({
                "result": "error",
                "msg": "Stream 'nope' does not exist",
                "code": "STREAM_DOES_NOT_EXIST"
            }))),
            Default::default(),
        );
        let reported = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&reported);

        h.transmitter
            .send_message(request("loc-1"), move |outcome| {
                *slot.lock().unwrap() = Some(outcome.clone());
            })
            .unwrap()
            .await;

        let Some(SendOutcome::Failed { message, code }) = reported.lock().unwrap().clone() else {
            panic!("expected a failure to be reported");
        };
        assert_eq!(message, "Error sending message: Stream 'nope' does not exist");
        assert_eq!(code, "STREAM_DOES_NOT_EXIST");
        assert!(h.reloader.initiated().is_empty());
    }

    #[tokio::test]
    async fn malformed_error_body_yields_empty_code() {
        let h = Harness::new(
            FakeTransport::replying(bad_request(json!({"code": ["not", "a", "string"]}))),
            Default::default(),
        );
        let outcome = h
            .transmitter
            .send_message(request("loc-1"), |_| {})
            .unwrap()
            .await;
        let SendOutcome::Failed { message, code } = outcome else {
            panic!("expected a failure");
        };
        assert!(!message.is_empty());
        assert_eq!(code, "");
    }
}
