//! Integration tests for webhook event correlation and dispatch
//!
//! Callbacks run on spawned tasks, so every test observes them through a
//! channel bounded by a timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use callflow_call_automation::prelude::*;

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

fn cloud_event(event_type: &str, call_leg_id: &str) -> String {
    format!(
        r#"[{{"id":"evt-1","source":"calling/callConnections/{leg}","type":"Microsoft.Communication.{ty}",
            "data":{{"callConnectionId":"{leg}","serverCallId":"srv-1","correlationId":"corr-1"}}}}]"#,
        ty = event_type,
        leg = call_leg_id
    )
}

fn channel_callback() -> (NotificationCallback, mpsc::UnboundedReceiver<CallEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback = NotificationCallback::from_fn(move |event| {
        let _ = tx.send(event);
    });
    (callback, rx)
}

/// Passes when no event arrives, including when the callback was dropped
async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<CallEvent>) {
    if let Ok(Some(event)) = timeout(QUIET, rx.recv()).await {
        panic!("unexpected callback invocation for {:?}", event.kind);
    }
}

#[tokio::test]
async fn test_matched_event_invokes_callback() {
    let dispatcher = EventDispatcher::default();
    let (callback, mut rx) = channel_callback();

    assert!(dispatcher.subscribe(EventKind::CallConnected, "leg-1", callback));
    assert_eq!(dispatcher.process_notification(&cloud_event("CallConnected", "leg-1")), 1);

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::CallConnected);
    assert_eq!(event.call_connection_id.as_deref(), Some("leg-1"));
    assert_eq!(event.server_call_id.as_deref(), Some("srv-1"));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribed_callback_never_fires() {
    let dispatcher = EventDispatcher::default();
    let (callback, mut rx) = channel_callback();

    assert!(dispatcher.subscribe(EventKind::PlayCompleted, "leg-2", callback));
    dispatcher.unsubscribe(EventKind::PlayCompleted, "leg-2");
    assert!(!dispatcher.is_subscribed(EventKind::PlayCompleted, "leg-2"));

    assert_eq!(dispatcher.process_notification(&cloud_event("PlayCompleted", "leg-2")), 0);
    assert_no_event(&mut rx).await;
    assert_eq!(dispatcher.stats().unmatched, 1);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_subscribe_keeps_original() {
    let dispatcher = EventDispatcher::default();
    let (original, mut original_rx) = channel_callback();
    let (duplicate, mut duplicate_rx) = channel_callback();

    assert!(dispatcher.subscribe(EventKind::RecognizeCompleted, "leg-3", original));
    assert!(!dispatcher.subscribe("recognizecompleted", "LEG-3", duplicate));
    assert_eq!(dispatcher.subscription_count(), 1);

    dispatcher.process_notification(&cloud_event("RecognizeCompleted", "leg-3"));

    let event = timeout(WAIT, original_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::RecognizeCompleted);
    assert_no_event(&mut duplicate_rx).await;

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unrecognized_payloads_are_dropped() {
    let dispatcher = EventDispatcher::default();
    let invoked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invoked);
    dispatcher.subscribe(
        EventKind::CallConnected,
        "leg-4",
        NotificationCallback::from_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    assert_eq!(dispatcher.process_notification(&cloud_event("SomethingNew", "leg-4")), 0);
    assert_eq!(dispatcher.process_notification("not json at all"), 0);
    assert_eq!(dispatcher.process_notification("[]"), 0);
    assert_eq!(dispatcher.process_notification(r#"{"type":"Microsoft.Communication.CallConnected"}"#), 0);

    tokio::time::sleep(QUIET).await;
    assert_eq!(invoked.load(Ordering::SeqCst), 0);

    let stats = dispatcher.stats();
    assert_eq!(stats.received, 4);
    assert_eq!(stats.dropped_unparsed, 4);
    assert_eq!(stats.dispatched, 0);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_event_grid_envelope_and_prefixed_subscription() {
    let dispatcher = EventDispatcher::default();
    let (callback, mut rx) = channel_callback();
    dispatcher.subscribe("Microsoft.Communication.CallDisconnected", "leg-5", callback);

    let payload = r#"{"eventType":"Microsoft.Communication.CallDisconnected",
        "data":{"callConnectionId":"leg-5"}}"#;
    assert_eq!(dispatcher.process_notification(payload), 1);

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::CallDisconnected);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_type_prefix_matches_in_any_case() {
    let dispatcher = EventDispatcher::default();
    let (connected, mut connected_rx) = channel_callback();
    let (played, mut played_rx) = channel_callback();
    assert!(dispatcher.subscribe("MICROSOFT.COMMUNICATION.CallConnected", "leg", connected));
    assert!(dispatcher.is_subscribed(EventKind::CallConnected, "leg"));
    assert!(dispatcher.subscribe(EventKind::PlayCompleted, "leg", played));

    assert_eq!(dispatcher.process_notification(&cloud_event("CallConnected", "LEG")), 1);
    let event = timeout(WAIT, connected_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::CallConnected);

    let payload = r#"{"type":"microsoft.communication.playcompleted","data":{"callConnectionId":"leg"}}"#;
    assert_eq!(dispatcher.process_notification(payload), 1);
    let event = timeout(WAIT, played_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::PlayCompleted);

    let stats = dispatcher.stats();
    assert_eq!(stats.dropped_unparsed, 0);
    assert_eq!(stats.unmatched, 0);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_operation_context_correlation() {
    let dispatcher = EventDispatcher::default();
    let (callback, mut rx) = channel_callback();
    dispatcher.subscribe(EventKind::PlayAudioResultEvent, "ctx-42", callback);

    let payload = r#"{"type":"PlayAudioResultEvent",
        "data":{"operationContext":"ctx-42","status":"completed"}}"#;
    assert_eq!(dispatcher.process_notification(payload), 1);

    let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.operation_context.as_deref(), Some("ctx-42"));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_every_envelope_in_a_batch_is_dispatched() {
    let dispatcher = EventDispatcher::default();
    let (connected, mut connected_rx) = channel_callback();
    let (played, mut played_rx) = channel_callback();
    dispatcher.subscribe(EventKind::CallConnected, "leg-6", connected);
    dispatcher.subscribe(EventKind::PlayCompleted, "leg-6", played);

    let payload = r#"[
        {"type":"Microsoft.Communication.CallConnected","data":{"callConnectionId":"leg-6"}},
        {"type":"Microsoft.Communication.PlayCompleted","data":{"callConnectionId":"leg-6"}},
        {"type":"Microsoft.Communication.PlayFailed","data":{"callConnectionId":"leg-6"}}
    ]"#;
    assert_eq!(dispatcher.process_notification(payload), 2);

    timeout(WAIT, connected_rx.recv()).await.unwrap().unwrap();
    timeout(WAIT, played_rx.recv()).await.unwrap().unwrap();
    assert_eq!(dispatcher.stats().unmatched, 1);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatch_does_not_wait_for_callbacks() {
    let dispatcher = EventDispatcher::default();
    let release = Arc::new(tokio::sync::Notify::new());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let gate = Arc::clone(&release);
    dispatcher.subscribe(
        EventKind::CallConnected,
        "leg-7",
        NotificationCallback::new(move |_| {
            let gate = Arc::clone(&gate);
            let done_tx = done_tx.clone();
            async move {
                gate.notified().await;
                let _ = done_tx.send(());
            }
        }),
    );

    assert_eq!(dispatcher.process_notification(&cloud_event("CallConnected", "leg-7")), 1);
    assert!(done_rx.try_recv().is_err());

    release.notify_one();
    timeout(WAIT, done_rx.recv()).await.unwrap().unwrap();

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_callbacks_over_in_flight_limit_are_rejected() {
    let dispatcher = EventDispatcher::new(DispatcherConfig {
        max_in_flight_callbacks: 1,
        shutdown_grace_ms: 1000,
    });
    let release = Arc::new(tokio::sync::Notify::new());
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let gate = Arc::clone(&release);
    dispatcher.subscribe(
        EventKind::CallConnected,
        "leg-9",
        NotificationCallback::new(move |_| {
            let gate = Arc::clone(&gate);
            let done_tx = done_tx.clone();
            async move {
                gate.notified().await;
                let _ = done_tx.send(());
            }
        }),
    );
    let (played, mut played_rx) = channel_callback();
    dispatcher.subscribe(EventKind::PlayCompleted, "leg-9", played);

    assert_eq!(dispatcher.process_notification(&cloud_event("CallConnected", "leg-9")), 1);
    assert_eq!(dispatcher.process_notification(&cloud_event("PlayCompleted", "leg-9")), 0);
    assert_no_event(&mut played_rx).await;

    let stats = dispatcher.stats();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.rejected, 1);

    release.notify_one();
    timeout(WAIT, done_rx.recv()).await.unwrap().unwrap();
    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_refuses_new_dispatch() {
    let dispatcher = EventDispatcher::new(DispatcherConfig {
        max_in_flight_callbacks: 4,
        shutdown_grace_ms: 100,
    });
    let (callback, _rx) = channel_callback();
    dispatcher.subscribe(EventKind::CallConnected, "leg-8", callback);

    dispatcher.shutdown().await.unwrap();
    assert_eq!(dispatcher.subscription_count(), 0);
    assert_eq!(dispatcher.process_notification(&cloud_event("CallConnected", "leg-8")), 0);
}
