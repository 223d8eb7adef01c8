//! Integration tests for the wake trigger: debounce coalescing, idle pause
//! on hidden, and resume on visible.

mod common;

use common::{FakeSession, FakeTransport};
use pulse_link::{ChannelStatus, PulseLinkClient, PulseLinkTimeouts, WakeSignal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Long confirmation windows so the supervisor's own ladder never fires
/// during these tests; only the wake trigger drives reconnects.
fn wake_timeouts(idle_secs: u64) -> PulseLinkTimeouts {
    PulseLinkTimeouts::builder()
        .confirm_timeout(Duration::from_secs(600))
        .escalate_timeout(Duration::from_secs(600))
        .wake_debounce_ms(250)
        .idle_pause_secs(idle_secs)
        .build()
}

fn client(transport: &Arc<FakeTransport>, timeouts: PulseLinkTimeouts) -> PulseLinkClient {
    PulseLinkClient::builder()
        .transport(transport.clone())
        .session(FakeSession::new())
        .timeouts(timeouts)
        .build()
        .expect("client builds with a transport")
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_signals_debounces_to_one_warm_check() {
    let transport = FakeTransport::new();
    let client = client(&transport, wake_timeouts(0));

    // Bound but never confirmed, so a warm check will reconnect.
    client.supervisor().subscribe("chat-1").await;
    assert_eq!(transport.subscribe_count("chat-1"), 1);

    let (signal_tx, signal_rx) = mpsc::channel(16);
    let _trigger = client.spawn_wake_trigger(signal_rx);

    // Five signals inside 100 ms.
    for signal in [
        WakeSignal::Visible,
        WakeSignal::Online,
        WakeSignal::Focus,
        WakeSignal::Visible,
        WakeSignal::Focus,
    ] {
        signal_tx.send(signal).await.unwrap();
        sleep(Duration::from_millis(20)).await;
    }

    // One debounce window later: exactly one additional reconnect.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(transport.subscribe_count("chat-1"), 2);

    // A later, separate signal runs its own warm check.
    signal_tx.send(WakeSignal::Online).await.unwrap();
    sleep(Duration::from_millis(300)).await;
    assert_eq!(transport.subscribe_count("chat-1"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_debounced_check_is_noop_when_connected() {
    let transport = FakeTransport::new();
    let client = client(&transport, wake_timeouts(0));

    client.supervisor().subscribe("chat-1").await;
    transport
        .emit_status("chat-1", ChannelStatus::Subscribed)
        .await;
    sleep(Duration::from_millis(5)).await;

    let (signal_tx, signal_rx) = mpsc::channel(16);
    let _trigger = client.spawn_wake_trigger(signal_rx);

    signal_tx.send(WakeSignal::Focus).await.unwrap();
    sleep(Duration::from_millis(400)).await;

    assert_eq!(transport.subscribe_count("chat-1"), 1);
    assert!(client.supervisor().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_hidden_pauses_after_idle_window() {
    let transport = FakeTransport::new();
    let client = client(&transport, wake_timeouts(1));

    client.supervisor().subscribe("chat-1").await;
    transport
        .emit_status("chat-1", ChannelStatus::Subscribed)
        .await;
    sleep(Duration::from_millis(5)).await;

    let (signal_tx, signal_rx) = mpsc::channel(16);
    let _trigger = client.spawn_wake_trigger(signal_rx);

    signal_tx.send(WakeSignal::Hidden).await.unwrap();
    sleep(Duration::from_millis(1200)).await;

    assert!(transport.open_channels().is_empty(), "channel paused");
    assert!(!client.supervisor().is_connected());
    assert_eq!(
        client.supervisor().scope(),
        Some("chat-1".to_string()),
        "scope retained across the pause"
    );

    // Becoming visible resumes the retained scope after the debounce.
    signal_tx.send(WakeSignal::Visible).await.unwrap();
    sleep(Duration::from_millis(400)).await;
    assert_eq!(transport.subscribe_count("chat-1"), 2);

    transport
        .emit_status("chat-1", ChannelStatus::Subscribed)
        .await;
    sleep(Duration::from_millis(5)).await;
    assert!(client.supervisor().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_visible_before_idle_window_cancels_the_pause() {
    let transport = FakeTransport::new();
    let client = client(&transport, wake_timeouts(1));

    client.supervisor().subscribe("chat-1").await;
    transport
        .emit_status("chat-1", ChannelStatus::Subscribed)
        .await;
    sleep(Duration::from_millis(5)).await;

    let (signal_tx, signal_rx) = mpsc::channel(16);
    let _trigger = client.spawn_wake_trigger(signal_rx);

    signal_tx.send(WakeSignal::Hidden).await.unwrap();
    sleep(Duration::from_millis(500)).await;
    signal_tx.send(WakeSignal::Visible).await.unwrap();
    sleep(Duration::from_millis(1500)).await;

    // Never paused: the channel stayed open and healthy the whole time.
    assert_eq!(transport.open_channels(), vec!["chat-1".to_string()]);
    assert!(client.supervisor().is_connected());
    assert_eq!(transport.subscribe_count("chat-1"), 1);
}
