//! End-to-end scenarios against an in-process WebSocket server.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use pulse_client::{
    ConnectionStatus, InvestigationWatcher, Lifecycle, RealtimeClient, RealtimeContext,
    RealtimeHandle,
};
use pulse_core::{Frame, FrameCodec, RealtimeConfig};

type ServerWs = WebSocketStream<TcpStream>;

struct TestServer {
    endpoint: String,
    conns: mpsc::UnboundedReceiver<ServerWs>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(ws) = accept_async(stream).await {
                    if tx.send(ws).is_err() {
                        break;
                    }
                }
            }
        });
        Self {
            endpoint: format!("ws://{addr}/ws"),
            conns: rx,
        }
    }

    async fn accept(&mut self) -> ServerWs {
        timeout(Duration::from_secs(5), self.conns.recv())
            .await
            .expect("no connection within 5s")
            .expect("listener task gone")
    }

    async fn try_accept(&mut self, wait: Duration) -> Option<ServerWs> {
        timeout(wait, self.conns.recv()).await.ok().flatten()
    }
}

fn test_config(endpoint: &str) -> RealtimeConfig {
    RealtimeConfig::builder()
        .endpoint(endpoint)
        .connect_timeout(Duration::from_secs(2))
        .reconnect_base_delay(Duration::from_millis(50))
        .max_reconnect_attempts(5)
        .build()
}

async fn recv_frame(ws: &mut ServerWs) -> Frame {
    let codec = FrameCodec::new();
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .expect("stream ended")
            .expect("socket error");
        match message {
            Message::Text(text) => return codec.decode(&text).expect("invalid frame"),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

async fn send_frame(ws: &mut ServerWs, frame: &Frame) {
    let codec = FrameCodec::new();
    ws.send(Message::Text(codec.encode(frame).unwrap()))
        .await
        .expect("server send failed");
}

async fn no_frame_within(ws: &mut ServerWs, wait: Duration) -> bool {
    timeout(wait, ws.next()).await.is_err()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        loop {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}

async fn wait_for_status(handle: &RealtimeHandle, status: ConnectionStatus) {
    wait_until(|| handle.status() == status).await;
}

fn event_frame(channel: &str, event_type: &str, payload: serde_json::Value) -> Frame {
    let map = payload.as_object().cloned().unwrap_or_default();
    Frame::event(channel, event_type, map)
}

#[tokio::test]
async fn test_subscribe_before_connect_sends_exactly_one_frame() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));

    // Queued while idle; duplicate must not produce a second request.
    handle.subscribe("investigation:42");
    handle.subscribe("investigation:42");
    handle.connect();

    let mut ws = server.accept().await;
    let frame = recv_frame(&mut ws).await;
    assert_eq!(frame.kind, "subscribe");
    assert_eq!(frame.channel.as_deref(), Some("investigation:42"));

    assert!(no_frame_within(&mut ws, Duration::from_millis(300)).await);
}

#[tokio::test]
async fn test_unsubscribe_before_connect_sends_nothing() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));

    handle.subscribe("investigation:42");
    handle.unsubscribe("investigation:42");
    handle.connect();

    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    let snapshot = handle.subscriptions();
    assert!(snapshot.desired.is_empty());
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.confirmed.is_empty());
    assert!(no_frame_within(&mut ws, Duration::from_millis(300)).await);
}

#[tokio::test]
async fn test_ack_confirms_and_projections_stay_scoped() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    let context = RealtimeContext::bound(handle.clone());
    let mut watcher = InvestigationWatcher::new(&context, "42");

    let frame = recv_frame(&mut ws).await;
    assert_eq!(frame.kind, "subscribe");
    assert_eq!(frame.channel.as_deref(), Some("investigation:42"));
    wait_until(|| handle.subscriptions().pending == vec!["investigation:42".to_string()]).await;

    send_frame(&mut ws, &Frame::ack("subscribe", "investigation:42", true)).await;
    wait_until(|| handle.subscriptions().confirmed == vec!["investigation:42".to_string()]).await;
    assert!(handle.subscriptions().pending.is_empty());

    // A data frame for another investigation never reaches this projection.
    send_frame(&mut ws, &event_frame("investigation:7", "started", json!({}))).await;
    wait_until(|| handle.history().len() == 1).await;
    watcher.pump();
    assert_eq!(watcher.state().lifecycle, Lifecycle::Queued);

    send_frame(&mut ws, &event_frame("investigation:42", "started", json!({}))).await;
    wait_until(|| {
        watcher.pump();
        watcher.state().lifecycle == Lifecycle::Running
    })
    .await;
}

#[tokio::test]
async fn test_replay_on_reconnect_before_connected() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    handle.subscribe("investigation:1");
    handle.subscribe("investigation:2");
    for _ in 0..2 {
        let frame = recv_frame(&mut ws).await;
        assert_eq!(frame.kind, "subscribe");
        send_frame(
            &mut ws,
            &Frame::ack("subscribe", frame.channel.as_deref().unwrap(), true),
        )
        .await;
    }
    wait_until(|| handle.subscriptions().confirmed.len() == 2).await;

    // Abnormal loss: no close handshake.
    drop(ws);

    let mut ws2 = server.accept().await;
    let first = recv_frame(&mut ws2).await;
    let second = recv_frame(&mut ws2).await;
    let mut replayed = vec![
        first.channel.as_deref().unwrap().to_string(),
        second.channel.as_deref().unwrap().to_string(),
    ];
    replayed.sort();
    assert_eq!(first.kind, "subscribe");
    assert_eq!(second.kind, "subscribe");
    assert_eq!(
        replayed,
        vec!["investigation:1".to_string(), "investigation:2".to_string()]
    );

    wait_for_status(&handle, ConnectionStatus::Connected).await;
    // The fresh transport has acked nothing yet.
    let snapshot = handle.subscriptions();
    assert!(snapshot.confirmed.is_empty());
    assert_eq!(snapshot.pending.len(), 2);
}

#[tokio::test]
async fn test_reconnect_exhaustion_settles_idle() {
    // Bind then drop, so the port refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RealtimeConfig::builder()
        .endpoint(format!("ws://{addr}/ws"))
        .connect_timeout(Duration::from_millis(500))
        .reconnect_base_delay(Duration::from_millis(20))
        .max_reconnect_attempts(2)
        .build();
    let handle = RealtimeClient::spawn(config);
    handle.connect();

    wait_until(|| handle.status() != ConnectionStatus::Idle).await;
    // Initial failure plus two retries, then give up.
    wait_for_status(&handle, ConnectionStatus::Idle).await;
    assert!(!handle.is_connected());
}

#[tokio::test]
async fn test_history_is_bounded() {
    let mut server = TestServer::start().await;
    let config = RealtimeConfig::builder()
        .endpoint(server.endpoint.as_str())
        .history_capacity(3)
        .build();
    let handle = RealtimeClient::spawn(config);
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    for n in 0..4 {
        send_frame(
            &mut ws,
            &event_frame("investigation:42", "progress", json!({"progress_pct": n})),
        )
        .await;
    }

    wait_until(|| {
        let history = handle.history();
        history.len() == 3 && history[0].payload_f64("progress_pct") == Some(1.0)
    })
    .await;
}

#[tokio::test]
async fn test_completed_event_projects_terminal_state() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    let context = RealtimeContext::bound(handle.clone());
    let mut watcher = InvestigationWatcher::new(&context, "x1");
    let subscribe = recv_frame(&mut ws).await;
    send_frame(
        &mut ws,
        &Frame::ack("subscribe", subscribe.channel.as_deref().unwrap(), true),
    )
    .await;

    send_frame(&mut ws, &event_frame("investigation:x1", "started", json!({}))).await;
    send_frame(
        &mut ws,
        &event_frame(
            "investigation:x1",
            "completed",
            json!({"success": true, "root_cause": "R", "confidence": 0.8}),
        ),
    )
    .await;

    wait_until(|| {
        watcher.pump();
        watcher.state().lifecycle == Lifecycle::Succeeded
    })
    .await;
    let state = watcher.state();
    assert_eq!(state.phase, "completed");
    assert!((state.progress_pct - 100.0).abs() < f64::EPSILON);
    assert_eq!(state.root_cause.as_deref(), Some("R"));
    assert_eq!(state.confidence, Some(0.8));
}

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    let mut server = TestServer::start().await;
    let config = RealtimeConfig::builder()
        .endpoint(server.endpoint.as_str())
        // Long enough that the timer is still pending when we disconnect.
        .reconnect_base_delay(Duration::from_secs(5))
        .max_reconnect_attempts(5)
        .build();
    let handle = RealtimeClient::spawn(config);
    handle.connect();
    let ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    drop(ws);
    wait_for_status(&handle, ConnectionStatus::Reconnecting).await;

    handle.disconnect();
    wait_for_status(&handle, ConnectionStatus::Idle).await;

    // No further automatic attempt until connect() is called again.
    assert!(server.try_accept(Duration::from_millis(300)).await.is_none());

    handle.connect();
    assert!(server.try_accept(Duration::from_secs(5)).await.is_some());
}

#[tokio::test]
async fn test_heartbeat_and_malformed_frames_dropped() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    ws.send(Message::Text("definitely not a frame".to_string()))
        .await
        .unwrap();
    send_frame(&mut ws, &Frame::heartbeat()).await;
    send_frame(&mut ws, &event_frame("investigation:42", "progress", json!({}))).await;

    wait_until(|| handle.history().len() == 1).await;
    // One bad frame never tears the connection down.
    assert_eq!(handle.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_send_delivers_payload_when_connected() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    assert!(handle.send(json!({"type": "refresh_request", "channel": "investigation:42"})));
    let frame = recv_frame(&mut ws).await;
    assert_eq!(frame.kind, "refresh_request");
}

#[tokio::test]
async fn test_unsubscribe_sends_frame_and_clears_sets() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    handle.subscribe("investigation:42");
    let subscribe = recv_frame(&mut ws).await;
    assert_eq!(subscribe.kind, "subscribe");

    handle.unsubscribe("investigation:42");
    let unsubscribe = recv_frame(&mut ws).await;
    assert_eq!(unsubscribe.kind, "unsubscribe");
    assert_eq!(unsubscribe.channel.as_deref(), Some("investigation:42"));

    let snapshot = handle.subscriptions();
    assert!(snapshot.desired.is_empty());
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.confirmed.is_empty());
}

#[tokio::test]
async fn test_watcher_drop_unsubscribes() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    let context = RealtimeContext::bound(handle.clone());
    let watcher = InvestigationWatcher::new(&context, "42");
    let subscribe = recv_frame(&mut ws).await;
    assert_eq!(subscribe.kind, "subscribe");

    drop(watcher);
    let unsubscribe = recv_frame(&mut ws).await;
    assert_eq!(unsubscribe.kind, "unsubscribe");
    assert_eq!(unsubscribe.channel.as_deref(), Some("investigation:42"));
    wait_until(|| handle.subscriptions().desired.is_empty()).await;
}

#[tokio::test]
async fn test_stale_ack_for_unsubscribed_channel_is_ignored() {
    let mut server = TestServer::start().await;
    let handle = RealtimeClient::spawn(test_config(&server.endpoint));
    handle.connect();
    let mut ws = server.accept().await;
    wait_for_status(&handle, ConnectionStatus::Connected).await;

    handle.subscribe("investigation:42");
    let _ = recv_frame(&mut ws).await;
    handle.unsubscribe("investigation:42");
    let _ = recv_frame(&mut ws).await;

    // Ack arrives after the unsubscribe already won.
    send_frame(&mut ws, &Frame::ack("subscribe", "investigation:42", true)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = handle.subscriptions();
    assert!(snapshot.confirmed.is_empty());
    assert!(snapshot.desired.is_empty());
}
