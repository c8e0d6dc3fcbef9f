// ABOUTME: Integration tests for the exec session bridge over an in-memory
// transport: lifecycle, heartbeat cadence, resize coalescing, failure paths

use async_trait::async_trait;
use ctf_console::terminal::{
    BridgeConfig, SessionHandle, SessionState, TerminalBridge, Transport, TransportError,
    TransportEvent,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

struct FakeTransport {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    fail_sends: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        // Record the attempt even when the send is made to fail, so tests
        // can assert that a frame was tried.
        let _ = self.sent.send(text);
        if self.fail_sends {
            return Err(TransportError::Other("transport half-closed".into()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Test-side view of the fake transport.
struct Remote {
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
    sent_rx: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl Remote {
    fn drain_sent(&mut self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.sent_rx.try_recv() {
            frames.push(serde_json::from_str(&text).expect("outbound frames are JSON"));
        }
        frames
    }

    fn send_text(&self, text: &str) {
        self.inbound_tx
            .send(TransportEvent::Text(text.to_string()))
            .unwrap();
    }

    fn send_binary(&self, bytes: &[u8]) {
        self.inbound_tx
            .send(TransportEvent::Binary(bytes.to_vec()))
            .unwrap();
    }

    fn drop_connection(&self) {
        self.inbound_tx.send(TransportEvent::Closed).unwrap();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn fake_pair(fail_sends: bool) -> (FakeTransport, Remote) {
    let (inbound_tx, inbound) = mpsc::unbounded_channel();
    let (sent, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    (
        FakeTransport {
            inbound,
            sent,
            closed: closed.clone(),
            fail_sends,
        },
        Remote {
            inbound_tx,
            sent_rx,
            closed,
        },
    )
}

fn bridge() -> TerminalBridge {
    TerminalBridge::new("ws://test", BridgeConfig::default())
}

/// Open a session whose handshake completes only when the returned gate is
/// fired, so tests can observe the Connecting phase.
fn open_gated(
    bridge: &TerminalBridge,
    pod: &str,
    container: &str,
    label: &str,
    fail_sends: bool,
) -> (SessionHandle, Remote, oneshot::Sender<()>) {
    let (fake, remote) = fake_pair(fail_sends);
    let (gate_tx, gate_rx) = oneshot::channel::<()>();
    let handle = bridge
        .open_with_dialer(pod, container, label, async move {
            let _ = gate_rx.await;
            Ok(fake)
        })
        .expect("identifiers are non-empty");
    (handle, remote, gate_tx)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn ops(frames: &[serde_json::Value]) -> Vec<&str> {
    frames.iter().filter_map(|f| f["op"].as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn open_with_empty_identifier_is_inert() {
    let bridge = bridge();
    let (fake, _remote) = fake_pair(false);
    assert!(bridge
        .open_with_dialer("", "shell-1", "", async move { Ok(fake) })
        .is_none());
    let (fake, _remote) = fake_pair(false);
    assert!(bridge
        .open_with_dialer("pod-1", "", "", async move { Ok(fake) })
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn close_is_idempotent_and_never_reopens() {
    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    gate.send(()).unwrap();
    settle().await;
    assert_eq!(handle.state(), SessionState::Connected);

    handle.close();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(remote.is_closed());
    assert_eq!(ops(&remote.drain_sent()), vec!["exit"]);

    // Closing again must not error, emit frames, or resurrect anything.
    handle.close();
    handle.close();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(remote.drain_sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn input_is_dropped_outside_connected() {
    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);

    // Connecting: dropped, not queued.
    handle.send_input("early");
    settle().await;
    assert!(remote.drain_sent().is_empty());

    gate.send(()).unwrap();
    settle().await;
    // Nothing from the dropped input shows up after connect either.
    assert!(remote.drain_sent().is_empty());

    handle.close();
    tokio::time::sleep(Duration::from_millis(250)).await;
    remote.drain_sent();

    // Closed: dropped without error.
    handle.send_input("late");
    settle().await;
    assert!(remote.drain_sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rapid_resizes_coalesce_to_one_frame() {
    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    gate.send(()).unwrap();
    settle().await;
    remote.drain_sent();

    handle.notify_resize(80, 24);
    handle.notify_resize(100, 30);
    handle.notify_resize(132, 43);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let frames = remote.drain_sent();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["op"], "resize");
    assert_eq!(frames[0]["cols"], 132);
    assert_eq!(frames[0]["rows"], 43);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_runs_only_while_connected() {
    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);

    // Still dialing: 25 s pass, nothing is sent.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(remote.drain_sent().is_empty());

    gate.send(()).unwrap();
    settle().await;
    remote.drain_sent();

    tokio::time::sleep(Duration::from_millis(20_500)).await;
    let frames = remote.drain_sent();
    let pings: Vec<_> = frames.iter().filter(|f| f["op"] == "ping").collect();
    assert!(!pings.is_empty(), "expected at least one ping in 20.5s");
    assert!(pings.iter().all(|p| p["t"].is_i64()));
    assert_eq!(handle.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn non_json_inbound_text_reaches_the_surface() {
    let bridge = bridge();
    let (mut handle, remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    let mut output = handle.take_output().unwrap();
    gate.send(()).unwrap();
    settle().await;

    remote.send_text("definitely { not json");
    settle().await;

    let mut seen = String::new();
    while let Ok(chunk) = output.try_recv() {
        seen.push_str(&chunk);
    }
    assert!(seen.contains("definitely { not json"));
    assert_eq!(handle.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn inbound_error_frame_renders_without_closing() {
    let bridge = bridge();
    let (mut handle, remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    let mut output = handle.take_output().unwrap();
    gate.send(()).unwrap();
    settle().await;

    remote.send_text(r#"{"op":"error","data":"container restarting"}"#);
    settle().await;

    let mut seen = String::new();
    while let Ok(chunk) = output.try_recv() {
        seen.push_str(&chunk);
    }
    assert!(seen.contains("Error: container restarting"));
    assert_eq!(handle.state(), SessionState::Connected);
    assert!(!remote.is_closed());
}

#[tokio::test(start_paused = true)]
async fn exit_is_attempted_before_forced_close_even_when_send_fails() {
    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "", true);
    gate.send(()).unwrap();
    settle().await;
    remote.drain_sent();

    handle.close();
    settle().await;

    // Exit attempted, forced close still pending within the grace period.
    assert_eq!(ops(&remote.drain_sent()), vec!["exit"]);
    assert!(!remote.is_closed());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(remote.is_closed());
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn end_to_end_session_lifecycle() {
    let bridge = bridge();
    let (mut handle, mut remote, gate) = open_gated(&bridge, "pod-7", "shell-1", "teamA", false);
    assert_eq!(handle.id().pod, "pod-7");
    assert_eq!(handle.label(), "teamA");

    // Initial geometry requested before the handshake completes.
    handle.notify_resize(80, 24);
    settle().await;
    assert_eq!(handle.state(), SessionState::Connecting);
    assert!(remote.drain_sent().is_empty());

    gate.send(()).unwrap();
    settle().await;
    assert_eq!(handle.state(), SessionState::Connected);

    let frames = remote.drain_sent();
    assert_eq!(frames.len(), 1, "exactly one resize on connect");
    assert_eq!(frames[0]["op"], "resize");
    assert_eq!(frames[0]["cols"], 80);
    assert_eq!(frames[0]["rows"], 24);

    // Remote process output lands on the surface.
    let output = handle.take_output().unwrap();
    let mut surface = ctf_console::terminal::TerminalSurface::new(80, 24, output);
    remote.send_binary(b"hello\n");
    settle().await;
    surface.drain();
    assert!(surface.contents().contains("hello"));

    // Keystrokes go out as input frames.
    handle.send_input("whoami\r");
    settle().await;
    let frames = remote.drain_sent();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["op"], "input");
    assert_eq!(frames[0]["data"], "whoami\r");

    handle.close();
    settle().await;
    assert_eq!(ops(&remote.drain_sent()), vec!["exit"]);
    assert!(!remote.is_closed());
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(remote.is_closed());
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn sessions_are_independent() {
    let bridge = bridge();
    let (first, remote_a, gate_a) = open_gated(&bridge, "pod-1", "shell", "teamA", false);
    let (second, mut remote_b, gate_b) = open_gated(&bridge, "pod-2", "shell", "teamB", false);
    gate_a.send(()).unwrap();
    gate_b.send(()).unwrap();
    settle().await;
    assert_eq!(first.state(), SessionState::Connected);
    assert_eq!(second.state(), SessionState::Connected);
    assert_ne!(first.instance(), second.instance());

    first.close();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(first.state(), SessionState::Closed);
    assert!(remote_a.is_closed());

    // The second session is untouched and still functional.
    assert_eq!(second.state(), SessionState::Connected);
    assert!(!remote_b.is_closed());
    remote_b.drain_sent();
    second.send_input("ls\r");
    settle().await;
    assert_eq!(ops(&remote_b.drain_sent()), vec!["input"]);
}

#[tokio::test(start_paused = true)]
async fn remote_close_terminates_with_a_trace_and_no_reconnect() {
    let bridge = bridge();
    let (mut handle, remote, gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    let mut output = handle.take_output().unwrap();
    gate.send(()).unwrap();
    settle().await;

    remote.drop_connection();
    settle().await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(remote.is_closed());

    let mut seen = String::new();
    while let Ok(chunk) = output.try_recv() {
        seen.push_str(&chunk);
    }
    assert!(seen.contains("Connection closed"));

    // No automatic reconnect: the state stays Closed no matter how long we
    // wait.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn dial_failure_closes_with_an_error_line() {
    let bridge = bridge();
    let mut handle = bridge
        .open_with_dialer::<FakeTransport, _>("pod-1", "shell", "", async move {
            Err(TransportError::Other("connection refused".into()))
        })
        .unwrap();
    let mut output = handle.take_output().unwrap();
    settle().await;

    assert_eq!(handle.state(), SessionState::Closed);
    let mut seen = String::new();
    while let Ok(chunk) = output.try_recv() {
        seen.push_str(&chunk);
    }
    assert!(seen.contains("Connection error"));
    assert!(seen.contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn window_chrome_changes_never_touch_the_session() {
    use ctf_console::app::{AppState, TerminalWindow, WindowChrome};

    let bridge = bridge();
    let (handle, mut remote, gate) = open_gated(&bridge, "pod-1", "shell", "teamA", false);

    let mut state = AppState::default();
    state
        .windows
        .push(TerminalWindow::new(handle, WindowChrome::centered((120, 40))));
    state.focused_window = Some(0);

    gate.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    // The window's initial geometry is the only frame so far.
    assert_eq!(ops(&remote.drain_sent()), vec!["resize"]);

    // Minimize and focus cycling are cosmetic: no frames, no state change.
    state.minimize_focused_window();
    state.focus_next_window();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(remote.drain_sent().is_empty());
    assert_eq!(state.windows[0].handle.state(), SessionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn close_during_connecting_aborts_the_dial() {
    let bridge = bridge();
    let (handle, mut remote, _gate) = open_gated(&bridge, "pod-1", "shell", "", false);
    settle().await;
    assert_eq!(handle.state(), SessionState::Connecting);

    handle.close();
    settle().await;
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(remote.drain_sent().is_empty());
}
