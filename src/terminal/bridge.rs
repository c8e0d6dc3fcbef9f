// ABOUTME: Async driver for exec sessions: dials the transport, runs the
// select loop over commands/frames/timers, and executes the FSM's actions

use crate::terminal::session::{Action, ErrorFramePolicy, SessionFsm, SessionId, SessionState};
use crate::terminal::transport::{exec_url, Transport, TransportError, TransportEvent, WsTransport};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Temporal tunables of the bridge. Defaults mirror the exec contract:
/// a ping every 20 s while connected, resize bursts coalesced over 150 ms,
/// and a 200 ms grace between the exit notice and the forced close.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub heartbeat_interval: Duration,
    pub resize_debounce: Duration,
    pub close_grace: Duration,
    pub error_frame_policy: ErrorFramePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(20),
            resize_debounce: Duration::from_millis(150),
            close_grace: Duration::from_millis(200),
            error_frame_policy: ErrorFramePolicy::Inline,
        }
    }
}

enum Command {
    Input(String),
    Resize { cols: u16, rows: u16 },
    Close,
}

/// Caller-side handle to one live exec session.
///
/// The handle never touches the transport directly; every operation is a
/// message to the session's driver task. All methods are safe to call in
/// any state: input outside `Connected` is dropped, close is idempotent.
pub struct SessionHandle {
    id: SessionId,
    label: String,
    instance: Uuid,
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<SessionState>,
    output_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for state transitions; the view layer subscribes here
    /// instead of polling the transport.
    pub fn state_changes(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Surface text stream: everything the session wants rendered, in
    /// arrival order. Single consumer; the first caller takes it.
    pub fn take_output(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.output_rx.take()
    }

    /// Forward keystrokes. Dropped silently unless the session is
    /// connected.
    pub fn send_input(&self, data: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::Input(data.into()));
    }

    /// Report a geometry change. Debounced while connected; remembered and
    /// flushed on connect otherwise.
    pub fn notify_resize(&self, cols: u16, rows: u16) {
        let _ = self.cmd_tx.send(Command::Resize { cols, rows });
    }

    /// Request orderly shutdown. Safe to call repeatedly and after the
    /// session has already closed.
    pub fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close);
    }
}

/// Factory for exec sessions against one backend.
pub struct TerminalBridge {
    ws_base: String,
    config: BridgeConfig,
}

impl TerminalBridge {
    /// `ws_base` is the WebSocket origin of the backend, e.g.
    /// `wss://ctf.example`.
    pub fn new(ws_base: impl Into<String>, config: BridgeConfig) -> Self {
        Self {
            ws_base: ws_base.into(),
            config,
        }
    }

    /// Open a session to `(pod, container)`. Returns `None` when either
    /// identifier is empty: nothing is dialed and no task is spawned.
    pub fn open(&self, pod: &str, container: &str, label: &str) -> Option<SessionHandle> {
        let id = SessionId::new(pod, container)?;
        let url = exec_url(&self.ws_base, &id);
        self.spawn(id, label, async move { WsTransport::dial(&url).await })
    }

    /// Open a session over a caller-supplied dial future. This is the seam
    /// the integration tests drive with an in-memory transport.
    pub fn open_with_dialer<T, F>(
        &self,
        pod: &str,
        container: &str,
        label: &str,
        dial: F,
    ) -> Option<SessionHandle>
    where
        T: Transport + 'static,
        F: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let id = SessionId::new(pod, container)?;
        self.spawn(id, label, dial)
    }

    fn spawn<T, F>(&self, id: SessionId, label: &str, dial: F) -> Option<SessionHandle>
    where
        T: Transport + 'static,
        F: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let fsm = SessionFsm::new(id.clone(), label, self.config.error_frame_policy);
        let instance = fsm.instance();
        let config = self.config.clone();

        tokio::spawn(run_session(fsm, dial, cmd_rx, out_tx, state_tx, config));

        Some(SessionHandle {
            id,
            label: label.to_string(),
            instance,
            cmd_tx,
            state_rx,
            output_rx: Some(out_rx),
        })
    }
}

/// One task per session: owns the FSM and the transport for its whole
/// lifetime. Sessions are fully independent; nothing here is shared.
async fn run_session<T, F>(
    mut fsm: SessionFsm,
    dial: F,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    out_tx: mpsc::UnboundedSender<String>,
    state_tx: watch::Sender<SessionState>,
    config: BridgeConfig,
) where
    T: Transport,
    F: Future<Output = Result<T, TransportError>> + Send,
{
    emit_writes(fsm.begin_connect(), &out_tx);
    state_tx.send_replace(fsm.state());

    // Dial phase: commands are serviced while the handshake is in flight so
    // that input is dropped, geometry is remembered, and close aborts the
    // attempt.
    tokio::pin!(dial);
    let mut transport = loop {
        tokio::select! {
            result = &mut dial => match result {
                Ok(transport) => break transport,
                Err(e) => {
                    emit_writes(fsm.transport_error(&e.to_string()), &out_tx);
                    state_tx.send_replace(fsm.state());
                    return;
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Input(data)) => emit_writes(fsm.input(data), &out_tx),
                Some(Command::Resize { cols, rows }) => {
                    fsm.resize_requested(cols, rows);
                }
                Some(Command::Close) | None => {
                    // Dropping the dial future abandons the handshake.
                    emit_writes(fsm.close_requested(), &out_tx);
                    state_tx.send_replace(fsm.state());
                    return;
                }
            },
        }
    };

    perform(fsm.transport_opened(), &mut transport, &out_tx).await;
    state_tx.send_replace(fsm.state());

    let mut heartbeat = tokio::time::interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    let mut resize_deadline: Option<Instant> = None;

    enum Wake {
        Heartbeat,
        ResizeDue,
        Command(Option<Command>),
        Transport(TransportEvent),
    }

    loop {
        let deadline = resize_deadline;
        let debounce = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        // The select only picks the wake reason; the transport borrow ends
        // here so the dispatch below can drive it.
        let wake = tokio::select! {
            _ = heartbeat.tick() => Wake::Heartbeat,
            () = debounce => Wake::ResizeDue,
            cmd = cmd_rx.recv() => Wake::Command(cmd),
            event = transport.recv() => Wake::Transport(event),
        };

        match wake {
            Wake::Heartbeat => {
                perform(fsm.heartbeat_tick(), &mut transport, &out_tx).await;
            }
            Wake::ResizeDue => {
                resize_deadline = None;
                perform(fsm.resize_due(), &mut transport, &out_tx).await;
            }
            Wake::Command(Some(Command::Input(data))) => {
                perform(fsm.input(data), &mut transport, &out_tx).await;
            }
            Wake::Command(Some(Command::Resize { cols, rows })) => {
                if fsm.resize_requested(cols, rows) {
                    resize_deadline = Some(Instant::now() + config.resize_debounce);
                }
            }
            Wake::Command(Some(Command::Close) | None) => {
                perform(fsm.close_requested(), &mut transport, &out_tx).await;
            }
            Wake::Transport(TransportEvent::Text(text)) => {
                perform(fsm.inbound_text(&text), &mut transport, &out_tx).await;
            }
            Wake::Transport(TransportEvent::Binary(bytes)) => {
                perform(fsm.inbound_binary(&bytes), &mut transport, &out_tx).await;
            }
            Wake::Transport(TransportEvent::Closed) => {
                perform(fsm.transport_closed(), &mut transport, &out_tx).await;
            }
            Wake::Transport(TransportEvent::Error(e)) => {
                perform(fsm.transport_error(&e), &mut transport, &out_tx).await;
            }
        }

        state_tx.send_replace(fsm.state());

        match fsm.state() {
            SessionState::Closing => {
                // Grace period between the exit notice and the forced
                // close; the close happens whether or not the exit frame
                // made it out.
                tokio::time::sleep(config.close_grace).await;
                fsm.grace_elapsed();
                if let Err(e) = transport.close().await {
                    debug!(session = %fsm.id(), error = %e, "transport close after grace");
                }
                state_tx.send_replace(fsm.state());
                break;
            }
            SessionState::Closed => {
                if let Err(e) = transport.close().await {
                    debug!(session = %fsm.id(), error = %e, "transport close");
                }
                break;
            }
            _ => {}
        }
    }

    debug!(session = %fsm.id(), "exec session ended");
}

/// Execute actions in a phase where no transport exists yet. Send actions
/// cannot arise there; drop them defensively if they ever do.
fn emit_writes(actions: Vec<Action>, out_tx: &mpsc::UnboundedSender<String>) {
    for action in actions {
        match action {
            Action::Write(text) => {
                let _ = out_tx.send(text);
            }
            Action::Send(frame) => {
                warn!(?frame, "send action before transport exists, dropped");
            }
        }
    }
}

/// Execute actions against a live transport. Send failures are logged and
/// swallowed: a failing frame never tears the session down by itself, the
/// transport's own close/error event does.
async fn perform<T: Transport>(
    actions: Vec<Action>,
    transport: &mut T,
    out_tx: &mpsc::UnboundedSender<String>,
) {
    for action in actions {
        match action {
            Action::Write(text) => {
                let _ = out_tx.send(text);
            }
            Action::Send(frame) => match serde_json::to_string(&frame) {
                Ok(json) => {
                    if let Err(e) = transport.send_text(json).await {
                        debug!(error = %e, "outbound frame failed");
                    }
                }
                Err(e) => warn!(error = %e, "frame serialization failed"),
            },
        }
    }
}
