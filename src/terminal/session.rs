// ABOUTME: Per-session state machine for the container exec bridge
// Sans-IO: receives named events, returns the frames/surface writes to perform

use crate::terminal::protocol::{ClientFrame, ServerFrame};
use tracing::{debug, trace};
use uuid::Uuid;

/// Identity of an exec session: one (pod, container) pair.
///
/// Both identifiers are opaque backend names. Construction fails on empty
/// identifiers, which makes an invalid `open` inert at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub pod: String,
    pub container: String,
}

impl SessionId {
    pub fn new(pod: impl Into<String>, container: impl Into<String>) -> Option<Self> {
        let pod = pod.into();
        let container = container.into();
        if pod.is_empty() || container.is_empty() {
            return None;
        }
        Some(Self { pod, container })
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pod, self.container)
    }
}

/// Connection lifecycle of a session. `Closed` is terminal; reopening an
/// identity creates a fresh session instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Closing,
    Closed,
}

impl SessionState {
    pub fn is_live(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Connected)
    }
}

/// What to do with an inbound `{"op":"error"}` control frame.
///
/// The backend emits these for non-fatal conditions and keeps the stream
/// open, so `Inline` (render the line, stay connected) is the default.
/// `Fatal` runs the orderly close sequence instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFramePolicy {
    #[default]
    Inline,
    Fatal,
}

/// Side effects requested by a transition. The driver performs them in
/// order: `Send` goes out on the transport, `Write` goes to the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(ClientFrame),
    Write(String),
}

/// The exec session state machine.
///
/// Owns no IO and no timers. The async driver feeds it events (transport
/// opened/closed, inbound payloads, user input, timer ticks) and executes
/// whatever actions come back. This keeps the full transition table
/// testable without a socket.
pub struct SessionFsm {
    id: SessionId,
    label: String,
    instance: Uuid,
    state: SessionState,
    /// Last geometry actually sent to the remote side.
    geometry: Option<(u16, u16)>,
    /// Most recent requested geometry not yet on the wire.
    pending_resize: Option<(u16, u16)>,
    policy: ErrorFramePolicy,
}

impl SessionFsm {
    pub fn new(id: SessionId, label: impl Into<String>, policy: ErrorFramePolicy) -> Self {
        Self {
            id,
            label: label.into(),
            instance: Uuid::new_v4(),
            state: SessionState::Idle,
            geometry: None,
            pending_resize: None,
            policy,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Unique per `open`; distinguishes a reopened identity from the
    /// session it replaced.
    pub fn instance(&self) -> Uuid {
        self.instance
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Start dialing. Valid only from `Idle`.
    pub fn begin_connect(&mut self) -> Vec<Action> {
        if self.state != SessionState::Idle {
            return Vec::new();
        }
        self.state = SessionState::Connecting;
        vec![Action::Write(format!("Connecting to {}...\r\n", self.id))]
    }

    /// Transport handshake completed. Flushes any geometry requested while
    /// the session was still dialing, as a single resize frame.
    pub fn transport_opened(&mut self) -> Vec<Action> {
        if self.state != SessionState::Connecting {
            return Vec::new();
        }
        self.state = SessionState::Connected;
        debug!(session = %self.id, "exec transport connected");

        let mut actions = vec![Action::Write("\r\nConnected!\r\n".to_string())];
        if let Some((cols, rows)) = self.pending_resize.take() {
            self.geometry = Some((cols, rows));
            actions.push(Action::Send(ClientFrame::resize(cols, rows)));
        }
        actions
    }

    /// Transport failed, either during the handshake or mid-stream. The
    /// session dies in place; there is no automatic reconnect.
    pub fn transport_error(&mut self, message: &str) -> Vec<Action> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }
        debug!(session = %self.id, error = message, "exec transport error");
        self.state = SessionState::Closed;
        vec![Action::Write(format!("\r\nConnection error: {message}\r\n"))]
    }

    /// Remote side closed the transport (or the driver observed EOF after
    /// a local close). Always leaves a legible trace on the surface.
    pub fn transport_closed(&mut self) -> Vec<Action> {
        if self.state == SessionState::Closed {
            return Vec::new();
        }
        self.state = SessionState::Closed;
        vec![Action::Write("\r\nConnection closed\r\n".to_string())]
    }

    /// Local close request. Idempotent: once `Closing` or `Closed`, further
    /// requests do nothing. From `Connected` this emits the best-effort
    /// exit notice; the driver force-closes the transport after the grace
    /// period regardless of whether that send succeeds.
    pub fn close_requested(&mut self) -> Vec<Action> {
        match self.state {
            SessionState::Idle | SessionState::Connecting => {
                self.state = SessionState::Closed;
                Vec::new()
            }
            SessionState::Connected => {
                self.state = SessionState::Closing;
                vec![Action::Send(ClientFrame::Exit)]
            }
            SessionState::Closing | SessionState::Closed => Vec::new(),
        }
    }

    /// The post-exit grace period elapsed; the driver will now force-close
    /// the transport.
    pub fn grace_elapsed(&mut self) -> Vec<Action> {
        if self.state == SessionState::Closing {
            self.state = SessionState::Closed;
        }
        Vec::new()
    }

    /// Heartbeat timer fired. Pings are fire-and-forget and only ever sent
    /// while connected; no pong is awaited.
    pub fn heartbeat_tick(&mut self) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return Vec::new();
        }
        trace!(session = %self.id, "heartbeat");
        vec![Action::Send(ClientFrame::ping())]
    }

    /// User keystrokes. Dropped (not queued) unless connected.
    pub fn input(&mut self, data: String) -> Vec<Action> {
        if self.state != SessionState::Connected {
            trace!(session = %self.id, state = ?self.state, "dropping input while not connected");
            return Vec::new();
        }
        vec![Action::Send(ClientFrame::Input { data })]
    }

    /// Geometry change requested. The newest value always wins. Returns
    /// `true` when the driver should (re)arm the debounce timer; while not
    /// connected the geometry is merely remembered and flushed on connect.
    pub fn resize_requested(&mut self, cols: u16, rows: u16) -> bool {
        self.pending_resize = Some((cols, rows));
        self.state == SessionState::Connected
    }

    /// Debounce window elapsed: emit the coalesced geometry, if any.
    pub fn resize_due(&mut self) -> Vec<Action> {
        if self.state != SessionState::Connected {
            return Vec::new();
        }
        match self.pending_resize.take() {
            Some((cols, rows)) => {
                self.geometry = Some((cols, rows));
                vec![Action::Send(ClientFrame::resize(cols, rows))]
            }
            None => Vec::new(),
        }
    }

    /// Inbound text payload. Recognized control frames are handled; every
    /// other payload is process output and goes to the surface verbatim.
    pub fn inbound_text(&mut self, text: &str) -> Vec<Action> {
        if let Ok(ServerFrame::Error { data }) = serde_json::from_str::<ServerFrame>(text) {
            let mut actions = vec![Action::Write(format!("\r\nError: {data}\r\n"))];
            if self.policy == ErrorFramePolicy::Fatal {
                actions.extend(self.close_requested());
            }
            return actions;
        }
        vec![Action::Write(text.to_string())]
    }

    /// Inbound binary payload: raw process output. Decoded best-effort,
    /// never a failure.
    pub fn inbound_binary(&mut self, bytes: &[u8]) -> Vec<Action> {
        vec![Action::Write(String::from_utf8_lossy(bytes).into_owned())]
    }

    /// Last geometry put on the wire, if any.
    pub fn geometry(&self) -> Option<(u16, u16)> {
        self.geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn connected_fsm() -> SessionFsm {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let mut fsm = SessionFsm::new(id, "teamA", ErrorFramePolicy::Inline);
        fsm.begin_connect();
        fsm.transport_opened();
        assert_eq!(fsm.state(), SessionState::Connected);
        fsm
    }

    fn sent_frames(actions: &[Action]) -> Vec<ClientFrame> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(f) => Some(f.clone()),
                Action::Write(_) => None,
            })
            .collect()
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        assert!(SessionId::new("", "shell").is_none());
        assert!(SessionId::new("pod-1", "").is_none());
        assert!(SessionId::new("pod-1", "shell").is_some());
    }

    #[test]
    fn input_is_dropped_unless_connected() {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let mut fsm = SessionFsm::new(id, "", ErrorFramePolicy::Inline);
        assert!(fsm.input("x".into()).is_empty());

        fsm.begin_connect();
        assert!(fsm.input("x".into()).is_empty());

        let actions = fsm.transport_opened();
        assert!(sent_frames(&actions).is_empty());
        assert_eq!(
            fsm.input("x".into()),
            vec![Action::Send(ClientFrame::input("x"))]
        );

        fsm.close_requested();
        fsm.grace_elapsed();
        assert!(fsm.input("x".into()).is_empty());
    }

    #[test]
    fn pending_geometry_is_flushed_once_on_connect() {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let mut fsm = SessionFsm::new(id, "", ErrorFramePolicy::Inline);
        fsm.begin_connect();

        // Requested while still dialing: remembered, debounce not armed.
        assert!(!fsm.resize_requested(80, 24));
        assert!(!fsm.resize_requested(120, 40));

        let actions = fsm.transport_opened();
        assert_eq!(sent_frames(&actions), vec![ClientFrame::resize(120, 40)]);
        assert_eq!(fsm.geometry(), Some((120, 40)));

        // Nothing left pending afterwards.
        assert!(fsm.resize_due().is_empty());
    }

    #[test]
    fn resize_coalesces_to_last_value() {
        let mut fsm = connected_fsm();
        assert!(fsm.resize_requested(80, 24));
        assert!(fsm.resize_requested(100, 30));
        assert!(fsm.resize_requested(132, 43));

        let actions = fsm.resize_due();
        assert_eq!(sent_frames(&actions), vec![ClientFrame::resize(132, 43)]);
        assert!(fsm.resize_due().is_empty());
    }

    #[test]
    fn heartbeat_only_while_connected() {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let mut fsm = SessionFsm::new(id, "", ErrorFramePolicy::Inline);
        assert!(fsm.heartbeat_tick().is_empty());
        fsm.begin_connect();
        assert!(fsm.heartbeat_tick().is_empty());
        fsm.transport_opened();
        let actions = fsm.heartbeat_tick();
        assert!(matches!(
            actions.as_slice(),
            [Action::Send(ClientFrame::Ping { .. })]
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let mut fsm = connected_fsm();
        let first = fsm.close_requested();
        assert_eq!(sent_frames(&first), vec![ClientFrame::Exit]);
        assert_eq!(fsm.state(), SessionState::Closing);

        assert!(fsm.close_requested().is_empty());
        fsm.grace_elapsed();
        assert_eq!(fsm.state(), SessionState::Closed);
        assert!(fsm.close_requested().is_empty());
        assert_eq!(fsm.state(), SessionState::Closed);
    }

    #[test]
    fn inbound_error_frame_stays_connected_by_default() {
        let mut fsm = connected_fsm();
        let actions = fsm.inbound_text(r#"{"op":"error","data":"oom killed"}"#);
        assert_eq!(
            actions,
            vec![Action::Write("\r\nError: oom killed\r\n".to_string())]
        );
        assert_eq!(fsm.state(), SessionState::Connected);
    }

    #[test]
    fn fatal_policy_closes_on_error_frame() {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let mut fsm = SessionFsm::new(id, "", ErrorFramePolicy::Fatal);
        fsm.begin_connect();
        fsm.transport_opened();

        let actions = fsm.inbound_text(r#"{"op":"error","data":"fatal"}"#);
        assert_eq!(sent_frames(&actions), vec![ClientFrame::Exit]);
        assert_eq!(fsm.state(), SessionState::Closing);
    }

    #[test]
    fn malformed_inbound_text_is_written_verbatim() {
        let mut fsm = connected_fsm();
        let actions = fsm.inbound_text("not json at all {");
        assert_eq!(
            actions,
            vec![Action::Write("not json at all {".to_string())]
        );
        assert_eq!(fsm.state(), SessionState::Connected);
    }

    #[test]
    fn unrecognized_control_frame_is_written_verbatim() {
        let mut fsm = connected_fsm();
        let payload = r#"{"op":"motd","data":"welcome"}"#;
        assert_eq!(
            fsm.inbound_text(payload),
            vec![Action::Write(payload.to_string())]
        );
    }

    #[test]
    fn binary_output_decodes_lossily() {
        let mut fsm = connected_fsm();
        let actions = fsm.inbound_binary(&[0x68, 0x69, 0xff]);
        assert_eq!(
            actions,
            vec![Action::Write("hi\u{fffd}".to_string())]
        );
    }

    #[test]
    fn transport_error_terminates_with_trace() {
        let mut fsm = connected_fsm();
        let actions = fsm.transport_error("broken pipe");
        assert_eq!(
            actions,
            vec![Action::Write("\r\nConnection error: broken pipe\r\n".to_string())]
        );
        assert_eq!(fsm.state(), SessionState::Closed);
        // Terminal state: later events are inert.
        assert!(fsm.transport_closed().is_empty());
    }

    #[test]
    fn reopened_identity_is_a_fresh_instance() {
        let id = SessionId::new("pod-1", "shell").unwrap();
        let a = SessionFsm::new(id.clone(), "", ErrorFramePolicy::Inline);
        let b = SessionFsm::new(id, "", ErrorFramePolicy::Inline);
        assert_ne!(a.instance(), b.instance());
    }
}
