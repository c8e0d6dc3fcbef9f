// ABOUTME: Container exec terminal bridge: wire protocol, session state
// machine, transport, async driver, and the vt100 rendering surface

pub mod bridge;
pub mod protocol;
pub mod session;
pub mod surface;
pub mod transport;

pub use bridge::{BridgeConfig, SessionHandle, TerminalBridge};
pub use protocol::{ClientFrame, ServerFrame};
pub use session::{ErrorFramePolicy, SessionFsm, SessionId, SessionState};
pub use surface::TerminalSurface;
pub use transport::{Transport, TransportError, TransportEvent};
