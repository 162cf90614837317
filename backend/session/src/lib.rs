//! Chat sessions: the per-prompt state machine, the stream pump, and the
//! coordinator that keeps at most one session live.

pub mod coordinator;
pub mod pump;
pub mod session;

pub use coordinator::{ChatContext, Coordinator};
pub use pump::{Pump, SessionEvent, StreamEvent};
pub use session::{Session, SessionId, SessionState};
