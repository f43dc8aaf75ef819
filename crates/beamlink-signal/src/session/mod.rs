//! Per-share-code signaling state machine.
//!
//! Every [`CallSession`](machine::CallSession) runs in its own task that owns
//! its state, its peer connection and the peer's event stream. Inputs for one
//! share code are therefore processed strictly in order, while sessions for
//! different share codes make progress independently.

mod machine;
mod task;
mod types;


pub use task::SessionHandle;
pub use types::{CallEvent, CloseReason, Phase, Role, SessionConfig, SessionInput};

pub(crate) use task::spawn;
