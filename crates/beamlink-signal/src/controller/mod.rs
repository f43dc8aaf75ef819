//! Call lifecycle controller: the explicit client context tying the relay
//! transport, the session registry and the UI surface together.

mod call;
mod types;

#[cfg(test)]
mod tests;

pub use call::CallController;
pub use types::{ClientMode, ControllerConfig, UiIntent};
