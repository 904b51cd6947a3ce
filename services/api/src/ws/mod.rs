//! WebSocket Relay
//!
//! This module bridges one client WebSocket to one upstream realtime API
//! connection per session. It is structured into submodules:
//!
//! - `events`: the recognized upstream event tags and response lifecycle tracking.
//! - `upstream`: the authenticated outbound connection to the realtime API.
//! - `session`: the per-connection relay state machine and forwarding loops.

pub mod events;
pub mod session;
pub mod upstream;

pub use session::ws_handler;
