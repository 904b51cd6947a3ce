//! Voicegate API Library Crate
//!
//! This library contains all the logic for the Voicegate relay service:
//! configuration, shared state, the HTTP router with its health surface, and
//! the WebSocket relay that bridges clients to the upstream realtime API.
//! The `bin/api.rs` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;
