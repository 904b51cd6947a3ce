//! Voicegate Core Library
//!
//! Transport-free logic shared by the relay service: loading and formatting
//! the grounding knowledge base, and building the realtime session descriptor
//! that is sent upstream when a session is established. The `services/api`
//! crate wires these pieces to the actual WebSocket transports.

pub mod knowledge;
pub mod realtime;
