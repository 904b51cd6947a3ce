//! Shared Application State
//!
//! This module defines the `AppState` struct: the process-wide immutable
//! resources created once at startup. Sessions only ever read from it.

use crate::config::Config;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Immutable after initialization.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Base instructions combined with the formatted knowledge fragment.
    pub instructions: Arc<String>,
    /// Number of knowledge entries loaded at startup.
    pub knowledge_entries: usize,
}
