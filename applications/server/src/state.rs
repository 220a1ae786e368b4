/// Shared application state
use segment_core::MembershipEngine;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn MembershipEngine>,
}

impl AppState {
    pub fn new(engine: Arc<dyn MembershipEngine>) -> Self {
        Self { engine }
    }
}
