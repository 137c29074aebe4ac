//! Application state shared across all request handlers.

use std::sync::Arc;

use tiprush_core::hub::HubHandle;
use tiprush_core::pipeline::PipelineHandle;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around; the handles are channel
/// senders and the secret is behind an Arc.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the donation pipeline task.
    pub pipeline: PipelineHandle,
    /// Handle to the broadcast hub task.
    pub hub: HubHandle,
    /// Static admin credential, compared by exact match.
    pub admin_secret: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: PipelineHandle, hub: HubHandle, admin_secret: String) -> Self {
        Self {
            pipeline,
            hub,
            admin_secret: admin_secret.into(),
        }
    }
}
