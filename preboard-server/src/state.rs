//! Application state shared across all request handlers.

use preboard_core::config::SharedConfig;
use preboard_core::services::{ClaimService, InitiationService, TransitionService};
use preboard_core::store::ReservationStore;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub initiation: Arc<InitiationService>,
    pub transitions: Arc<TransitionService>,
    pub claims: Arc<ClaimService>,
    /// Runtime configuration (sections can be reloaded via SIGHUP).
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        initiation: InitiationService,
        transitions: TransitionService,
        claims: ClaimService,
        config: SharedConfig,
    ) -> Self {
        Self {
            store,
            initiation: Arc::new(initiation),
            transitions: Arc::new(transitions),
            claims: Arc::new(claims),
            config,
        }
    }
}
