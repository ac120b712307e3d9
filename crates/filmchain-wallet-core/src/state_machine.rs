use serde::Serialize;

use crate::domain::{SessionState, TimestampMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionPhase {
    Initializing,
    ProviderMissing,
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionPhase::Initializing => "Detecting wallet",
            ConnectionPhase::ProviderMissing => "No wallet detected",
            ConnectionPhase::Disconnected => "Not connected",
            ConnectionPhase::Connecting => "Connecting",
            ConnectionPhase::Connected => "Connected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTransition {
    pub from: ConnectionPhase,
    pub to: ConnectionPhase,
    pub reason: &'static str,
    pub at_ms: TimestampMs,
}

pub fn derive_phase(state: &SessionState) -> ConnectionPhase {
    if state.is_initializing {
        ConnectionPhase::Initializing
    } else if !state.is_provider_installed {
        ConnectionPhase::ProviderMissing
    } else if state.account.is_some() {
        ConnectionPhase::Connected
    } else if state.connect_pending {
        ConnectionPhase::Connecting
    } else {
        ConnectionPhase::Disconnected
    }
}
