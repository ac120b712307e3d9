use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::{ProviderDetection, ProviderEvent};

/// EIP-1193 error code for a request the user declined in the wallet UI.
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl PortError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, PortError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }
}

/// Injected wallet provider surface used by the session.
pub trait ProviderPort {
    /// Presence of the provider object and its vendor marker flag.
    fn detect(&self) -> Result<ProviderDetection, PortError>;
    /// Accounts already authorized for this page (`eth_accounts`). Never prompts.
    fn authorized_accounts(&self) -> Result<Vec<Address>, PortError>;
    /// Interactive account access request (`eth_requestAccounts`).
    fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    fn chain_id(&self) -> Result<u64, PortError>;
    /// Register for `accountsChanged` and `chainChanged`. Must be idempotent.
    fn subscribe(&self) -> Result<(), PortError>;
    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError>;
}

/// Read-only application token balance, returned as a fixed-point decimal string.
pub trait TokenBalancePort {
    fn balance_of(&self, account: Address) -> Result<String, PortError>;
    /// `false` when there is no token to query. The session then skips
    /// refreshes instead of reporting a failed query.
    fn is_configured(&self) -> bool {
        true
    }
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}
