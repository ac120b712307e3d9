use thiserror::Error;

use crate::ports::{PortError, USER_REJECTED_CODE};

/// User-facing session failures. Each one is stored as the session's
/// `connection_error` and rendered inline next to the connect control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No compatible wallet extension detected. Install a wallet to connect.")]
    ProviderMissing,
    #[error("Wallet request was rejected: {0}")]
    UserRejected(String),
    #[error("Wallet returned no accounts. Unlock the wallet and try again.")]
    NoAccountsReturned,
    #[error("Token balance query failed: {0}")]
    BalanceQueryFailed(String),
    #[error("Wallet request failed: {0}")]
    Provider(String),
}

impl SessionError {
    pub fn from_port(err: PortError) -> Self {
        match err {
            PortError::Rpc { code, message } if code == USER_REJECTED_CODE => {
                SessionError::UserRejected(message)
            }
            other => SessionError::Provider(other.to_string()),
        }
    }

    /// Stable identifier for logs.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::ProviderMissing => "PROVIDER_MISSING",
            SessionError::UserRejected(_) => "USER_REJECTED",
            SessionError::NoAccountsReturned => "NO_ACCOUNTS_RETURNED",
            SessionError::BalanceQueryFailed(_) => "BALANCE_QUERY_FAILED",
            SessionError::Provider(_) => "PROVIDER_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_to_user_rejected() {
        let err = SessionError::from_port(PortError::Rpc {
            code: USER_REJECTED_CODE,
            message: "User denied account authorization".to_owned(),
        });
        assert_eq!(
            err,
            SessionError::UserRejected("User denied account authorization".to_owned())
        );
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn non_rejection_rpc_error_is_generic() {
        let err = SessionError::from_port(PortError::Rpc {
            code: -32002,
            message: "request already pending".to_owned(),
        });
        assert_eq!(err.code(), "PROVIDER_ERROR");
    }

    #[test]
    fn transport_failure_maps_to_generic_provider_error() {
        let err = SessionError::from_port(PortError::Transport("timeout".to_owned()));
        assert_eq!(err.code(), "PROVIDER_ERROR");
        assert!(err.to_string().contains("timeout"));
    }
}
