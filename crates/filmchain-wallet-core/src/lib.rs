pub mod domain;
pub mod error;
pub mod ports;
pub mod session;
pub mod state_machine;

pub use domain::{
    BalanceParseError, BalanceTicket, ConnectTicket, ProviderDetection, ProviderEvent,
    ProviderEventKind, SessionState, TimestampMs, TokenBalance,
};
pub use error::SessionError;
pub use ports::{ClockPort, PortError, ProviderPort, TokenBalancePort, USER_REJECTED_CODE};
pub use session::{ConnectStart, SessionConfig, SessionEffect, WalletSession};
pub use state_machine::{derive_phase, ConnectionPhase, SessionTransition};
