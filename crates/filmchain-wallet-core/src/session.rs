//! Wallet connection session.
//!
//! `WalletSession` is the single owner of connection state. Views read it
//! through [`WalletSession::snapshot`]; only the session's own operations and
//! notification handlers mutate it. Provider calls that can block on the user
//! are split into `begin_*` / `complete_*` pairs so an async shell can run the
//! call elsewhere and hand the result back on the UI thread.

use std::collections::VecDeque;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::domain::{
    BalanceTicket, ConnectTicket, ProviderEvent, ProviderEventKind, SessionState, TimestampMs,
    TokenBalance,
};
use crate::error::SessionError;
use crate::ports::{ClockPort, PortError, ProviderPort, TokenBalancePort};
use crate::state_machine::{derive_phase, ConnectionPhase, SessionTransition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Delay before probing for the provider, so late injection is still seen.
    pub detection_delay_ms: u64,
    pub token_decimals: u8,
    pub transition_log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detection_delay_ms: 1_000,
            token_decimals: 18,
            transition_log_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    None,
    /// The chain changed; the owner must replace this session with
    /// [`WalletSession::reloaded`].
    ReloadRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStart {
    Started(ConnectTicket),
    /// Another attempt is in flight; nothing changed.
    AlreadyPending,
}

pub struct WalletSession<P, B, C>
where
    P: ProviderPort,
    B: TokenBalancePort,
    C: ClockPort,
{
    provider: P,
    balances: B,
    clock: C,
    config: SessionConfig,
    state: SessionState,
    started_at_ms: u64,
    pending_connect: Option<ConnectTicket>,
    next_ticket: u64,
    balance_due: bool,
    reload_requested: bool,
    transitions: VecDeque<SessionTransition>,
}

impl<P, B, C> WalletSession<P, B, C>
where
    P: ProviderPort,
    B: TokenBalancePort,
    C: ClockPort,
{
    pub fn new(provider: P, balances: B, clock: C, config: SessionConfig) -> Self {
        let started_at_ms = clock.now_ms().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "clock unavailable at session start; detecting immediately");
            0
        });
        Self {
            provider,
            balances,
            clock,
            state: SessionState::initial(config.token_decimals),
            transitions: VecDeque::with_capacity(config.transition_log_capacity),
            config,
            started_at_ms,
            pending_connect: None,
            next_ticket: 0,
            balance_due: false,
            reload_requested: false,
        }
    }

    /// Fresh session over the same ports, as after a full application reload.
    pub fn reloaded(mut self) -> Self {
        self.reload();
        self
    }

    /// In-place form of [`Self::reloaded`] for owners that hold the session
    /// by value. Ticket ids keep counting so results issued before the
    /// reload can never complete an attempt started after it.
    pub fn reload(&mut self) {
        tracing::info!("reloading wallet session");
        self.started_at_ms = self.clock.now_ms().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "clock unavailable at reload; detecting immediately");
            0
        });
        self.state = SessionState::initial(self.config.token_decimals);
        self.pending_connect = None;
        self.balance_due = false;
        self.reload_requested = false;
        self.transitions.clear();
    }

    pub fn into_parts(self) -> (P, B, C, SessionConfig) {
        (self.provider, self.balances, self.clock, self.config)
    }

    pub fn snapshot(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> ConnectionPhase {
        derive_phase(&self.state)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn balances(&self) -> &B {
        &self.balances
    }

    pub fn transitions(&self) -> impl Iterator<Item = &SessionTransition> {
        self.transitions.iter()
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    pub fn balance_refresh_due(&self) -> bool {
        self.balance_due && self.state.account.is_some() && self.balances.is_configured()
    }

    /// Milliseconds until detection runs, or `None` once it has.
    pub fn detection_remaining_ms(&self) -> Option<u64> {
        if !self.state.is_initializing {
            return None;
        }
        let elapsed = self.now_ms().saturating_sub(self.started_at_ms);
        Some(self.config.detection_delay_ms.saturating_sub(elapsed))
    }

    pub fn detection_due(&self) -> bool {
        self.detection_remaining_ms() == Some(0)
    }

    /// Per-frame driver: runs detection once its delay has elapsed, then
    /// applies queued provider notifications.
    pub fn poll(&mut self) -> SessionEffect {
        if self.reload_requested {
            return SessionEffect::ReloadRequired;
        }
        if self.detection_due() {
            self.detect_provider();
        }
        if !self.state.is_provider_installed {
            return SessionEffect::None;
        }

        let events = match self.provider.drain_events() {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "failed to drain provider events");
                return SessionEffect::None;
            }
        };
        for event in events {
            if self.handle_event(event) == SessionEffect::ReloadRequired {
                return SessionEffect::ReloadRequired;
            }
        }
        SessionEffect::None
    }

    /// Look for the provider. Runs at most once per session.
    pub fn detect_provider(&mut self) {
        if !self.state.is_initializing {
            return;
        }
        let from = self.phase();

        let detection = self.provider.detect().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "provider detection failed");
            Default::default()
        });

        if detection.is_compatible() {
            self.state.is_provider_installed = true;

            match self.provider.authorized_accounts() {
                Ok(accounts) => {
                    if let Some(first) = accounts.first().copied() {
                        self.adopt_account(Some(first));
                    }
                }
                Err(e) => self.fail(SessionError::from_port(e)),
            }

            match self.provider.chain_id() {
                Ok(chain_id) => self.state.chain_id = Some(chain_id),
                Err(e) => tracing::debug!(error = %e, "chain id unavailable at detection"),
            }

            if let Err(e) = self.provider.subscribe() {
                self.fail(SessionError::from_port(e));
            }
            tracing::info!(
                account = ?self.state.account,
                chain_id = ?self.state.chain_id,
                "wallet provider detected"
            );
        } else {
            self.state.is_provider_installed = false;
            tracing::info!(
                present = detection.present,
                vendor_marker = detection.vendor_marker,
                "no compatible wallet provider"
            );
        }

        self.state.is_initializing = false;
        self.record(from, "detect_provider");
    }

    /// Apply an `eth_accounts` result fetched after detection by a runtime
    /// that can only answer asynchronously. Adopts the first account unless
    /// one is already set or a connect attempt owns the outcome.
    pub fn apply_authorized_accounts(
        &mut self,
        result: Result<Vec<Address>, PortError>,
    ) -> Result<(), SessionError> {
        if !self.state.is_provider_installed || self.state.is_initializing {
            return Ok(());
        }
        let accounts = match result {
            Ok(accounts) => accounts,
            Err(e) => {
                let err = SessionError::from_port(e);
                self.fail(err.clone());
                return Err(err);
            }
        };
        if self.state.account.is_some() || self.pending_connect.is_some() {
            return Ok(());
        }
        if let Some(first) = accounts.first().copied() {
            let from = self.phase();
            self.adopt_account(Some(first));
            tracing::info!(account = %first, "restored authorized account");
            self.record(from, "authorized_accounts");
        }
        Ok(())
    }

    /// Apply one provider notification.
    pub fn handle_event(&mut self, event: ProviderEvent) -> SessionEffect {
        if self.reload_requested {
            return SessionEffect::ReloadRequired;
        }
        if !self.state.is_provider_installed {
            tracing::debug!(sequence = event.sequence, "ignoring event without provider");
            return SessionEffect::None;
        }

        match event.kind {
            ProviderEventKind::AccountsChanged(accounts) => {
                let from = self.phase();
                tracing::debug!(sequence = event.sequence, count = accounts.len(), "accountsChanged");
                self.adopt_account(accounts.first().copied());
                self.record(from, "accounts_changed");
                SessionEffect::None
            }
            ProviderEventKind::ChainChanged(chain_id) => {
                tracing::info!(sequence = event.sequence, chain_id, "chainChanged; reload required");
                self.reload_requested = true;
                SessionEffect::ReloadRequired
            }
        }
    }

    /// Connect synchronously through the provider port.
    ///
    /// Returns `Ok(None)` when another attempt is already in flight.
    pub fn connect(&mut self) -> Result<Option<Address>, SessionError> {
        match self.begin_connect()? {
            ConnectStart::Started(ticket) => {
                let result = self.provider.request_accounts();
                self.complete_connect(ticket, result)
            }
            ConnectStart::AlreadyPending => Ok(None),
        }
    }

    pub fn begin_connect(&mut self) -> Result<ConnectStart, SessionError> {
        if !self.state.is_provider_installed {
            let err = SessionError::ProviderMissing;
            self.fail(err.clone());
            return Err(err);
        }
        if self.pending_connect.is_some() {
            tracing::debug!("connect ignored; attempt already pending");
            return Ok(ConnectStart::AlreadyPending);
        }

        let from = self.phase();
        self.next_ticket = self.next_ticket.saturating_add(1);
        let ticket = ConnectTicket(self.next_ticket);
        self.pending_connect = Some(ticket);
        self.state.connection_error = None;
        self.state.connect_pending = true;
        self.record(from, "connect_requested");
        Ok(ConnectStart::Started(ticket))
    }

    /// Apply the outcome of the interactive account request for `ticket`.
    ///
    /// Results for a ticket that is no longer pending are discarded and
    /// return `Ok(None)`.
    pub fn complete_connect(
        &mut self,
        ticket: ConnectTicket,
        result: Result<Vec<Address>, PortError>,
    ) -> Result<Option<Address>, SessionError> {
        if self.pending_connect != Some(ticket) {
            tracing::debug!(ticket = ticket.id(), "discarding stale connect result");
            return Ok(None);
        }
        let from = self.phase();
        self.pending_connect = None;
        self.state.connect_pending = false;

        let outcome = match result {
            Ok(accounts) => match accounts.first().copied() {
                Some(account) => {
                    self.adopt_account(Some(account));
                    tracing::info!(%account, "wallet connected");
                    Ok(Some(account))
                }
                None => Err(SessionError::NoAccountsReturned),
            },
            Err(e) => Err(SessionError::from_port(e)),
        };
        if let Err(ref err) = outcome {
            self.fail(err.clone());
        }
        self.record(from, "connect_completed");
        outcome
    }

    /// Local disconnect. Provider-side authorization is left untouched.
    pub fn disconnect(&mut self) {
        let from = self.phase();
        if self.pending_connect.take().is_some() {
            tracing::debug!("abandoning pending connect on disconnect");
        }
        self.state.connect_pending = false;
        self.state.account = None;
        self.state.token_balance = TokenBalance::zero(self.config.token_decimals);
        self.balance_due = false;
        tracing::info!("wallet disconnected");
        self.record(from, "disconnect");
    }

    /// Query and cache the balance of the connected account.
    pub fn refresh_balance(&mut self) -> Result<(), SessionError> {
        match self.begin_balance_refresh() {
            Some(ticket) => {
                let result = self.balances.balance_of(ticket.account());
                self.complete_balance_refresh(ticket, result)
            }
            None => Ok(()),
        }
    }

    pub fn begin_balance_refresh(&mut self) -> Option<BalanceTicket> {
        let account = self.state.account?;
        self.balance_due = false;
        if !self.balances.is_configured() {
            tracing::debug!("no token balance source configured");
            return None;
        }
        Some(BalanceTicket { account })
    }

    pub fn complete_balance_refresh(
        &mut self,
        ticket: BalanceTicket,
        result: Result<String, PortError>,
    ) -> Result<(), SessionError> {
        if self.state.account != Some(ticket.account) {
            tracing::debug!(account = %ticket.account, "discarding balance for inactive account");
            return Ok(());
        }
        let parsed = result
            .map_err(|e| SessionError::BalanceQueryFailed(e.to_string()))
            .and_then(|raw| {
                TokenBalance::parse_decimal(&raw, self.config.token_decimals)
                    .map_err(SessionError::from)
            });
        match parsed {
            Ok(balance) => {
                tracing::debug!(account = %ticket.account, %balance, "token balance updated");
                self.state.token_balance = balance;
                Ok(())
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    fn adopt_account(&mut self, account: Option<Address>) {
        if !self.state.is_provider_installed {
            return;
        }
        if self.state.account == account {
            return;
        }
        self.state.account = account;
        self.state.token_balance = TokenBalance::zero(self.config.token_decimals);
        self.balance_due = account.is_some();
    }

    fn fail(&mut self, err: SessionError) {
        tracing::warn!(code = err.code(), error = %err, "wallet session error");
        self.state.connection_error = Some(err);
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms().unwrap_or(self.started_at_ms)
    }

    fn record(&mut self, from: ConnectionPhase, reason: &'static str) {
        let to = self.phase();
        if from == to || self.config.transition_log_capacity == 0 {
            return;
        }
        tracing::debug!(?from, ?to, reason, "wallet session transition");
        if self.transitions.len() >= self.config.transition_log_capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(SessionTransition {
            from,
            to,
            reason,
            at_ms: TimestampMs(self.now_ms()),
        });
    }
}
