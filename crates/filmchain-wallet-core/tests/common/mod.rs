#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;

use filmchain_wallet_core::{
    ClockPort, PortError, ProviderDetection, ProviderEvent, ProviderEventKind, ProviderPort,
    SessionConfig, TokenBalancePort, WalletSession, USER_REJECTED_CODE,
};

#[derive(Debug, Default)]
struct FakeProviderState {
    detection: ProviderDetection,
    authorized: Vec<Address>,
    request_results: VecDeque<Result<Vec<Address>, PortError>>,
    chain_id: u64,
    events: Vec<ProviderEvent>,
    event_seq: u64,
    subscribe_calls: u32,
    request_calls: u32,
}

/// Scriptable provider shared between the test and the session under test.
#[derive(Debug, Clone, Default)]
pub struct FakeProvider {
    inner: Arc<Mutex<FakeProviderState>>,
}

impl FakeProvider {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn installed(authorized: Vec<Address>) -> Self {
        let provider = Self::default();
        {
            let mut g = provider.inner.lock().expect("fake provider lock");
            g.detection = ProviderDetection::compatible();
            g.authorized = authorized;
            g.chain_id = 1;
        }
        provider
    }

    pub fn with_detection(detection: ProviderDetection) -> Self {
        let provider = Self::default();
        provider.inner.lock().expect("fake provider lock").detection = detection;
        provider
    }

    pub fn push_request_result(&self, result: Result<Vec<Address>, PortError>) {
        self.inner
            .lock()
            .expect("fake provider lock")
            .request_results
            .push_back(result);
    }

    pub fn emit_accounts_changed(&self, accounts: Vec<Address>) {
        self.emit(ProviderEventKind::AccountsChanged(accounts));
    }

    pub fn emit_chain_changed(&self, chain_id: u64) {
        self.emit(ProviderEventKind::ChainChanged(chain_id));
    }

    fn emit(&self, kind: ProviderEventKind) {
        let mut g = self.inner.lock().expect("fake provider lock");
        g.event_seq += 1;
        let sequence = g.event_seq;
        g.events.push(ProviderEvent { sequence, kind });
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.inner.lock().expect("fake provider lock").subscribe_calls
    }

    pub fn request_calls(&self) -> u32 {
        self.inner.lock().expect("fake provider lock").request_calls
    }
}

impl ProviderPort for FakeProvider {
    fn detect(&self) -> Result<ProviderDetection, PortError> {
        Ok(self.inner.lock().expect("fake provider lock").detection)
    }

    fn authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
        Ok(self.inner.lock().expect("fake provider lock").authorized.clone())
    }

    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        let mut g = self.inner.lock().expect("fake provider lock");
        g.request_calls += 1;
        g.request_results
            .pop_front()
            .unwrap_or_else(|| Ok(g.authorized.clone()))
    }

    fn chain_id(&self) -> Result<u64, PortError> {
        Ok(self.inner.lock().expect("fake provider lock").chain_id)
    }

    fn subscribe(&self) -> Result<(), PortError> {
        self.inner.lock().expect("fake provider lock").subscribe_calls += 1;
        Ok(())
    }

    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        Ok(std::mem::take(
            &mut self.inner.lock().expect("fake provider lock").events,
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBalances {
    inner: Arc<Mutex<VecDeque<Result<String, PortError>>>>,
    calls: Arc<AtomicU64>,
    unconfigured: bool,
}

impl FakeBalances {
    pub fn push(&self, result: Result<String, PortError>) {
        self.inner.lock().expect("fake balances lock").push_back(result);
    }

    /// A balance source with no token to query.
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TokenBalancePort for FakeBalances {
    fn balance_of(&self, _account: Address) -> Result<String, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .lock()
            .expect("fake balances lock")
            .pop_front()
            .unwrap_or_else(|| Ok("0".to_owned()))
    }

    fn is_configured(&self) -> bool {
        !self.unconfigured
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.load(Ordering::SeqCst) + 1_739_750_400_000)
    }
}

pub type TestSession = WalletSession<FakeProvider, FakeBalances, TestClock>;

pub fn new_session(provider: FakeProvider) -> (TestSession, FakeBalances, TestClock) {
    let balances = FakeBalances::default();
    let clock = TestClock::default();
    let session = WalletSession::new(
        provider,
        balances.clone(),
        clock.clone(),
        SessionConfig::default(),
    );
    (session, balances, clock)
}

/// Session whose detection delay has elapsed and detection has run.
pub fn detected_session(provider: FakeProvider) -> (TestSession, FakeBalances, TestClock) {
    let (mut session, balances, clock) = new_session(provider);
    clock.advance(session.config().detection_delay_ms);
    session.poll();
    (session, balances, clock)
}

pub fn user_rejection() -> PortError {
    PortError::Rpc {
        code: USER_REJECTED_CODE,
        message: "User rejected the request.".to_owned(),
    }
}

pub fn account_aa() -> Address {
    "0xAA00000000000000000000000000000000000011"
        .parse()
        .expect("valid account aa")
}

pub fn account_bb() -> Address {
    "0xBB00000000000000000000000000000000000022"
        .parse()
        .expect("valid account bb")
}

pub fn account_cc() -> Address {
    "0xCC00000000000000000000000000000000000033"
        .parse()
        .expect("valid account cc")
}
