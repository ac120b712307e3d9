//! Bridge between the egui shell and the wallet workspace crates.
//! This must remain the only shell-facing boundary for wallet operations.

#[cfg(not(target_arch = "wasm32"))]
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use eframe::egui;

use filmchain_wallet_adapters::{
    Eip1193Adapter, Erc20BalanceAdapter, SystemClockAdapter, WalletAdapterConfig,
};
#[cfg(not(target_arch = "wasm32"))]
use filmchain_wallet_core::ProviderPort;
use filmchain_wallet_core::TokenBalancePort;
use filmchain_wallet_core::{
    BalanceTicket, ConnectStart, ConnectTicket, ConnectionPhase, PortError, SessionEffect,
    SessionState, SessionTransition, WalletSession,
};

type Session = WalletSession<Eip1193Adapter, Erc20BalanceAdapter, SystemClockAdapter>;

/// Results handed back from worker threads or futures to the UI thread.
/// Requests issued before a reload may still land after newer ones.
type Inbox<T> = Arc<Mutex<Vec<T>>>;

type ConnectResult = (ConnectTicket, Result<Vec<Address>, PortError>);
/// Tagged with the reload epoch it was issued in.
type BalanceResult = (u64, BalanceTicket, Result<String, PortError>);
type RestoreResult = (u64, Result<Vec<Address>, PortError>);

pub struct WalletBridge {
    session: Session,
    token_symbol: String,
    poll_interval: Duration,
    connect_results: Inbox<ConnectResult>,
    balance_results: Inbox<BalanceResult>,
    restore_results: Inbox<RestoreResult>,
    balance_in_flight: bool,
    epoch: u64,
    #[cfg(not(target_arch = "wasm32"))]
    _watcher: Option<SnapshotWatcher>,
}

impl WalletBridge {
    pub fn new(config: WalletAdapterConfig, ctx: &egui::Context) -> Self {
        let poll_interval = Duration::from_millis(config.event_poll_interval_ms.max(100));
        let session = WalletSession::new(
            Eip1193Adapter::with_config(config.clone()),
            Erc20BalanceAdapter::with_config(config.clone()),
            SystemClockAdapter,
            config.session_config(),
        );

        #[cfg(not(target_arch = "wasm32"))]
        let watcher = session.provider().needs_snapshot_polling().then(|| {
            SnapshotWatcher::spawn(session.provider().clone(), poll_interval, ctx.clone())
        });
        #[cfg(target_arch = "wasm32")]
        let _ = ctx;

        Self {
            session,
            token_symbol: config.token_symbol,
            poll_interval,
            connect_results: Arc::new(Mutex::new(Vec::new())),
            balance_results: Arc::new(Mutex::new(Vec::new())),
            restore_results: Arc::new(Mutex::new(Vec::new())),
            balance_in_flight: false,
            epoch: 0,
            #[cfg(not(target_arch = "wasm32"))]
            _watcher: watcher,
        }
    }

    pub fn snapshot(&self) -> &SessionState {
        self.session.snapshot()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.session.phase()
    }

    pub fn token_symbol(&self) -> &str {
        &self.token_symbol
    }

    pub fn runtime_mode(&self) -> &'static str {
        self.session.provider().mode_name()
    }

    pub fn transitions(&self) -> impl Iterator<Item = &SessionTransition> {
        self.session.transitions()
    }

    pub fn is_balance_loading(&self) -> bool {
        self.balance_in_flight
    }

    /// Whether a token balance can be shown at all.
    pub fn has_balance_source(&self) -> bool {
        self.session.balances().is_configured()
    }

    /// Per-frame driver. Applies finished requests, then lets the session run
    /// detection and drain provider notifications.
    pub fn tick(&mut self, ctx: &egui::Context) {
        self.check_connect_results();
        self.check_balance_results();
        self.check_restore_results();

        let was_initializing = self.session.snapshot().is_initializing;
        if self.session.poll() == SessionEffect::ReloadRequired {
            self.session.reload();
            self.epoch = self.epoch.wrapping_add(1);
            self.balance_in_flight = false;
        } else if was_initializing
            && !self.session.snapshot().is_initializing
            && self.session.snapshot().is_provider_installed
            && self.session.provider().needs_async_account_restore()
        {
            self.spawn_account_restore(ctx);
        }
        if self.session.balance_refresh_due() && !self.balance_in_flight {
            self.spawn_balance_refresh(ctx);
        }

        let wait = self
            .session
            .detection_remaining_ms()
            .map(Duration::from_millis)
            .map_or(self.poll_interval, |d| d.min(self.poll_interval));
        ctx.request_repaint_after(wait);
    }

    /// Start an interactive connection attempt. Returns `false` when nothing
    /// was started, either because one is already pending or because the
    /// attempt failed immediately (the error is in the snapshot).
    pub fn connect(&mut self, ctx: &egui::Context) -> bool {
        let ticket = match self.session.begin_connect() {
            Ok(ConnectStart::Started(ticket)) => ticket,
            Ok(ConnectStart::AlreadyPending) => return false,
            Err(e) => {
                tracing::debug!(code = e.code(), "connect rejected before provider call");
                return false;
            }
        };

        let provider = self.session.provider().clone();
        let inbox = Arc::clone(&self.connect_results);
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                let result = provider.wasm_request_accounts_async().await;
                deliver(&inbox, (ticket, result));
                ctx.request_repaint();
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            std::thread::spawn(move || {
                let result = provider.request_accounts();
                deliver(&inbox, (ticket, result));
                ctx.request_repaint();
            });
        }
        true
    }

    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    pub fn refresh_balance(&mut self, ctx: &egui::Context) {
        if !self.balance_in_flight {
            self.spawn_balance_refresh(ctx);
        }
    }

    fn spawn_balance_refresh(&mut self, ctx: &egui::Context) {
        let Some(ticket) = self.session.begin_balance_refresh() else {
            return;
        };
        self.balance_in_flight = true;

        let balances = self.session.balances().clone();
        let inbox = Arc::clone(&self.balance_results);
        let epoch = self.epoch;
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                let result = balances.wasm_balance_of_async(ticket.account()).await;
                deliver(&inbox, (epoch, ticket, result));
                ctx.request_repaint();
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            std::thread::spawn(move || {
                let result = balances.balance_of(ticket.account());
                deliver(&inbox, (epoch, ticket, result));
                ctx.request_repaint();
            });
        }
    }

    /// Fetch already-authorized accounts for a runtime whose synchronous
    /// detection could not ask the wallet.
    fn spawn_account_restore(&mut self, ctx: &egui::Context) {
        let provider = self.session.provider().clone();
        let inbox = Arc::clone(&self.restore_results);
        let epoch = self.epoch;
        let ctx = ctx.clone();

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                let result = provider.wasm_authorized_accounts_async().await;
                deliver(&inbox, (epoch, result));
                ctx.request_repaint();
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            std::thread::spawn(move || {
                let result = provider.authorized_accounts();
                deliver(&inbox, (epoch, result));
                ctx.request_repaint();
            });
        }
    }

    fn check_connect_results(&mut self) {
        for (ticket, result) in drain(&self.connect_results) {
            if let Err(e) = self.session.complete_connect(ticket, result) {
                tracing::debug!(code = e.code(), "connect attempt failed");
            }
        }
    }

    fn check_balance_results(&mut self) {
        for (epoch, ticket, result) in drain(&self.balance_results) {
            if epoch != self.epoch {
                tracing::debug!("discarding balance fetched before reload");
                continue;
            }
            self.balance_in_flight = false;
            if let Err(e) = self.session.complete_balance_refresh(ticket, result) {
                tracing::debug!(code = e.code(), "balance refresh failed");
            }
        }
    }

    fn check_restore_results(&mut self) {
        for (epoch, result) in drain(&self.restore_results) {
            if epoch != self.epoch {
                tracing::debug!("discarding accounts fetched before reload");
                continue;
            }
            if let Err(e) = self.session.apply_authorized_accounts(result) {
                tracing::debug!(code = e.code(), "authorized accounts unavailable");
            }
        }
    }
}

fn deliver<T>(inbox: &Inbox<T>, value: T) {
    match inbox.lock() {
        Ok(mut guard) => guard.push(value),
        Err(e) => tracing::error!(error = %e, "wallet result inbox poisoned"),
    }
}

fn drain<T>(inbox: &Inbox<T>) -> Vec<T> {
    inbox
        .lock()
        .map(|mut guard| std::mem::take(&mut *guard))
        .unwrap_or_default()
}

/// Polls the proxy runtime for account and chain changes, which it cannot
/// push to us. Stops when dropped.
#[cfg(not(target_arch = "wasm32"))]
struct SnapshotWatcher {
    stop: Arc<AtomicBool>,
}

#[cfg(not(target_arch = "wasm32"))]
impl SnapshotWatcher {
    fn spawn(provider: Eip1193Adapter, interval: Duration, ctx: egui::Context) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        std::thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                if let Err(e) = provider.sync_snapshot() {
                    tracing::debug!(error = %e, "wallet snapshot poll failed");
                }
                ctx.request_repaint();
            }
        });
        Self { stop }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Drop for SnapshotWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
