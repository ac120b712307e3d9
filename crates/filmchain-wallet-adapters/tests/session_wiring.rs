mod common;

use filmchain_wallet_adapters::{
    Eip1193Adapter, Erc20BalanceAdapter, SystemClockAdapter, WalletAdapterConfig,
};
use filmchain_wallet_core::{ConnectionPhase, SessionEffect, SessionError, WalletSession};

use common::{owner_address, second_address, spawn_mock_wallet, tokens, WalletFixture};

type AdapterSession = WalletSession<Eip1193Adapter, Erc20BalanceAdapter, SystemClockAdapter>;

fn session_for(cfg: WalletAdapterConfig) -> AdapterSession {
    let cfg = WalletAdapterConfig {
        detection_delay_ms: 0,
        ..cfg
    };
    WalletSession::new(
        Eip1193Adapter::with_config(cfg.clone()),
        Erc20BalanceAdapter::with_config(cfg.clone()),
        SystemClockAdapter,
        cfg.session_config(),
    )
}

#[test]
fn development_wallet_connects_and_loads_balance() {
    let mut session = session_for(WalletAdapterConfig {
        dev_account: owner_address(),
        dev_token_balance: "1250.50".to_owned(),
        ..WalletAdapterConfig::default()
    });
    assert_eq!(session.poll(), SessionEffect::None);
    assert_eq!(session.phase(), ConnectionPhase::Disconnected);

    assert_eq!(session.connect().expect("connect"), Some(owner_address()));
    assert!(session.balance_refresh_due());
    session.refresh_balance().expect("balance");

    let state = session.snapshot();
    assert_eq!(state.account, Some(owner_address()));
    assert_eq!(state.token_balance.to_decimal_string(), "1250.5");
    assert_eq!(state.chain_id, Some(1));
    assert!(state.connection_error.is_none());
}

#[test]
fn development_wallet_switch_reaches_session() {
    let mut session = session_for(WalletAdapterConfig {
        dev_account: owner_address(),
        ..WalletAdapterConfig::default()
    });
    session.poll();
    session.connect().expect("connect");
    session.refresh_balance().expect("balance");

    session
        .provider()
        .debug_inject_accounts_changed(vec![second_address()])
        .expect("inject");
    assert_eq!(session.poll(), SessionEffect::None);
    assert_eq!(session.snapshot().account, Some(second_address()));
    assert!(session.snapshot().token_balance.is_zero());
    assert!(session.balance_refresh_due());

    session
        .provider()
        .debug_inject_chain_changed(5)
        .expect("inject");
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);

    let mut session = session.reloaded();
    assert!(session.snapshot().is_initializing);
    session.poll();
    assert_eq!(session.snapshot().account, Some(second_address()));
    assert_eq!(session.snapshot().chain_id, Some(5));
}

#[test]
fn proxy_wallet_restores_authorized_account_on_detection() {
    let wallet = spawn_mock_wallet(WalletFixture {
        authorized: vec![second_address(), owner_address()],
        balance: tokens(1280),
        chain_id: 8453,
        ..WalletFixture::default()
    });
    let mut session = session_for(wallet.config());

    session.poll();
    assert_eq!(session.phase(), ConnectionPhase::Connected);
    assert_eq!(session.snapshot().account, Some(second_address()));
    assert_eq!(session.snapshot().chain_id, Some(8453));

    session.refresh_balance().expect("balance");
    assert_eq!(session.snapshot().token_balance.to_decimal_string(), "1280");
    assert!(!wallet.calls().iter().any(|m| m == "eth_requestAccounts"));
}

#[test]
fn proxy_wallet_rejection_surfaces_user_rejected() {
    let wallet = spawn_mock_wallet(WalletFixture {
        reject_requests: true,
        ..WalletFixture::default()
    });
    let mut session = session_for(wallet.config());
    session.poll();
    assert_eq!(session.phase(), ConnectionPhase::Disconnected);

    let err = session.connect().expect_err("rejected");
    assert!(matches!(err, SessionError::UserRejected(_)), "{err:?}");
    assert_eq!(session.snapshot().connection_error, Some(err));
    assert_eq!(session.snapshot().account, None);

    wallet.update(|f| f.reject_requests = false);
    assert_eq!(session.connect().expect("retry"), Some(owner_address()));
    assert!(session.snapshot().connection_error.is_none());
}

#[test]
fn proxy_snapshot_changes_flow_into_session() {
    let wallet = spawn_mock_wallet(WalletFixture {
        authorized: vec![owner_address()],
        ..WalletFixture::default()
    });
    let mut session = session_for(wallet.config());
    session.poll();
    assert_eq!(session.snapshot().account, Some(owner_address()));

    wallet.update(|f| f.authorized = Vec::new());
    session.provider().sync_snapshot().expect("sync");
    session.poll();
    assert_eq!(session.phase(), ConnectionPhase::Disconnected);

    wallet.update(|f| f.chain_id = 137);
    session.provider().sync_snapshot().expect("sync");
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);
}

#[test]
fn unreachable_proxy_reports_missing_provider() {
    let mut session = session_for(WalletAdapterConfig {
        eip1193_proxy_url: Some("http://127.0.0.1:9".to_owned()),
        rpc_timeout_ms: 500,
        ..WalletAdapterConfig::default()
    });
    session.poll();
    assert_eq!(session.phase(), ConnectionPhase::ProviderMissing);
    assert_eq!(
        session.connect().expect_err("no provider"),
        SessionError::ProviderMissing
    );
}

#[test]
fn proxy_wallet_without_token_connects_without_balance_error() {
    let wallet = spawn_mock_wallet(WalletFixture {
        authorized: vec![owner_address()],
        ..WalletFixture::default()
    });
    let mut session = session_for(WalletAdapterConfig {
        token_address: None,
        ..wallet.config()
    });

    session.poll();
    assert_eq!(session.phase(), ConnectionPhase::Connected);
    assert!(!session.balance_refresh_due());
    session.refresh_balance().expect("no balance source");

    assert!(session.snapshot().connection_error.is_none());
    assert!(session.snapshot().token_balance.is_zero());
    assert!(!wallet.calls().iter().any(|m| m == "eth_call"));
}
