mod common;

use filmchain_wallet_core::{
    ConnectStart, ConnectionPhase, ProviderEvent, ProviderEventKind, SessionEffect, SessionError,
};

use common::{account_aa, account_bb, account_cc, detected_session, new_session, FakeProvider};

#[test]
fn account_tracks_latest_non_empty_list() {
    let provider = FakeProvider::installed(vec![account_aa()]);
    let (mut session, _balances, _clock) = detected_session(provider.clone());

    let script = vec![
        vec![account_bb(), account_aa()],
        vec![],
        vec![account_cc()],
        vec![account_aa(), account_cc()],
        vec![],
        vec![],
        vec![account_bb()],
    ];
    for accounts in script {
        let expected = accounts.first().copied();
        provider.emit_accounts_changed(accounts);
        assert_eq!(session.poll(), SessionEffect::None);
        assert_eq!(session.snapshot().account, expected);
    }
}

#[test]
fn batched_notifications_apply_in_order() {
    let provider = FakeProvider::installed(vec![]);
    let (mut session, _balances, _clock) = detected_session(provider.clone());

    provider.emit_accounts_changed(vec![account_aa()]);
    provider.emit_accounts_changed(vec![]);
    provider.emit_accounts_changed(vec![account_cc(), account_bb()]);
    session.poll();
    assert_eq!(session.snapshot().account, Some(account_cc()));
}

#[test]
fn empty_account_list_clears_account_and_balance() {
    let provider = FakeProvider::installed(vec![account_bb()]);
    let (mut session, balances, _clock) = detected_session(provider.clone());
    balances.push(Ok("12".to_owned()));
    session.refresh_balance().expect("balance");
    assert_eq!(session.snapshot().token_balance.to_string(), "12");

    provider.emit_accounts_changed(vec![]);
    session.poll();
    assert_eq!(session.snapshot().account, None);
    assert!(session.snapshot().token_balance.is_zero());
    assert_eq!(session.phase(), ConnectionPhase::Disconnected);
}

#[test]
fn switching_accounts_invalidates_cached_balance() {
    let provider = FakeProvider::installed(vec![account_aa()]);
    let (mut session, balances, _clock) = detected_session(provider.clone());
    balances.push(Ok("5".to_owned()));
    session.refresh_balance().expect("balance");
    assert!(!session.balance_refresh_due());

    provider.emit_accounts_changed(vec![account_bb()]);
    session.poll();
    assert!(session.snapshot().token_balance.is_zero());
    assert!(session.balance_refresh_due());
}

#[test]
fn chain_change_requires_reload() {
    let provider = FakeProvider::installed(vec![account_aa()]);
    let (mut session, _balances, _clock) = detected_session(provider.clone());

    provider.emit_chain_changed(8453);
    provider.emit_accounts_changed(vec![account_bb()]);
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);
    assert!(session.reload_requested());
    // nothing after the chain change is applied to the stale session
    assert_eq!(session.snapshot().account, Some(account_aa()));
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);
}

#[test]
fn reloaded_session_starts_from_scratch_with_same_ports() {
    let provider = FakeProvider::installed(vec![account_aa()]);
    let (mut session, balances, clock) = detected_session(provider.clone());
    balances.push(Ok("7".to_owned()));
    session.refresh_balance().expect("balance");
    let _ = session.connect();
    provider.emit_chain_changed(10);
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);

    let mut session = session.reloaded();
    let state = session.snapshot();
    assert!(state.is_initializing);
    assert_eq!(state.account, None);
    assert!(state.token_balance.is_zero());
    assert_eq!(state.connection_error, None);
    assert!(!session.reload_requested());

    clock.advance(session.config().detection_delay_ms);
    assert_eq!(session.poll(), SessionEffect::None);
    assert_eq!(session.snapshot().account, Some(account_aa()));
}

#[test]
fn connect_started_before_reload_cannot_complete_after_it() {
    let provider = FakeProvider::installed(vec![]);
    let (mut session, _balances, clock) = detected_session(provider.clone());
    let old = match session.begin_connect().expect("begin") {
        ConnectStart::Started(ticket) => ticket,
        ConnectStart::AlreadyPending => panic!("nothing was pending"),
    };
    provider.emit_chain_changed(10);
    assert_eq!(session.poll(), SessionEffect::ReloadRequired);

    session.reload();
    clock.advance(session.config().detection_delay_ms);
    session.poll();
    let fresh = match session.begin_connect().expect("begin") {
        ConnectStart::Started(ticket) => ticket,
        ConnectStart::AlreadyPending => panic!("reload clears pending attempts"),
    };
    assert_ne!(old, fresh);

    let outcome = session.complete_connect(old, Ok(vec![account_bb()]));
    assert_eq!(outcome, Ok(None));
    assert_eq!(session.snapshot().account, None);
    assert!(session.snapshot().connect_pending);
}

#[test]
fn events_before_detection_are_not_applied() {
    let provider = FakeProvider::installed(vec![]);
    let (mut session, _balances, _clock) = new_session(provider);
    let effect = session.handle_event(ProviderEvent {
        sequence: 1,
        kind: ProviderEventKind::AccountsChanged(vec![account_cc()]),
    });
    assert_eq!(effect, SessionEffect::None);
    assert_eq!(session.snapshot().account, None);
}

#[test]
fn events_without_provider_are_ignored() {
    let (mut session, _balances, _clock) = detected_session(FakeProvider::absent());
    let _ = session.connect();
    let effect = session.handle_event(ProviderEvent {
        sequence: 1,
        kind: ProviderEventKind::AccountsChanged(vec![account_cc()]),
    });
    assert_eq!(effect, SessionEffect::None);
    assert_eq!(session.snapshot().account, None);
    assert_eq!(
        session.snapshot().connection_error,
        Some(SessionError::ProviderMissing)
    );
}
