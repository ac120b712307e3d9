use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::Address;
#[cfg(not(target_arch = "wasm32"))]
use serde_json::json;

use filmchain_wallet_core::{
    PortError, ProviderDetection, ProviderEvent, ProviderEventKind, ProviderPort,
};

#[cfg(target_arch = "wasm32")]
use crate::browser;
#[cfg(not(target_arch = "wasm32"))]
use crate::jsonrpc::{parse_chain_id, JsonRpcClient};
use crate::jsonrpc::parse_accounts;
use crate::WalletAdapterConfig;

const DETERMINISTIC_CHAIN_ID: u64 = 1;

#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
    #[cfg(target_arch = "wasm32")]
    hooks: Arc<Mutex<BrowserHooks>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(JsonRpcClient),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

impl ProviderMode {
    fn name(&self) -> &'static str {
        match self {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => "proxy",
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => "browser",
        }
    }
}

#[derive(Debug)]
struct ProviderState {
    /// Wallet accounts (deterministic) or the last accounts observed from the runtime.
    accounts: Vec<Address>,
    /// Deterministic only: whether the page has been granted access.
    authorized: bool,
    chain_id: Option<u64>,
    subscribed: bool,
    event_seq: u64,
    events: Vec<ProviderEvent>,
}

impl ProviderState {
    fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            authorized: false,
            chain_id: None,
            subscribed: false,
            event_seq: 0,
            events: Vec::new(),
        }
    }

    fn push_event(&mut self, kind: ProviderEventKind) {
        self.event_seq = self.event_seq.saturating_add(1);
        self.events.push(ProviderEvent {
            sequence: self.event_seq,
            kind,
        });
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
struct BrowserHooks {
    accounts_changed: Option<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
    chain_changed: Option<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(WalletAdapterConfig::from_env())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: WalletAdapterConfig) -> Self {
        let mode = select_mode(&config);
        let accounts = if matches!(mode, ProviderMode::Deterministic) {
            vec![config.dev_account]
        } else {
            Vec::new()
        };
        tracing::info!(mode = mode.name(), "eip1193 adapter initialized");
        Self {
            mode,
            state: Arc::new(Mutex::new(ProviderState::new(accounts))),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::default())),
        }
    }

    /// In-memory development wallet holding `account`. Access is granted on
    /// the first interactive request.
    pub fn deterministic(account: Address) -> Self {
        Self::with_config(WalletAdapterConfig {
            runtime_profile: crate::RuntimeProfile::Development,
            eip1193_proxy_url: None,
            dev_account: account,
            ..WalletAdapterConfig::default()
        })
    }

    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    /// Whether notifications must be synthesized by [`Self::sync_snapshot`].
    pub fn needs_snapshot_polling(&self) -> bool {
        match self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => true,
            _ => false,
        }
    }

    /// Whether authorized accounts must be fetched asynchronously after
    /// detection and handed to `WalletSession::apply_authorized_accounts`.
    pub fn needs_async_account_restore(&self) -> bool {
        match self.mode {
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => true,
            _ => false,
        }
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.authorized = !accounts.is_empty();
        g.accounts = accounts.clone();
        g.push_event(ProviderEventKind::AccountsChanged(accounts));
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.chain_id = Some(chain_id);
        g.push_event(ProviderEventKind::ChainChanged(chain_id));
        Ok(())
    }

    /// Proxy runtime only: poll `eth_accounts` / `eth_chainId` and queue a
    /// notification for each value that changed since the last observation.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn sync_snapshot(&self) -> Result<(), PortError> {
        let rpc = match &self.mode {
            ProviderMode::Proxy(rpc) => rpc,
            _ => return Ok(()),
        };
        if !self.lock()?.subscribed {
            return Ok(());
        }

        let accounts = parse_accounts("eth_accounts", &rpc.call("eth_accounts", json!([]))?)?;
        let chain_id = parse_chain_id(&rpc.call("eth_chainId", json!([]))?)?;

        let mut g = self.lock()?;
        if g.accounts != accounts {
            g.accounts = accounts.clone();
            g.push_event(ProviderEventKind::AccountsChanged(accounts));
        }
        if g.chain_id != Some(chain_id) {
            let had_baseline = g.chain_id.is_some();
            g.chain_id = Some(chain_id);
            if had_baseline {
                g.push_event(ProviderEventKind::ChainChanged(chain_id));
            }
        }
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_request_accounts_async(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        let result = browser::request("eth_requestAccounts", serde_json::json!([])).await?;
        let accounts = parse_accounts("eth_requestAccounts", &result)?;
        self.lock()?.accounts = accounts.clone();
        Ok(accounts)
    }

    /// Non-interactive `eth_accounts` through `window.ethereum.request`.
    #[cfg(target_arch = "wasm32")]
    pub async fn wasm_authorized_accounts_async(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        let result = browser::request("eth_accounts", serde_json::json!([])).await?;
        let accounts = parse_accounts("eth_accounts", &result)?;
        self.lock()?.accounts = accounts.clone();
        Ok(accounts)
    }

    #[cfg(target_arch = "wasm32")]
    fn register_browser_hooks(&self) -> Result<(), PortError> {
        use wasm_bindgen::{closure::Closure, JsCast, JsValue};

        let provider = browser::browser_provider()?;
        let on_fn = browser::get_function(&provider, "on")
            .or_else(|| browser::get_function(&provider, "addListener"))
            .ok_or(PortError::NotImplemented(
                "provider does not expose on/addListener",
            ))?;

        let mut hooks = self
            .hooks
            .lock()
            .map_err(|e| PortError::Transport(format!("provider hooks lock poisoned: {e}")))?;
        if hooks.accounts_changed.is_some() && hooks.chain_changed.is_some() {
            return Ok(());
        }

        let state_for_accounts = Arc::clone(&self.state);
        let accounts_cb = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let mut accounts = Vec::new();
            if js_sys::Array::is_array(&value) {
                for item in js_sys::Array::from(&value).iter() {
                    if let Some(addr) = item.as_string().and_then(|raw| raw.parse::<Address>().ok())
                    {
                        accounts.push(addr);
                    }
                }
            }
            if let Ok(mut g) = state_for_accounts.lock() {
                g.accounts = accounts.clone();
                g.push_event(ProviderEventKind::AccountsChanged(accounts));
            }
        });

        let state_for_chain = Arc::clone(&self.state);
        let chain_cb = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match browser::js_chain_id_to_u64(&value) {
                Ok(chain_id) => {
                    if let Ok(mut g) = state_for_chain.lock() {
                        g.chain_id = Some(chain_id);
                        g.push_event(ProviderEventKind::ChainChanged(chain_id));
                    }
                }
                Err(e) => tracing::warn!(error = %e, "unparseable chainChanged payload"),
            }
        });

        on_fn
            .call2(
                &provider,
                &JsValue::from_str("accountsChanged"),
                accounts_cb.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("register accountsChanged failed: {e:?}")))?;
        on_fn
            .call2(
                &provider,
                &JsValue::from_str("chainChanged"),
                chain_cb.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("register chainChanged failed: {e:?}")))?;

        hooks.accounts_changed = Some(accounts_cb);
        hooks.chain_changed = Some(chain_cb);
        self.lock()?.subscribed = true;
        Ok(())
    }
}

impl ProviderPort for Eip1193Adapter {
    fn detect(&self) -> Result<ProviderDetection, PortError> {
        match &self.mode {
            ProviderMode::Disabled(reason) => {
                tracing::debug!(%reason, "provider runtime disabled");
                Ok(ProviderDetection::absent())
            }
            ProviderMode::Deterministic => Ok(ProviderDetection::compatible()),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(rpc) => match rpc.call("eth_chainId", json!([])) {
                Ok(value) => {
                    let chain_id = parse_chain_id(&value)?;
                    self.lock()?.chain_id = Some(chain_id);
                    Ok(ProviderDetection::compatible())
                }
                Err(e) => {
                    tracing::warn!(error = %e, url = rpc.base_url(), "eip1193 proxy unreachable");
                    Ok(ProviderDetection::absent())
                }
            },
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => match browser::browser_provider() {
                Ok(provider) => {
                    let vendor_marker = browser::get_prop(&provider, "isMetaMask")
                        .ok()
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    Ok(ProviderDetection {
                        present: true,
                        vendor_marker,
                    })
                }
                Err(_) => Ok(ProviderDetection::absent()),
            },
        }
    }

    fn authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(rpc) => {
                let accounts =
                    parse_accounts("eth_accounts", &rpc.call("eth_accounts", json!([]))?)?;
                self.lock()?.accounts = accounts.clone();
                Ok(accounts)
            }
            // The provider only answers asynchronously; the owner follows up
            // with `wasm_authorized_accounts_async`.
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => Ok(self.lock()?.accounts.clone()),
            _ => {
                let g = self.lock()?;
                Ok(if g.authorized {
                    g.accounts.clone()
                } else {
                    Vec::new()
                })
            }
        }
    }

    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(rpc) => {
                let result = rpc.call("eth_requestAccounts", json!([]))?;
                let accounts = parse_accounts("eth_requestAccounts", &result)?;
                self.lock()?.accounts = accounts.clone();
                Ok(accounts)
            }
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => Err(PortError::NotImplemented(
                "wasm sync request_accounts is unavailable; use wasm_request_accounts_async",
            )),
            _ => {
                let mut g = self.lock()?;
                g.authorized = true;
                Ok(g.accounts.clone())
            }
        }
    }

    fn chain_id(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(rpc) => {
                let chain_id = parse_chain_id(&rpc.call("eth_chainId", json!([]))?)?;
                self.lock()?.chain_id = Some(chain_id);
                Ok(chain_id)
            }
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => {
                let provider = browser::browser_provider()?;
                let chain_id = browser::js_chain_id_to_u64(&browser::get_prop(&provider, "chainId")?)?;
                self.lock()?.chain_id = Some(chain_id);
                Ok(chain_id)
            }
            _ => Ok(self.lock()?.chain_id.unwrap_or(DETERMINISTIC_CHAIN_ID)),
        }
    }

    fn subscribe(&self) -> Result<(), PortError> {
        self.check_mode()?;
        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            return self.register_browser_hooks();
        }
        self.lock()?.subscribed = true;
        Ok(())
    }

    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        self.check_mode()?;
        Ok(std::mem::take(&mut self.lock()?.events))
    }
}

fn select_mode(config: &WalletAdapterConfig) -> ProviderMode {
    // The extension may be injected after startup, so presence is checked at
    // detection time rather than here.
    #[cfg(target_arch = "wasm32")]
    {
        let _ = config;
        return ProviderMode::Browser;
    }

    #[cfg(not(target_arch = "wasm32"))]
    match config.eip1193_proxy_url {
        Some(ref url) => match JsonRpcClient::new(url.clone(), config.rpc_timeout_ms) {
            Ok(client) => ProviderMode::Proxy(client),
            Err(e) if config.strict_runtime_required() => ProviderMode::Disabled(format!(
                "failed to initialize EIP-1193 proxy client in production profile: {e}"
            )),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to deterministic provider");
                ProviderMode::Deterministic
            }
        },
        None if config.strict_runtime_required() => ProviderMode::Disabled(
            "EIP-1193 proxy URL not configured in production runtime profile".to_owned(),
        ),
        None => ProviderMode::Deterministic,
    }
}
