#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use alloy::primitives::hex;
use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use filmchain_wallet_adapters::{RuntimeProfile, WalletAdapterConfig};

/// Wallet behind the mock EIP-1193 proxy. Tests mutate it while the server runs.
#[derive(Debug, Clone)]
pub struct WalletFixture {
    pub authorized: Vec<Address>,
    pub wallet_accounts: Vec<Address>,
    pub reject_requests: bool,
    pub chain_id: u64,
    pub balance: U256,
    pub calls: Vec<String>,
}

impl Default for WalletFixture {
    fn default() -> Self {
        Self {
            authorized: Vec::new(),
            wallet_accounts: vec![owner_address()],
            reject_requests: false,
            chain_id: 1,
            balance: U256::ZERO,
            calls: Vec::new(),
        }
    }
}

pub struct MockWallet {
    pub url: String,
    pub fixture: Arc<Mutex<WalletFixture>>,
    _join: thread::JoinHandle<()>,
}

impl MockWallet {
    pub fn calls(&self) -> Vec<String> {
        self.fixture.lock().expect("fixture lock").calls.clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut WalletFixture)) {
        f(&mut self.fixture.lock().expect("fixture lock"));
    }

    pub fn config(&self) -> WalletAdapterConfig {
        WalletAdapterConfig {
            runtime_profile: RuntimeProfile::Production,
            eip1193_proxy_url: Some(self.url.clone()),
            rpc_timeout_ms: 5_000,
            token_address: Some(token_address()),
            token_decimals: 18,
            ..WalletAdapterConfig::default()
        }
    }
}

pub fn spawn_mock_wallet(fixture: WalletFixture) -> MockWallet {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let url = format!("http://{}", server.server_addr());
    let fixture = Arc::new(Mutex::new(fixture));
    let shared = Arc::clone(&fixture);

    let join = thread::spawn(move || {
        while let Ok(Some(mut req)) = server.recv_timeout(Duration::from_secs(10)) {
            let mut body = String::new();
            if req.as_reader().read_to_string(&mut body).is_err() {
                let _ = req.respond(Response::empty(StatusCode(400)));
                continue;
            }
            let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let id = payload.get("id").cloned().unwrap_or(json!(1));
            let method = payload
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();

            let outcome = match shared.lock() {
                Ok(mut f) => {
                    f.calls.push(method.clone());
                    dispatch(&mut f, &method, payload.get("params"))
                }
                Err(_) => Err(json!({"code": -32603, "message": "fixture poisoned"})),
            };
            let response = match outcome {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
            };
            let _ = req.respond(Response::from_string(response.to_string()));
        }
    });

    MockWallet {
        url,
        fixture,
        _join: join,
    }
}

fn dispatch(f: &mut WalletFixture, method: &str, params: Option<&Value>) -> Result<Value, Value> {
    match method {
        "eth_chainId" => Ok(json!(format!("0x{:x}", f.chain_id))),
        "eth_accounts" => Ok(addresses(&f.authorized)),
        "eth_requestAccounts" => {
            if f.reject_requests {
                Err(json!({"code": 4001, "message": "User rejected the request."}))
            } else {
                f.authorized = f.wallet_accounts.clone();
                Ok(addresses(&f.authorized))
            }
        }
        "eth_call" => {
            let data = params
                .and_then(|p| p.get(0))
                .and_then(|c| c.get("data"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if data.starts_with("0x70a08231") {
                Ok(json!(format!("0x{}", hex::encode(f.balance.to_be_bytes::<32>()))))
            } else {
                Err(json!({"code": -32000, "message": "execution reverted"}))
            }
        }
        _ => Err(json!({"code": -32601, "message": "method not found"})),
    }
}

fn addresses(accounts: &[Address]) -> Value {
    json!(accounts.iter().map(|a| a.to_string()).collect::<Vec<_>>())
}

pub fn owner_address() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid owner address")
}

pub fn second_address() -> Address {
    "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("valid second address")
}

pub fn token_address() -> Address {
    "0x000000000000000000000000000000000000F11A"
        .parse()
        .expect("valid token address")
}

/// `amount` whole tokens at 18 decimals.
pub fn tokens(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}
