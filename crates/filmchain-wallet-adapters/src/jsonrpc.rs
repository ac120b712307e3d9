//! JSON-RPC helpers shared by the provider and token adapters.

#[cfg(not(target_arch = "wasm32"))]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;

use alloy::primitives::Address;
use serde_json::Value;

use filmchain_wallet_core::PortError;

/// Blocking JSON-RPC 2.0 client for an EIP-1193 proxy endpoint.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    base_url: String,
    client: reqwest::blocking::Client,
    next_id: Arc<AtomicU64>,
}

#[cfg(not(target_arch = "wasm32"))]
impl JsonRpcClient {
    pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Result<Self, PortError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, url = %self.base_url, "json-rpc request");

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .map_err(|e| PortError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| PortError::Transport(format!("{method} json decode failed: {e}")))?;

        if let Some(err) = body.get("error") {
            return Err(rpc_error(err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{method} returned status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{method} response missing result")))
    }
}

/// Convert a JSON-RPC / EIP-1193 error object into a port error.
pub fn rpc_error(err: &Value) -> PortError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("provider returned an error")
        .to_owned();
    match err.get("code").and_then(Value::as_i64) {
        Some(code) => PortError::Rpc { code, message },
        None => PortError::Transport(format!("provider error without code: {err}")),
    }
}

pub fn parse_accounts(method: &str, value: &Value) -> Result<Vec<Address>, PortError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
    arr.iter()
        .map(|item| {
            let raw = item
                .as_str()
                .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?;
            raw.parse::<Address>()
                .map_err(|e| PortError::Validation(format!("invalid account address {raw}: {e}")))
        })
        .collect()
}

pub fn parse_chain_id(value: &Value) -> Result<u64, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let s = value
        .as_str()
        .ok_or_else(|| PortError::Validation("chain id must be string or number".to_owned()))?;
    parse_chain_id_str(s)
}

pub fn parse_chain_id_str(raw: &str) -> Result<u64, PortError> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id: {e}"))),
        None => raw
            .parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id: {e}"))),
    }
}

/// Largest integer a JS number holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Chain id delivered as a JS number. Only exact non-negative integers pass.
pub fn chain_id_from_f64(num: f64) -> Result<u64, PortError> {
    if !num.is_finite() || num < 0.0 || num.fract() != 0.0 || num > MAX_SAFE_INTEGER {
        return Err(PortError::Validation(format!("invalid numeric chain id: {num}")));
    }
    Ok(num as u64)
}

pub fn accounts_json(accounts: &[Address]) -> Value {
    Value::Array(
        accounts
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect(),
    )
}
