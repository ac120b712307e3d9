use filmchain_wallet_core::{ClockPort, PortError};

/// Wall clock. `web_time` maps to `Date.now()` on wasm32 and to std elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClockAdapter;

impl ClockPort for SystemClockAdapter {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("time error: {e}")))?;
        u64::try_from(now.as_millis())
            .map_err(|e| PortError::Transport(format!("time overflow: {e}")))
    }
}
