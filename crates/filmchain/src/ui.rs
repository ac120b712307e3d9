//! UI helper components

use alloy::primitives::Address;
use eframe::egui;

pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(232, 176, 60);

/// Human-readable name for the chains the explorer links know about.
pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    let name = match chain_id {
        1 => "Ethereum",
        10 => "Optimism",
        56 => "BSC",
        100 => "Gnosis",
        137 => "Polygon",
        8453 => "Base",
        42161 => "Arbitrum",
        11155111 => "Sepolia",
        84532 => "Base Sepolia",
        _ => return None,
    };
    Some(name)
}

pub fn chain_label(chain_id: u64) -> String {
    match chain_name(chain_id) {
        Some(name) => format!("{name} ({chain_id})"),
        None => format!("Chain {chain_id}"),
    }
}

/// Get block explorer URL for an address on a given chain
pub fn get_explorer_address_url(chain_id: Option<u64>, address: &Address) -> String {
    let base = match chain_id.unwrap_or(1) {
        10 => "https://optimistic.etherscan.io",
        56 => "https://bscscan.com",
        100 => "https://gnosisscan.io",
        137 => "https://polygonscan.com",
        8453 => "https://basescan.org",
        42161 => "https://arbiscan.io",
        11155111 => "https://sepolia.etherscan.io",
        84532 => "https://sepolia.basescan.org",
        // Fallback
        _ => "https://etherscan.io",
    };
    format!("{}/address/{}", base, address)
}

/// `0x1234…abcd` form of a checksummed address.
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// Open URL in a new browser tab
#[cfg(target_arch = "wasm32")]
pub fn open_url_new_tab(url: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    match window.open_with_url_and_target(url, "_blank") {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!(url, "new tab blocked by the browser"),
        Err(e) => tracing::warn!(error = ?e, url, "failed to open browser tab"),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn open_url_new_tab(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(error = %e, url, "failed to open browser");
    }
}

/// Copy to clipboard (platform-specific)
#[cfg(not(target_arch = "wasm32"))]
pub fn copy_to_clipboard(text: &str) {
    let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to copy to clipboard");
    }
}

#[cfg(target_arch = "wasm32")]
pub fn copy_to_clipboard(text: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let promise = window.navigator().clipboard().write_text(text);
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = wasm_bindgen_futures::JsFuture::from(promise).await {
            tracing::warn!(error = ?e, "failed to copy to clipboard");
        }
    });
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).color(ACCENT));
}

/// Error message display
pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("❌").size(16.0));
        ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(220, 80, 80)));
    });
}

/// Primary button with enabled state
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::BLACK))
        .min_size(egui::vec2(130.0, 30.0))
        .fill(ACCENT);
    ui.add_enabled(enabled, btn)
}

/// Secondary action button - subdued, outline style
pub fn secondary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0))
        .min_size(egui::vec2(90.0, 30.0));
    ui.add(btn)
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, add_contents);
}
