//! Main application state and update loop

use eframe::egui;
use filmchain_wallet_adapters::WalletAdapterConfig;
use filmchain_wallet_core::ConnectionPhase;

use crate::header::{self, HeaderAction, HeaderView};
use crate::ui;
use crate::wallet_bridge::WalletBridge;

/// The main application state
pub struct App {
    wallet: WalletBridge,
    show_diagnostics: bool,
}

impl App {
    /// Create a new App instance
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = WalletAdapterConfig::from_env();
        tracing::info!(
            profile = ?config.runtime_profile,
            token = %config.token_symbol,
            "wallet configuration loaded"
        );
        Self {
            wallet: WalletBridge::new(config, &cc.egui_ctx),
            show_diagnostics: false,
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.wallet.tick(ctx);

        let action = header::render(
            ctx,
            HeaderView {
                state: self.wallet.snapshot(),
                phase: self.wallet.phase(),
                token_symbol: self.wallet.token_symbol(),
                balance_loading: self.wallet.is_balance_loading(),
                show_balance: self.wallet.has_balance_source(),
            },
        );
        match action {
            HeaderAction::Connect => {
                self.wallet.connect(ctx);
            }
            HeaderAction::Disconnect => self.wallet.disconnect(),
            HeaderAction::RefreshBalance => self.wallet.refresh_balance(ctx),
            HeaderAction::None => {}
        }

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "build {} · {}",
                        short_hash(env!("GIT_HASH")),
                        env!("BUILD_TIME")
                    ))
                    .weak()
                    .small(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.checkbox(&mut self.show_diagnostics, "Diagnostics");
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(10.0);
                self.render_welcome(ui);
                if self.show_diagnostics {
                    ui.add_space(15.0);
                    self.render_diagnostics(ui);
                }
                ui.add_space(20.0);
            });
        });
    }
}

impl App {
    fn render_welcome(&self, ui: &mut egui::Ui) {
        ui::styled_heading(ui, "Welcome to FilmChain");
        ui.add_space(8.0);
        ui::card(ui, |ui| {
            let hint = match self.wallet.phase() {
                ConnectionPhase::Initializing => "Looking for a browser wallet…",
                ConnectionPhase::ProviderMissing => {
                    "No compatible wallet was found. Install a browser wallet extension and reload."
                }
                ConnectionPhase::Disconnected => {
                    "Connect your wallet to see your account and token balance."
                }
                ConnectionPhase::Connecting => "Approve the connection request in your wallet.",
                ConnectionPhase::Connected => "Your wallet is connected.",
            };
            ui.label(hint);
        });
    }

    fn render_diagnostics(&self, ui: &mut egui::Ui) {
        ui::card(ui, |ui| {
            ui.label(egui::RichText::new("Wallet session").strong());
            ui.label(format!("Runtime: {}", self.wallet.runtime_mode()));
            ui.add_space(6.0);

            match serde_json::to_string_pretty(self.wallet.snapshot()) {
                Ok(json) => {
                    ui.label(egui::RichText::new(json).monospace().small());
                }
                Err(e) => ui::error_message(ui, &format!("snapshot unavailable: {e}")),
            }

            ui.add_space(6.0);
            ui.label(egui::RichText::new("Transitions").strong());
            for t in self.wallet.transitions() {
                ui.label(
                    egui::RichText::new(format!(
                        "{} {} → {} ({})",
                        t.at_ms.0,
                        t.from.label(),
                        t.to.label(),
                        t.reason
                    ))
                    .monospace()
                    .small(),
                );
            }
        });
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
