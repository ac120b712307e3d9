//! Header bar: connect control, account, balance, chain and inline error.

use eframe::egui;
use filmchain_wallet_core::{ConnectionPhase, SessionState};

use crate::ui;

/// Header action returned after rendering
pub enum HeaderAction {
    None,
    Connect,
    Disconnect,
    RefreshBalance,
}

pub struct HeaderView<'a> {
    pub state: &'a SessionState,
    pub phase: ConnectionPhase,
    pub token_symbol: &'a str,
    pub balance_loading: bool,
    /// `false` hides the balance when no token is configured.
    pub show_balance: bool,
}

/// Render the header panel
pub fn render(ctx: &egui::Context, view: HeaderView<'_>) -> HeaderAction {
    let mut action = HeaderAction::None;
    let state = view.state;

    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.heading(egui::RichText::new("🎬 FilmChain").size(22.0).color(ui::ACCENT));
            ui.add_space(20.0);
            ui.separator();
            ui.label(egui::RichText::new(view.phase.label()).weak());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match view.phase {
                    ConnectionPhase::Initializing => {
                        ui::primary_button_enabled(ui, "Detecting wallet…", false);
                        ui.spinner();
                    }
                    ConnectionPhase::Connecting => {
                        ui::primary_button_enabled(ui, "Connecting…", false);
                        ui.spinner();
                    }
                    ConnectionPhase::ProviderMissing | ConnectionPhase::Disconnected => {
                        if ui::primary_button_enabled(ui, "Connect Wallet", true).clicked() {
                            action = HeaderAction::Connect;
                        }
                    }
                    ConnectionPhase::Connected => {
                        if ui::secondary_button(ui, "Disconnect").clicked() {
                            action = HeaderAction::Disconnect;
                        }
                        ui.add_space(10.0);
                        if let Some(account) = state.account {
                            if ui
                                .small_button("📋")
                                .on_hover_text("Copy address")
                                .clicked()
                            {
                                ui::copy_to_clipboard(&account.to_checksum(None));
                            }
                            let link = ui
                                .link(egui::RichText::new(ui::short_address(&account)).monospace())
                                .on_hover_text("Open in block explorer");
                            if link.clicked() {
                                ui::open_url_new_tab(&ui::get_explorer_address_url(
                                    state.chain_id,
                                    &account,
                                ));
                            }
                        }
                        if view.show_balance {
                            ui.separator();
                            if view.balance_loading {
                                ui.spinner();
                            } else if ui
                                .small_button("⟳")
                                .on_hover_text("Refresh balance")
                                .clicked()
                            {
                                action = HeaderAction::RefreshBalance;
                            }
                            ui.label(
                                egui::RichText::new(format!("{} {}", state.token_balance, view.token_symbol))
                                    .strong(),
                            );
                        }
                        if let Some(chain_id) = state.chain_id {
                            ui.separator();
                            ui.label(egui::RichText::new(ui::chain_label(chain_id)).weak());
                        }
                    }
                }

                if let Some(err) = &state.connection_error {
                    ui.add_space(10.0);
                    ui::error_message(ui, &err.to_string());
                }
            });
        });
        ui.add_space(4.0);
    });

    action
}
