use std::time::{Duration, Instant};

use eframe::egui;

use bl_looper::{
    format_time, HostEvent, HostPage, KeyPress, LoopConfig, LoopController, LoopStore,
    MediaElement, PanelInput, SlotItem,
};

use crate::download_row::DownloadRow;
use crate::page::SimulatedPage;
use crate::panel_ui::PanelUi;
use crate::player::PlayerState;

const STATUS_BG: egui::Color32 = egui::Color32::from_rgb(0x12, 0x12, 0x12);
const STATUS_TEXT: egui::Color32 = egui::Color32::from_rgb(0x88, 0x88, 0x88);
const TOAST_COLOR: egui::Color32 = egui::Color32::from_rgb(0x4e, 0xcd, 0xc4);
const PLAYER_BG: egui::Color32 = egui::Color32::from_rgb(0x0a, 0x0a, 0x0a);

/// Upper bound between frames so the player clock and timers stay smooth.
const FRAME_BUDGET: Duration = Duration::from_millis(10);

pub struct BeatLoopApp {
    page: SimulatedPage,
    controller: LoopController,
    panel_ui: PanelUi,
    download_row: DownloadRow,
    address: String,
}

impl BeatLoopApp {
    pub fn new(config: LoopConfig, store: LoopStore, url: &str, helper_url: &str) -> Self {
        let mut page = SimulatedPage::new(url, Instant::now());
        let mut controller = LoopController::new(config, store);
        controller.start(&mut page);
        Self {
            page,
            controller,
            panel_ui: PanelUi::default(),
            download_row: DownloadRow::new(helper_url),
            address: url.to_string(),
        }
    }

    fn dispatch(&mut self, event: HostEvent) -> bool {
        self.controller.handle(&mut self.page, event)
    }

    fn navigate(&mut self) {
        let href = self.address.trim().to_string();
        if href.is_empty() || href == self.page.href() {
            return;
        }
        self.page.navigate(&href, Instant::now());
        self.dispatch(HostEvent::Navigated);
    }

    /// Put the download row back if the page lost it.
    fn ensure_download_row(&mut self) {
        let location = self.page.location();
        if !location.is_video_page() || self.page.has_download_row() {
            return;
        }
        if let Some(video_id) = location.video_id() {
            self.page.inject_download_row();
            self.download_row.attach(video_id);
        }
    }

    fn process_keys(&mut self, ctx: &egui::Context) {
        let in_text_input = ctx.wants_keyboard_input();
        let typed: Vec<String> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Text(text) => Some(text.clone()),
                    _ => None,
                })
                .collect()
        });
        for text in typed {
            for ch in text.chars() {
                let mut key = KeyPress::new(ch.to_string());
                key.in_text_input = in_text_input;
                self.dispatch(HostEvent::Key(key));
            }
        }
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("address_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("URL");
                let field = ui.add(
                    egui::TextEdit::singleline(&mut self.address).desired_width(420.0),
                );
                let submitted =
                    field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Go").clicked() || submitted {
                    self.navigate();
                }
                ui.separator();
                if ui
                    .button("Simulate re-render")
                    .on_hover_text("The host drops every injected block")
                    .clicked()
                {
                    self.page.simulate_rerender();
                }
                if ui
                    .button("Swap player")
                    .on_hover_text("The host replaces its video element")
                    .clicked()
                {
                    self.page.simulate_player_swap();
                }
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(
                egui::Frame::NONE
                    .fill(STATUS_BG)
                    .inner_margin(egui::Margin::symmetric(8, 2)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.spacing_mut().item_spacing.x = 16.0;

                    if let Some(toast) = self.page.toast() {
                        ui.label(egui::RichText::new(&toast.text).color(TOAST_COLOR).size(11.0));
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let session = match self.controller.session() {
                            Some(s) if s.is_enforcing() => format!("{} | looping", s.video_id()),
                            Some(s) => s.video_id().to_string(),
                            None if self.controller.is_build_pending() => {
                                "waiting for metadata".to_string()
                            }
                            None => "idle".to_string(),
                        };
                        let counts = format!(
                            "timers {} | listeners {}",
                            self.page.timer_count(),
                            self.page.listener_count()
                        );
                        for text in [counts, session] {
                            ui.label(egui::RichText::new(text).color(STATUS_TEXT).size(11.0));
                        }
                    });
                });
            });
    }

    fn show_player(&mut self, ui: &mut egui::Ui) {
        let Some(player) = self.page.player_mut() else {
            ui.label("No video on this page.");
            return;
        };

        let size = egui::vec2(ui.available_width(), 180.0);
        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        ui.painter().rect_filled(rect, 4.0, PLAYER_BG);
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            player.state().label(),
            egui::FontId::proportional(20.0),
            egui::Color32::GRAY,
        );

        ui.horizontal(|ui| {
            let icon = if *player.state() == PlayerState::Playing {
                "\u{23F8}"
            } else {
                "\u{25B6}"
            };
            if ui.button(icon).clicked() {
                player.toggle_play_pause();
            }

            let duration = player.duration();
            if duration.is_finite() {
                let mut position = player.current_time();
                ui.label(format!("{} / {}", format_time(position), format_time(duration)));
                ui.spacing_mut().slider_width = (ui.available_width() - 16.0).max(80.0);
                let seek = ui.add(
                    egui::Slider::new(&mut position, 0.0..=duration)
                        .show_value(false)
                        .trailing_fill(true),
                );
                if seek.changed() {
                    player.set_current_time(position);
                }
            } else {
                ui.label("--:-- / --:--");
            }
        });
    }

    fn show_column(&mut self, ui: &mut egui::Ui) -> Vec<PanelInput> {
        let mut inputs = Vec::new();
        let slots = self.page.slots().to_vec();
        for slot in slots {
            match slot {
                SlotItem::DownloadRow => self.download_row.show(ui),
                SlotItem::LoopPanel => {
                    if let Some(view) = self.page.panel().cloned() {
                        inputs.extend(self.panel_ui.show(ui, &view));
                    }
                }
                SlotItem::Metadata => {
                    let title = self.page.location().video_id().unwrap_or_default().to_string();
                    ui.heading(format!("Video {title}"));
                    ui.label(egui::RichText::new("Channel \u{2022} description").weak());
                }
                SlotItem::Other => {
                    ui.label(egui::RichText::new("Comments and related videos").weak());
                }
            }
            ui.add_space(6.0);
        }
        inputs
    }
}

impl eframe::App for BeatLoopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. Advance the page clock and deliver due events
        for event in self.page.pump(Instant::now()) {
            self.dispatch(event);
        }

        // 2. Helper results, then the injected download row
        self.download_row.poll();
        self.ensure_download_row();

        // 3. Loop shortcuts
        self.process_keys(ctx);

        // 4. Chrome
        self.show_toolbar(ctx);
        self.show_status_bar(ctx);

        // 5. Player and the column below it
        let inputs = egui::CentralPanel::default()
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        self.show_player(ui);
                        ui.add_space(8.0);
                        self.show_column(ui)
                    })
                    .inner
            })
            .inner;

        // 6. Panel actions go through the controller
        for input in inputs {
            self.dispatch(HostEvent::Panel(input));
        }

        let wait = self
            .page
            .next_deadline()
            .map_or(FRAME_BUDGET, |d| d.min(FRAME_BUDGET));
        ctx.request_repaint_after(wait);
    }
}

impl Drop for BeatLoopApp {
    fn drop(&mut self) {
        self.dispatch(HostEvent::BeforeUnload);
        self.controller.shutdown(&mut self.page);
    }
}
