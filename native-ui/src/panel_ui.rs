//! egui rendering of the loop panel.
//!
//! Draws a [`PanelView`] and turns clicks, drags and committed text into
//! [`PanelInput`]s for the controller. The widget never edits the region
//! itself.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Sense, Stroke, Vec2};

use bl_looper::{Nudge, PanelInput, PanelView};

const TRACK_HEIGHT: f32 = 28.0;
const HANDLE_RADIUS: f32 = 7.0;
const ACCENT: Color32 = Color32::from_rgb(255, 149, 0);

/// Text-field buffers; everything else is re-derived from the view.
#[derive(Default)]
pub struct PanelUi {
    start_buf: String,
    end_buf: String,
    start_editing: bool,
    end_editing: bool,
}

fn fraction_at(rect: Rect, pos: Pos2) -> f64 {
    (((pos.x - rect.left()) / rect.width()).clamp(0.0, 1.0)) as f64
}

fn x_at(rect: Rect, pct: f64) -> f32 {
    rect.left() + rect.width() * (pct / 100.0) as f32
}

impl PanelUi {
    pub fn show(&mut self, ui: &mut egui::Ui, view: &PanelView) -> Vec<PanelInput> {
        let mut inputs = Vec::new();
        if !self.start_editing {
            self.start_buf = view.start_text.clone();
        }
        if !self.end_editing {
            self.end_buf = view.end_text.clone();
        }

        let frame_stroke = if view.enabled {
            Stroke::new(1.5, ACCENT)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };
        egui::Frame::group(ui.style())
            .stroke(frame_stroke)
            .show(ui, |ui| {
                let arrow = if view.collapsed { "\u{25BC}" } else { "\u{25B2}" };
                if ui
                    .add(egui::Button::new(format!("{arrow} BEAT LOOPER")).frame(false))
                    .clicked()
                {
                    inputs.push(PanelInput::ToggleCollapsed);
                }
                if view.collapsed {
                    return;
                }

                self.header(ui, view, &mut inputs);
                ui.add_space(4.0);
                self.time_row(ui, view, &mut inputs);
                ui.add_space(4.0);
                Self::slider(ui, view, &mut inputs);
                ui.add_space(4.0);
                Self::presets(ui, view, &mut inputs);
                ui.horizontal(|ui| {
                    if ui.button("Jump to Loop Start").clicked() {
                        inputs.push(PanelInput::JumpToStart);
                    }
                    if ui.button("Reset Loop").clicked() {
                        inputs.push(PanelInput::Reset);
                    }
                });
                ui.label(
                    egui::RichText::new(
                        "Keyboard: L = toggle loop  |  [ = set start  |  ] = set end  |  \\ = jump to start",
                    )
                    .small()
                    .weak(),
                );
            });
        inputs
    }

    fn header(&self, ui: &mut egui::Ui, view: &PanelView, inputs: &mut Vec<PanelInput>) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("\u{1F501} Beat Looper").strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let (text, fill) = if view.enabled {
                    ("ON", ACCENT)
                } else {
                    ("OFF", ui.visuals().widgets.inactive.bg_fill)
                };
                if ui.add(egui::Button::new(text).fill(fill)).clicked() {
                    inputs.push(PanelInput::Toggle);
                }
            });
        });
    }

    fn time_row(&mut self, ui: &mut egui::Ui, view: &PanelView, inputs: &mut Vec<PanelInput>) {
        ui.horizontal(|ui| {
            ui.label("Start");
            if let Some(text) = Self::time_field(ui, &mut self.start_buf, &mut self.start_editing) {
                inputs.push(PanelInput::StartText(text));
            }
            if ui.small_button("SET").on_hover_text("Set to current time").clicked() {
                inputs.push(PanelInput::SetStartHere);
            }
            if ui.small_button("-").clicked() {
                inputs.push(PanelInput::NudgeStart(Nudge::Back));
            }
            if ui.small_button("+").clicked() {
                inputs.push(PanelInput::NudgeStart(Nudge::Forward));
            }

            ui.separator();
            ui.label(format!("Loop: {}", view.length_text));
            ui.separator();

            ui.label("End");
            if let Some(text) = Self::time_field(ui, &mut self.end_buf, &mut self.end_editing) {
                inputs.push(PanelInput::EndText(text));
            }
            if ui.small_button("SET").on_hover_text("Set to current time").clicked() {
                inputs.push(PanelInput::SetEndHere);
            }
            if ui.small_button("-").clicked() {
                inputs.push(PanelInput::NudgeEnd(Nudge::Back));
            }
            if ui.small_button("+").clicked() {
                inputs.push(PanelInput::NudgeEnd(Nudge::Forward));
            }
        });
    }

    /// Single-line time field; yields the text when editing is committed.
    fn time_field(ui: &mut egui::Ui, buf: &mut String, editing: &mut bool) -> Option<String> {
        let response = ui.add(egui::TextEdit::singleline(buf).desired_width(64.0));
        if response.gained_focus() {
            *editing = true;
        }
        if response.lost_focus() {
            *editing = false;
            return Some(buf.clone());
        }
        None
    }

    fn slider(ui: &mut egui::Ui, view: &PanelView, inputs: &mut Vec<PanelInput>) {
        let width = ui.available_width();
        let (rect, track) = ui.allocate_exact_size(Vec2::new(width, TRACK_HEIGHT), Sense::click());
        let painter = ui.painter_at(rect.expand(HANDLE_RADIUS));
        let visuals = ui.visuals();

        let bar = Rect::from_center_size(rect.center(), Vec2::new(rect.width(), 6.0));
        painter.rect_filled(bar, 3.0, visuals.widgets.inactive.bg_fill);

        let start_x = x_at(rect, view.start_pct);
        let end_x = x_at(rect, view.end_pct);
        let fill = Rect::from_min_max(Pos2::new(start_x, bar.top()), Pos2::new(end_x, bar.bottom()));
        let fill_color = if view.enabled {
            ACCENT
        } else {
            ACCENT.gamma_multiply(0.45)
        };
        painter.rect_filled(fill, 3.0, fill_color);

        let playhead_x = x_at(rect, view.playhead_pct);
        painter.line_segment(
            [Pos2::new(playhead_x, rect.top()), Pos2::new(playhead_x, rect.bottom())],
            Stroke::new(2.0, Color32::WHITE),
        );

        let mut on_handle = false;
        for (id, x, is_start) in [("loop-handle-start", start_x, true), ("loop-handle-end", end_x, false)] {
            let center = Pos2::new(x, rect.center().y);
            let hit = Rect::from_center_size(center, Vec2::splat(HANDLE_RADIUS * 2.5));
            let handle = ui.interact(hit, ui.id().with(id), Sense::drag());
            on_handle |= handle.hovered() || handle.dragged();
            if handle.dragged() {
                if let Some(pos) = handle.interact_pointer_pos() {
                    let fraction = fraction_at(rect, pos);
                    inputs.push(if is_start {
                        PanelInput::DragStart(fraction)
                    } else {
                        PanelInput::DragEnd(fraction)
                    });
                }
            }
            let radius = if handle.hovered() || handle.dragged() {
                HANDLE_RADIUS + 1.5
            } else {
                HANDLE_RADIUS
            };
            painter.circle(center, radius, Color32::WHITE, Stroke::new(2.0, ACCENT));
        }

        if track.clicked() && !on_handle {
            if let Some(pos) = track.interact_pointer_pos() {
                inputs.push(PanelInput::TrackClick(fraction_at(rect, pos)));
            }
        }

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("0:00").small().weak());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(egui::RichText::new(&view.duration_text).small().weak());
            });
        });
    }

    fn presets(ui: &mut egui::Ui, view: &PanelView, inputs: &mut Vec<PanelInput>) {
        ui.horizontal_wrapped(|ui| {
            ui.label("Quick:");
            for (index, label) in view.presets.iter().enumerate() {
                if ui.small_button(label).clicked() {
                    inputs.push(PanelInput::Preset(index));
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped_to_track() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 0.0), Vec2::new(200.0, 20.0));
        assert_eq!(fraction_at(rect, Pos2::new(100.0, 5.0)), 0.0);
        assert_eq!(fraction_at(rect, Pos2::new(200.0, 5.0)), 0.5);
        assert_eq!(fraction_at(rect, Pos2::new(50.0, 5.0)), 0.0);
        assert_eq!(fraction_at(rect, Pos2::new(999.0, 5.0)), 1.0);
    }

    #[test]
    fn percent_maps_onto_track() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 0.0), Vec2::new(200.0, 20.0));
        assert_eq!(x_at(rect, 0.0), 100.0);
        assert_eq!(x_at(rect, 25.0), 150.0);
        assert_eq!(x_at(rect, 100.0), 300.0);
    }
}
