pub mod config;
pub mod controller;
pub mod map_view;
pub mod projection;

use std::{
    sync::mpsc::{Receiver, Sender},
    time::{Duration, SystemTime},
};

use config::AppConfig;
use egui::{Align, Color32, Layout, RichText, Visuals};
use egui_plot::{Line, PlotPoints};
use log::error;

use crate::geolocation::{Coordinate, WatchEvent};
use crate::ui::stroke_shade;

use controller::{SourceFactory, TrackingController};
use map_view::MapView;

const MAX_EVENTS_PER_REFRESH: usize = 10;
const MAX_TIME_PER_REFRESH_MS: u128 = 50;

const ERROR_COLOR: Color32 = Color32::from_rgb(230, 80, 80);
const SPEED_SLOW_COLOR: Color32 = Color32::from_rgb(97, 200, 124);
const SPEED_FAST_COLOR: Color32 = Color32::from_rgb(242, 97, 63);

// full shade at highway speed
const SPEED_SCALE_KMH: f64 = 120.0;

/// `TrackerApp` displays the live position watch: controls, readouts, the
/// map canvas, and an optional speed panel. Watch events arrive over an
/// mpsc channel and are pumped into the controller with per-frame budgets
/// so a bursty provider cannot stall the UI.
pub struct TrackerApp {
    controller: TrackingController,
    event_receiver: Receiver<WatchEvent>,
    app_config: AppConfig,
}

impl TrackerApp {
    pub fn new(
        source_factory: SourceFactory,
        event_receiver: Receiver<WatchEvent>,
        event_sender: Sender<WatchEvent>,
        trace_sender: Option<Sender<WatchEvent>>,
        app_config: AppConfig,
        landmark_override: Option<Coordinate>,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        cc.egui_ctx.set_visuals(Visuals::dark());

        let landmark = landmark_override.unwrap_or_else(|| app_config.landmark());
        let map = MapView::new(app_config.zoom, app_config.base_layer);
        let controller = TrackingController::new(
            source_factory,
            event_sender,
            trace_sender,
            landmark,
            app_config.landmark_name.clone(),
            map,
        );

        Self {
            controller,
            event_receiver,
            app_config,
        }
    }

    fn controls_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.);
            ui.horizontal(|ui| {
                if ui.button("Start tracking").clicked() {
                    self.controller.start();
                }
                if ui.button("Stop tracking").clicked() {
                    self.controller.stop();
                }
                if ui.button("Clear path").clicked() {
                    self.controller.clear_path();
                }
                if ui
                    .selectable_label(self.app_config.show_speed_panel, "Speed")
                    .clicked()
                {
                    self.app_config.show_speed_panel = !self.app_config.show_speed_panel;
                }
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    self.controller.status_mut().ui(ui);
                });
            });
            ui.add_space(2.);
            self.readouts_view(ui);
            ui.add_space(4.);
        });
    }

    fn readouts_view(&mut self, ui: &mut egui::Ui) {
        if let Some(error) = self.controller.error_text() {
            ui.colored_label(ERROR_COLOR, format!("Location error: {}", error));
        }

        let Some(fix) = self.controller.last_fix() else {
            ui.label(RichText::new("Start tracking to see your position.").weak());
            return;
        };

        ui.label(format!(
            "You are at latitude {:.6}, longitude {:.6}",
            fix.coord.latitude, fix.coord.longitude
        ));
        if let Some(km) = self.controller.distance_to_landmark_km() {
            ui.label(format!(
                "You are {:.2} km from {}",
                km,
                self.controller.landmark_name()
            ));
        }
        ui.horizontal(|ui| {
            if self.controller.path().len() >= 2 {
                ui.label(format!("Traveled {:.2} km", self.controller.traveled_km()));
            }
            if let Some(kmh) = self.controller.speed_kmh() {
                ui.label(format!("Speed {:.1} km/h", kmh));
            }
        });
    }

    fn speed_view(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("speed").min_height(90.).show(ctx, |ui| {
            let speed_points: Vec<[f64; 2]> = self
                .controller
                .speed_history()
                .iter()
                .enumerate()
                .map(|(i, kmh)| [i as f64, *kmh])
                .collect();

            let plot = egui_plot::Plot::new("speed-history")
                .allow_drag(false)
                .allow_scroll(false)
                .allow_zoom(false)
                .include_y(0.)
                .show_grid(false);
            plot.show_background(false).show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::new(speed_points))
                        .gradient_color(
                            std::sync::Arc::new(|point| {
                                stroke_shade(
                                    SPEED_SLOW_COLOR,
                                    SPEED_FAST_COLOR,
                                    (point.y / SPEED_SCALE_KMH) as f32,
                                )
                            }),
                            true,
                        )
                        .color(SPEED_SLOW_COLOR)
                        .fill(0.)
                        .name("Speed"),
                );
            });
        });
    }

    fn map_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.controller.map().is_initialized() {
                self.controller.map_mut().show(ui);
            } else {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Waiting for the first position fix...").weak());
                });
            }
        });
    }
}

impl eframe::App for TrackerApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        // keep the layer the user picked on the map widget
        self.app_config.base_layer = self.controller.map().base_layer();
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui_extras::install_image_loaders(ctx);

        // consume a few watch events and then exit the loop to avoid
        // blocking the UI
        let start_refresh = SystemTime::now();
        let mut events_processed = 0;
        while let Ok(event) = self.event_receiver.try_recv() {
            self.controller.handle_event(event);

            events_processed += 1;
            if events_processed > MAX_EVENTS_PER_REFRESH
                || SystemTime::now()
                    .duration_since(start_refresh)
                    .unwrap()
                    .as_millis()
                    >= MAX_TIME_PER_REFRESH_MS
            {
                break;
            }
        }

        if let Some(outer_rect) = ctx.input(|is| is.viewport().outer_rect) {
            self.app_config.window_position = outer_rect.min.into();
        }

        self.controls_view(ctx);
        if self.app_config.show_speed_panel {
            self.speed_view(ctx);
        }
        self.map_view(ctx);

        ctx.request_repaint_after(Duration::from_millis(self.app_config.refresh_rate_ms as u64));
    }
}
