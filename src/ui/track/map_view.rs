use egui::{
    Color32, ComboBox, CornerRadius, FontId, Frame, Id, Image, Painter, Pos2, Rect, Sense,
    Shape, Stroke, Ui, UiBuilder, pos2, vec2,
};
use serde::{Deserialize, Serialize};

use crate::geolocation::Coordinate;

use super::projection::{self, TILE_SIZE};

pub(crate) const DEFAULT_ZOOM: u8 = 13;

const ESRI_STREETS_TILES: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Street_Map/MapServer/tile/{z}/{y}/{x}";
const ESRI_IMAGERY_TILES: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";
const ESRI_REFERENCE_TILES: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/Reference/World_Boundaries_and_Places/MapServer/tile/{z}/{y}/{x}";
const OSM_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

const MAP_BACKGROUND: Color32 = Color32::from_rgb(18, 18, 22);
const TRACE_COLOR: Color32 = Color32::from_rgb(52, 101, 235);
const TRACE_WIDTH: f32 = 3.0;
const MARKER_FILL: Color32 = Color32::from_rgb(214, 60, 60);
const MARKER_RADIUS: f32 = 6.0;
const POPUP_BACKGROUND: Color32 = Color32::from_rgba_premultiplied(20, 20, 24, 230);
const POPUP_PADDING: f32 = 6.0;
const POPUP_OFFSET: f32 = 12.0;
const LAYER_PICKER_WIDTH: f32 = 170.0;

/// The selectable base tile layers. Hybrid stacks the reference-label tiles
/// on top of the imagery tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseLayer {
    #[default]
    Streets,
    Satellite,
    Hybrid,
    OpenStreetMap,
}

impl BaseLayer {
    pub(crate) const ALL: [BaseLayer; 4] = [
        BaseLayer::Streets,
        BaseLayer::Satellite,
        BaseLayer::Hybrid,
        BaseLayer::OpenStreetMap,
    ];

    pub(crate) fn label(&self) -> &'static str {
        match self {
            BaseLayer::Streets => "Streets",
            BaseLayer::Satellite => "Satellite",
            BaseLayer::Hybrid => "Hybrid (satellite + labels)",
            BaseLayer::OpenStreetMap => "OpenStreetMap",
        }
    }

    fn tile_layers(&self) -> &'static [&'static str] {
        match self {
            BaseLayer::Streets => &[ESRI_STREETS_TILES],
            BaseLayer::Satellite => &[ESRI_IMAGERY_TILES],
            BaseLayer::Hybrid => &[ESRI_IMAGERY_TILES, ESRI_REFERENCE_TILES],
            BaseLayer::OpenStreetMap => &[OSM_TILES],
        }
    }

    pub(crate) fn attribution(&self) -> &'static str {
        match self {
            BaseLayer::Streets | BaseLayer::Satellite => "Tiles © Esri",
            BaseLayer::Hybrid => "Tiles & labels © Esri",
            BaseLayer::OpenStreetMap => "© OpenStreetMap contributors",
        }
    }
}

fn tile_url(template: &str, zoom: u8, x: u32, y: u32) -> String {
    template
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

#[derive(Clone, Debug)]
pub struct Marker {
    pub coord: Coordinate,
    pub title: String,
    pub content: String,
}

/// The map widget: a web-mercator tile pyramid centered on the latest fix,
/// the traveled-path polyline, and the markers dropped along the way.
/// Markers are kept for the lifetime of the widget, so long sessions
/// accumulate them without bound.
pub struct MapView {
    center: Option<Coordinate>,
    zoom: u8,
    base_layer: BaseLayer,
    markers: Vec<Marker>,
    trace: Option<Vec<Coordinate>>,
    trace_revision: u64,
}

impl MapView {
    pub fn new(zoom: u8, base_layer: BaseLayer) -> Self {
        Self {
            center: None,
            zoom,
            base_layer,
            markers: Vec::new(),
            trace: None,
            trace_revision: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.center.is_some()
    }

    /// First fix: center the widget and drop the starting marker.
    pub fn initialize(&mut self, coord: Coordinate) {
        self.center = Some(coord);
        self.markers.push(Marker {
            coord,
            title: "You are here".to_string(),
            content: coordinate_text(coord),
        });
    }

    /// Subsequent fixes: pan to the coordinate, drop a movement marker, and
    /// rebuild the polyline from the complete path. The previous polyline is
    /// discarded, not edited.
    pub fn track_movement(&mut self, coord: Coordinate, path: &[Coordinate]) {
        self.center = Some(coord);
        self.markers.push(Marker {
            coord,
            title: "New location".to_string(),
            content: format!("Moved to {}", coordinate_text(coord)),
        });
        self.trace = Some(path.to_vec());
        self.trace_revision += 1;
    }

    /// Removes the polyline; markers stay where they were dropped.
    pub fn clear_trace(&mut self) {
        self.trace = None;
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    pub fn base_layer(&self) -> BaseLayer {
        self.base_layer
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn trace(&self) -> Option<&[Coordinate]> {
        self.trace.as_deref()
    }

    /// How many times the polyline has been rebuilt since creation.
    pub fn trace_revision(&self) -> u64 {
        self.trace_revision
    }

    pub(crate) fn show(&mut self, ui: &mut Ui) {
        let Some(center) = self.center else {
            return;
        };

        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, CornerRadius::ZERO, MAP_BACKGROUND);

        let zoom = self.zoom;
        let (center_x, center_y) = projection::global_pixel(center, zoom);
        let to_screen = |coord: Coordinate| -> Pos2 {
            let (x, y) = projection::global_pixel(coord, zoom);
            pos2(
                rect.center().x + (x - center_x) as f32,
                rect.center().y + (y - center_y) as f32,
            )
        };

        self.show_tiles(ui, rect, center_x, center_y);

        if let Some(trace) = &self.trace
            && trace.len() >= 2
        {
            let points: Vec<Pos2> = trace.iter().map(|c| to_screen(*c)).collect();
            painter.add(Shape::line(points, Stroke::new(TRACE_WIDTH, TRACE_COLOR)));
        }

        for (i, marker) in self.markers.iter().enumerate() {
            let pos = to_screen(marker.coord);
            if !rect.expand(MARKER_RADIUS).contains(pos) {
                continue;
            }
            painter.circle(pos, MARKER_RADIUS, MARKER_FILL, Stroke::new(2.0, Color32::WHITE));

            if i + 1 == self.markers.len() {
                // the newest marker keeps its popup open
                draw_popup(&painter, pos, marker);
            } else {
                ui.interact(
                    Rect::from_center_size(pos, vec2(16.0, 16.0)),
                    ui.id().with(("map-marker", i)),
                    Sense::hover(),
                )
                .on_hover_ui(|ui| {
                    ui.strong(marker.title.clone());
                    ui.label(marker.content.clone());
                });
            }
        }

        self.show_layer_picker(ui, rect);
        show_attribution(&painter, rect, self.base_layer.attribution());
    }

    fn show_tiles(&self, ui: &mut Ui, rect: Rect, center_x: f64, center_y: f64) {
        let mut tile_ui = ui.new_child(UiBuilder::new().max_rect(rect));
        tile_ui.set_clip_rect(rect);

        let tiles = projection::tile_count(self.zoom) as i64;
        let half_w = rect.width() as f64 / 2.0;
        let half_h = rect.height() as f64 / 2.0;
        let first_tx = ((center_x - half_w) / TILE_SIZE).floor() as i64;
        let last_tx = ((center_x + half_w) / TILE_SIZE).floor() as i64;
        let first_ty = (((center_y - half_h) / TILE_SIZE).floor() as i64).max(0);
        let last_ty = (((center_y + half_h) / TILE_SIZE).floor() as i64).min(tiles - 1);

        for template in self.base_layer.tile_layers() {
            for ty in first_ty..=last_ty {
                for tx in first_tx..=last_tx {
                    // wrap across the antimeridian
                    let wrapped_tx = tx.rem_euclid(tiles) as u32;
                    let url = tile_url(template, self.zoom, wrapped_tx, ty as u32);
                    let tile_pos = pos2(
                        rect.center().x + (tx as f64 * TILE_SIZE - center_x) as f32,
                        rect.center().y + (ty as f64 * TILE_SIZE - center_y) as f32,
                    );
                    let tile_rect =
                        Rect::from_min_size(tile_pos, vec2(TILE_SIZE as f32, TILE_SIZE as f32));
                    if !rect.intersects(tile_rect) {
                        continue;
                    }
                    tile_ui.put(
                        tile_rect,
                        Image::from_uri(url)
                            .fit_to_exact_size(vec2(TILE_SIZE as f32, TILE_SIZE as f32)),
                    );
                }
            }
        }
    }

    fn show_layer_picker(&mut self, ui: &Ui, rect: Rect) {
        egui::Area::new(Id::new("map-layer-picker"))
            .fixed_pos(rect.right_top() + vec2(-LAYER_PICKER_WIDTH - 16.0, 8.0))
            .show(ui.ctx(), |ui| {
                Frame::popup(ui.style()).show(ui, |ui| {
                    ComboBox::from_id_salt("base-layer")
                        .selected_text(self.base_layer.label())
                        .width(LAYER_PICKER_WIDTH)
                        .show_ui(ui, |ui| {
                            for layer in BaseLayer::ALL {
                                ui.selectable_value(&mut self.base_layer, layer, layer.label());
                            }
                        });
                });
            });
    }
}

fn coordinate_text(coord: Coordinate) -> String {
    format!("{:.6}, {:.6}", coord.latitude, coord.longitude)
}

fn draw_popup(painter: &Painter, anchor: Pos2, marker: &Marker) {
    let title = painter.layout_no_wrap(
        marker.title.clone(),
        FontId::proportional(12.0),
        Color32::WHITE,
    );
    let content = painter.layout_no_wrap(
        marker.content.clone(),
        FontId::proportional(11.0),
        Color32::LIGHT_GRAY,
    );

    let width = title.size().x.max(content.size().x) + 2.0 * POPUP_PADDING;
    let height = title.size().y + content.size().y + 2.0 * POPUP_PADDING + 2.0;
    let popup_rect = Rect::from_min_size(
        pos2(anchor.x - width / 2.0, anchor.y - MARKER_RADIUS - POPUP_OFFSET - height),
        vec2(width, height),
    );

    painter.rect_filled(popup_rect, CornerRadius::same(4), POPUP_BACKGROUND);
    let title_height = title.size().y;
    painter.galley(
        popup_rect.min + vec2(POPUP_PADDING, POPUP_PADDING),
        title,
        Color32::WHITE,
    );
    painter.galley(
        popup_rect.min + vec2(POPUP_PADDING, POPUP_PADDING + title_height + 2.0),
        content,
        Color32::LIGHT_GRAY,
    );
}

fn show_attribution(painter: &Painter, rect: Rect, attribution: &str) {
    let galley = painter.layout_no_wrap(
        attribution.to_string(),
        FontId::proportional(10.0),
        Color32::WHITE,
    );
    let size = galley.size() + vec2(8.0, 4.0);
    let bg_rect = Rect::from_min_size(rect.right_bottom() - size, size);
    painter.rect_filled(bg_rect, CornerRadius::ZERO, Color32::from_black_alpha(140));
    painter.galley(bg_rect.min + vec2(4.0, 2.0), galley, Color32::WHITE);
}
