use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use egui::{Color32, CornerRadius, Frame, Margin, RichText, Ui};

pub mod track;

pub(crate) const STATUS_VISIBLE_MS: u64 = 3000;

const STATUS_BACKGROUND: Color32 = Color32::from_rgb(28, 54, 38);
const STATUS_TEXT: Color32 = Color32::from_rgb(176, 230, 194);

/// Transient status text. Every `show` replaces the message immediately and
/// arms its own dismiss timer; when the earliest pending timer fires it
/// hides whatever message is on screen, so a timer armed by an older
/// message can hide a newer one early.
pub struct StatusBanner {
    message: String,
    visible: bool,
    dismiss_queue: VecDeque<Instant>,
}

impl Default for StatusBanner {
    fn default() -> Self {
        Self {
            message: String::new(),
            visible: false,
            dismiss_queue: VecDeque::new(),
        }
    }
}

impl StatusBanner {
    pub fn show(&mut self, message: impl Into<String>) {
        self.show_at(message, Instant::now());
    }

    pub fn show_at(&mut self, message: impl Into<String>, now: Instant) {
        self.message = message.into();
        self.visible = true;
        self.dismiss_queue
            .push_back(now + Duration::from_millis(STATUS_VISIBLE_MS));
    }

    /// Fires every dismiss timer that has expired by `now`.
    pub fn tick(&mut self, now: Instant) {
        while let Some(deadline) = self.dismiss_queue.front() {
            if *deadline > now {
                break;
            }
            self.dismiss_queue.pop_front();
            self.visible = false;
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.visible.then_some(self.message.as_str())
    }

    pub(crate) fn ui(&mut self, ui: &mut Ui) {
        self.tick(Instant::now());
        if let Some(message) = self.current() {
            Frame::new()
                .fill(STATUS_BACKGROUND)
                .corner_radius(CornerRadius::same(4))
                .inner_margin(Margin::same(4))
                .show(ui, |ui| {
                    ui.label(RichText::new(message).color(STATUS_TEXT));
                });
        }
    }
}

pub(crate) fn stroke_shade(start: Color32, end: Color32, y: f32) -> Color32 {
    let channel = |a: u8, b: u8| -> u8 {
        (a as f32 + y.clamp(0., 1.) * (b as f32 - a as f32)).round() as u8
    };
    Color32::from_rgb(
        channel(start.r(), end.r()),
        channel(start.g(), end.g()),
        channel(start.b(), end.b()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_hides_after_the_dismiss_delay() {
        let mut banner = StatusBanner::default();
        let start = Instant::now();

        banner.show_at("Tracking started.", start);
        banner.tick(start + Duration::from_millis(STATUS_VISIBLE_MS - 1));
        assert_eq!(banner.current(), Some("Tracking started."));

        banner.tick(start + Duration::from_millis(STATUS_VISIBLE_MS));
        assert_eq!(banner.current(), None);
    }

    #[test]
    fn test_later_message_replaces_text_immediately() {
        let mut banner = StatusBanner::default();
        let start = Instant::now();

        banner.show_at("Tracking started.", start);
        banner.show_at("Path cleared.", start + Duration::from_millis(100));
        assert_eq!(banner.current(), Some("Path cleared."));
    }

    #[test]
    fn test_stale_timer_still_hides_the_newer_message() {
        let mut banner = StatusBanner::default();
        let start = Instant::now();

        banner.show_at("Tracking started.", start);
        banner.show_at("Path cleared.", start + Duration::from_millis(2000));

        // the first message's timer fires at 3000 and takes the newer
        // message with it
        banner.tick(start + Duration::from_millis(STATUS_VISIBLE_MS));
        assert_eq!(banner.current(), None);
    }

    #[test]
    fn test_stroke_shade_interpolates_endpoints() {
        let start = Color32::from_rgb(0, 0, 0);
        let end = Color32::from_rgb(200, 100, 50);
        assert_eq!(stroke_shade(start, end, 0.), start);
        assert_eq!(stroke_shade(start, end, 1.), end);
        assert_eq!(stroke_shade(start, end, 0.5), Color32::from_rgb(100, 50, 25));
    }
}
