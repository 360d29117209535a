//! Viewport state: center and zoom in display space.

use crate::projection::{DisplayBounds, DisplayPoint};

/// Zoom step used by the zoom controls.
pub const ZOOM_STEP: f64 = 1.0;

/// Represents the visible view of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: DisplayPoint,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Bounds the center may not leave.
    pub max_bounds: Option<DisplayBounds>,
}

impl Viewport {
    /// Create a viewport centered on the origin at zoom 0.
    pub fn new() -> Self {
        Self {
            center: DisplayPoint::default(),
            zoom: 0.0,
            min_zoom: 0.0,
            max_zoom: 18.0,
            max_bounds: None,
        }
    }

    /// Restrict panning to `bounds`; the current center is pulled inside.
    pub fn with_max_bounds(mut self, bounds: DisplayBounds) -> Self {
        self.max_bounds = Some(bounds);
        self.center = bounds.clamp(self.center);
        self
    }

    pub fn set_view(&mut self, center: DisplayPoint, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.center = self.constrain(center);
    }

    /// Move the center to `target`, keeping the zoom.
    pub fn pan_to(&mut self, target: DisplayPoint) {
        self.center = self.constrain(target);
        log::debug!(
            "🖐️ Pan to ({:.3}, {:.3})",
            self.center.lat,
            self.center.lng
        );
    }

    /// Apply a pan delta in display units.
    pub fn pan_by(&mut self, d_lat: f64, d_lng: f64) {
        let target = DisplayPoint::new(self.center.lat + d_lat, self.center.lng + d_lng);
        self.center = self.constrain(target);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(self.max_zoom);
        log::debug!("🔍 Zoom in: {:.1}", self.zoom);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(self.min_zoom);
        log::debug!("🔍 Zoom out: {:.1}", self.zoom);
    }

    fn constrain(&self, point: DisplayPoint) -> DisplayPoint {
        match &self.max_bounds {
            Some(bounds) => bounds.clamp(point),
            None => point,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
