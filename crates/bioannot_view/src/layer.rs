//! Rendered feature layer.
//!
//! The layer is a write-only projection of the feature store: every entry
//! is built from a stored feature and thrown away when the feature changes.
//! Nothing here is ever read back as the source of truth for geometry.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use web_time::Instant;

use crate::projection::{DisplayBounds, DisplayPoint};

/// Stroke color of a rendered feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeColor {
    /// Renderer default (ungraded features).
    #[default]
    Default,
    Green,
    Red,
    Orange,
    Blue,
    Yellow,
}

impl StrokeColor {
    /// CSS color name understood by the front end.
    pub fn css_name(&self) -> Option<&'static str> {
        match self {
            StrokeColor::Default => None,
            StrokeColor::Green => Some("green"),
            StrokeColor::Red => Some("red"),
            StrokeColor::Orange => Some("orange"),
            StrokeColor::Blue => Some("blue"),
            StrokeColor::Yellow => Some("yellow"),
        }
    }
}

/// Path style of a rendered feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureStyle {
    pub color: StrokeColor,
    pub dashed: bool,
}

impl FeatureStyle {
    pub fn colored(color: StrokeColor) -> Self {
        Self {
            color,
            dashed: false,
        }
    }

    /// Transient style shown on features restored by an undo.
    pub fn highlight() -> Self {
        Self::colored(StrokeColor::Yellow)
    }

    /// Style of features in the multi-selection.
    pub fn selected() -> Self {
        Self {
            color: StrokeColor::Blue,
            dashed: true,
        }
    }
}

/// Click behaviour attached to a rendered feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureHandler {
    /// Clicking opens the feature popup.
    #[default]
    OpenPopup,
    /// Clicking adds or removes the feature from the selection.
    ToggleSelection,
    /// Clicks are captured by a map-level tool (draw, cut).
    Captured,
    /// Vertex handles are shown and dragged; at most `marker_limit` handles.
    VertexEdit { marker_limit: usize },
}

/// Input behaviour attached to the map itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapHandler {
    /// Plain pan/zoom.
    #[default]
    Navigate,
    /// Clicks place polygon vertices.
    PlaceVertex,
    /// Clicks place vertices of a cutting polygon.
    CutShape,
}

/// One feature as the renderer sees it, in display coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFeature {
    pub fid: u32,
    pub rings: Vec<Vec<DisplayPoint>>,
    /// Style derived from the feature's properties.
    pub base_style: FeatureStyle,
    /// Style currently drawn; differs from `base_style` while highlighted.
    pub style: FeatureStyle,
    pub handler: FeatureHandler,
}

impl RenderedFeature {
    pub fn new(fid: u32, rings: Vec<Vec<DisplayPoint>>, base_style: FeatureStyle) -> Self {
        Self {
            fid,
            rings,
            base_style,
            style: base_style,
            handler: FeatureHandler::default(),
        }
    }

    /// Bounds of the outer ring.
    pub fn bounds(&self) -> Option<DisplayBounds> {
        DisplayBounds::from_points(self.rings.first()?)
    }
}

/// Layer holding every rendered feature, keyed by fid.
#[derive(Debug, Default)]
pub struct FeatureLayer {
    features: BTreeMap<u32, RenderedFeature>,
    map_handler: MapHandler,
    /// Handler newly added features receive.
    default_handler: FeatureHandler,
    /// Highlight expiry per fid.
    highlights: HashMap<u32, Instant>,
    /// Feature whose popup is open.
    open_popup: Option<u32>,
}

impl FeatureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or rebuild) the rendered representation of a feature.
    ///
    /// An existing entry with the same fid is discarded first; renderers
    /// cannot reshape a live instance in place.
    pub fn add(&mut self, mut feature: RenderedFeature) {
        feature.handler = self.default_handler;
        if self.highlights.contains_key(&feature.fid) {
            feature.style = FeatureStyle::highlight();
        }
        log::trace!("Layer: add fid {}", feature.fid);
        self.features.insert(feature.fid, feature);
    }

    pub fn remove(&mut self, fid: u32) -> Option<RenderedFeature> {
        self.highlights.remove(&fid);
        if self.open_popup == Some(fid) {
            self.open_popup = None;
        }
        self.features.remove(&fid)
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.highlights.clear();
        self.open_popup = None;
    }

    pub fn get(&self, fid: u32) -> Option<&RenderedFeature> {
        self.features.get(&fid)
    }

    pub fn contains(&self, fid: u32) -> bool {
        self.features.contains_key(&fid)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn fids(&self) -> impl Iterator<Item = u32> + '_ {
        self.features.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderedFeature> {
        self.features.values()
    }

    pub fn bounds(&self, fid: u32) -> Option<DisplayBounds> {
        self.features.get(&fid)?.bounds()
    }

    // ========================================================================
    // Input handlers
    // ========================================================================

    pub fn map_handler(&self) -> MapHandler {
        self.map_handler
    }

    pub fn set_map_handler(&mut self, handler: MapHandler) {
        if self.map_handler != handler {
            log::debug!("🖱️ Map handler: {:?} -> {:?}", self.map_handler, handler);
            self.map_handler = handler;
        }
    }

    pub fn default_handler(&self) -> FeatureHandler {
        self.default_handler
    }

    /// Attach `handler` to every feature, including features added later.
    pub fn set_feature_handler(&mut self, handler: FeatureHandler) {
        self.default_handler = handler;
        for feature in self.features.values_mut() {
            feature.handler = handler;
        }
    }

    /// Attach `handler` to a single feature only.
    pub fn set_handler(&mut self, fid: u32, handler: FeatureHandler) -> bool {
        match self.features.get_mut(&fid) {
            Some(feature) => {
                feature.handler = handler;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Popups
    // ========================================================================

    pub fn open_popup(&mut self, fid: u32) -> bool {
        if self.features.contains_key(&fid) {
            self.open_popup = Some(fid);
            true
        } else {
            false
        }
    }

    pub fn close_popup(&mut self) {
        self.open_popup = None;
    }

    pub fn popup(&self) -> Option<u32> {
        self.open_popup
    }

    // ========================================================================
    // Styles
    // ========================================================================

    /// Replace the base style of a feature; shown immediately unless the
    /// feature is highlighted.
    pub fn set_base_style(&mut self, fid: u32, style: FeatureStyle) {
        let highlighted = self.highlights.contains_key(&fid);
        if let Some(feature) = self.features.get_mut(&fid) {
            feature.base_style = style;
            if !highlighted {
                feature.style = style;
            }
        }
    }

    /// Highlight a feature until `now + duration`.
    ///
    /// Re-highlighting an already highlighted feature only moves its expiry.
    pub fn highlight(&mut self, fid: u32, now: Instant, duration: Duration) {
        if let Some(feature) = self.features.get_mut(&fid) {
            feature.style = FeatureStyle::highlight();
            self.highlights.insert(fid, now + duration);
        }
    }

    pub fn is_highlighted(&self, fid: u32) -> bool {
        self.highlights.contains_key(&fid)
    }

    /// Revert every highlight that expired at `now` to the base style.
    /// Returns the fids that were reset.
    pub fn expire_highlights(&mut self, now: Instant) -> Vec<u32> {
        let expired: Vec<u32> = self
            .highlights
            .iter()
            .filter(|(_, until)| **until <= now)
            .map(|(fid, _)| *fid)
            .collect();
        for fid in &expired {
            self.highlights.remove(fid);
            if let Some(feature) = self.features.get_mut(fid) {
                feature.style = feature.base_style;
            }
        }
        expired
    }
}
