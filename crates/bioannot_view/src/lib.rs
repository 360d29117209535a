//! Viewport and tile presentation for the bioannot annotation engine.
//!
//! This crate owns everything the renderer needs to know: how pixel-space
//! geometry is projected for display, how pyramid tiles are addressed, the
//! rendered feature layer with its input handlers and styles, and the
//! viewport itself. It never owns annotation data.

pub mod layer;
pub mod projection;
pub mod tiles;
pub mod viewport;

pub use layer::{
    FeatureHandler, FeatureLayer, FeatureStyle, MapHandler, RenderedFeature, StrokeColor,
};
pub use projection::{DisplayBounds, DisplayPoint, PixelPoint, Projection, native_zoom_level};
pub use tiles::{TileCoord, TileSource};
pub use viewport::Viewport;
