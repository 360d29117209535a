//! Pixel <-> display coordinate projection for a tiled image pyramid.
//!
//! Stored geometry always lives in image pixel space. The viewer works in a
//! flat "simple" display projection where one display unit equals `2^z`
//! pixels at zoom `z`, with the y axis pointing up (latitude) instead of
//! down (image rows). The projection is anchored at the *native zoom*: the
//! pyramid level at which one tile pixel equals one image pixel.

use serde::{Deserialize, Serialize};

/// A point in image pixel space (x to the right, y downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to the `[x, y]` position layout used by GeoJSON rings.
    pub fn to_position(self) -> [f64; 2] {
        [self.x, self.y]
    }

    pub fn from_position(position: [f64; 2]) -> Self {
        Self::new(position[0], position[1])
    }
}

/// A point in display-projection space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub lat: f64,
    pub lng: f64,
}

impl DisplayPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned bounds in display space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBounds {
    /// South-west corner (minimum lat, minimum lng).
    pub south_west: DisplayPoint,
    /// North-east corner (maximum lat, maximum lng).
    pub north_east: DisplayPoint,
}

impl DisplayBounds {
    /// Build bounds from two arbitrary corners.
    pub fn from_corners(a: DisplayPoint, b: DisplayPoint) -> Self {
        Self {
            south_west: DisplayPoint::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: DisplayPoint::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a DisplayPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::from_corners(first, first);
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    /// Grow the bounds to include `point`.
    pub fn extend(&mut self, point: DisplayPoint) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn center(&self) -> DisplayPoint {
        DisplayPoint::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, point: DisplayPoint) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Clamp a point into the bounds.
    pub fn clamp(&self, point: DisplayPoint) -> DisplayPoint {
        DisplayPoint::new(
            point.lat.clamp(self.south_west.lat, self.north_east.lat),
            point.lng.clamp(self.south_west.lng, self.north_east.lng),
        )
    }
}

/// Compute the native zoom level of an image pyramid.
///
/// This is the smallest level such that `max(width, height) / 2^level`
/// fits into one tile. Images that already fit into a single tile get
/// level 0.
pub fn native_zoom_level(width: u32, height: u32, tile_size: u32) -> u8 {
    let tile_size = f64::from(tile_size.max(1));
    let mut extent = f64::from(width.max(height));
    let mut level = 0u8;
    while extent > tile_size {
        extent /= 2.0;
        level += 1;
    }
    level
}

/// Projection anchored at a fixed native zoom level.
///
/// The level never changes during a session, so converting a point and
/// converting it back is exact up to floating-point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    native_zoom: u8,
}

impl Projection {
    pub fn new(native_zoom: u8) -> Self {
        Self { native_zoom }
    }

    /// Build the projection for an image of the given size.
    pub fn for_image(width: u32, height: u32, tile_size: u32) -> Self {
        let native_zoom = native_zoom_level(width, height, tile_size);
        log::debug!(
            "🗺️ Native zoom for {}x{} (tile {}): {}",
            width,
            height,
            tile_size,
            native_zoom
        );
        Self::new(native_zoom)
    }

    pub fn native_zoom(&self) -> u8 {
        self.native_zoom
    }

    /// Pixels per display unit at the native zoom.
    pub fn scale(&self) -> f64 {
        2f64.powi(i32::from(self.native_zoom))
    }

    pub fn pixel_to_display(&self, point: PixelPoint) -> DisplayPoint {
        let scale = self.scale();
        DisplayPoint::new(-point.y / scale, point.x / scale)
    }

    pub fn display_to_pixel(&self, point: DisplayPoint) -> PixelPoint {
        let scale = self.scale();
        PixelPoint::new(point.lng * scale, -point.lat * scale)
    }

    pub fn ring_to_display(&self, ring: &[[f64; 2]]) -> Vec<DisplayPoint> {
        ring.iter()
            .map(|p| self.pixel_to_display(PixelPoint::from_position(*p)))
            .collect()
    }

    pub fn ring_to_pixel(&self, ring: &[DisplayPoint]) -> Vec<[f64; 2]> {
        ring.iter()
            .map(|p| self.display_to_pixel(*p).to_position())
            .collect()
    }

    /// Display bounds of a `width` x `height` pixel rectangle, grown by
    /// `margin` pixels on every side.
    pub fn image_bounds(&self, width: u32, height: u32, margin: f64) -> DisplayBounds {
        let south_west =
            self.pixel_to_display(PixelPoint::new(-margin, f64::from(height) + margin));
        let north_east = self.pixel_to_display(PixelPoint::new(f64::from(width) + margin, -margin));
        DisplayBounds::from_corners(south_west, north_east)
    }
}
