//! Tile addressing for the image pyramid served by the tile service.
//!
//! Tiles are addressed as `{z}/{y}/{x}` below a per-image base URL. Only
//! tiles overlapping the image extent exist; at the native zoom a tile
//! covers `tile_size` x `tile_size` image pixels, and every level below
//! halves the resolution.

use serde::{Deserialize, Serialize};

use crate::projection::{DisplayBounds, Projection};

/// Address of one tile in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Tile layer description for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    url_template: String,
    tile_size: u32,
    image_width: u32,
    image_height: u32,
    projection: Projection,
}

impl TileSource {
    /// Create the tile source for image `image_id` served below `api_url`.
    pub fn new(api_url: &str, image_id: &str, image_width: u32, image_height: u32, tile_size: u32) -> Self {
        let url_template = format!(
            "{}/api/images/{}/tiles/{{z}}/{{y}}/{{x}}",
            api_url.trim_end_matches('/'),
            image_id
        );
        Self {
            url_template,
            tile_size,
            image_width,
            image_height,
            projection: Projection::for_image(image_width, image_height, tile_size),
        }
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Highest zoom with real tiles; deeper zooms upscale these.
    pub fn max_native_zoom(&self) -> u8 {
        self.projection.native_zoom()
    }

    /// Concrete URL of one tile.
    pub fn tile_url(&self, coord: TileCoord) -> String {
        self.url_template
            .replace("{z}", &coord.z.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{x}", &coord.x.to_string())
    }

    /// Number of tile columns and rows at zoom `z`.
    ///
    /// Zooms above the native zoom are clamped to it, since no finer tiles
    /// exist.
    pub fn grid_size(&self, z: u8) -> (u32, u32) {
        let z = z.min(self.max_native_zoom());
        let shift = self.max_native_zoom() - z;
        let level_scale = 2f64.powi(i32::from(shift));
        let tile = f64::from(self.tile_size.max(1));
        let cols = (f64::from(self.image_width) / level_scale / tile).ceil() as u32;
        let rows = (f64::from(self.image_height) / level_scale / tile).ceil() as u32;
        (cols.max(1), rows.max(1))
    }

    /// Every tile that exists at zoom `z`, row-major.
    pub fn tiles_at_zoom(&self, z: u8) -> Vec<TileCoord> {
        let z = z.min(self.max_native_zoom());
        let (cols, rows) = self.grid_size(z);
        let mut tiles = Vec::with_capacity((cols * rows) as usize);
        for y in 0..rows {
            for x in 0..cols {
                tiles.push(TileCoord::new(z, x, y));
            }
        }
        tiles
    }

    /// Display bounds of the image itself; tiles outside are never requested.
    pub fn image_bounds(&self) -> DisplayBounds {
        self.projection
            .image_bounds(self.image_width, self.image_height, 0.0)
    }

    /// Display bounds the viewport may pan within: the image extent plus
    /// `offset_tiles` tiles of slack on every side.
    pub fn max_bounds(&self, offset_tiles: u32) -> DisplayBounds {
        let margin = f64::from(self.tile_size) * f64::from(offset_tiles);
        self.projection
            .image_bounds(self.image_width, self.image_height, margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url() {
        let source = TileSource::new("http://localhost:3000/", "img-1", 1000, 600, 128);
        assert_eq!(
            source.url_template(),
            "http://localhost:3000/api/images/img-1/tiles/{z}/{y}/{x}"
        );
        assert_eq!(
            source.tile_url(TileCoord::new(3, 5, 2)),
            "http://localhost:3000/api/images/img-1/tiles/3/2/5"
        );
    }

    #[test]
    fn test_grid_size_per_level() {
        // 1000 px -> native zoom 3 (1000/8 = 125 <= 128)
        let source = TileSource::new("", "a", 1000, 600, 128);
        assert_eq!(source.max_native_zoom(), 3);
        assert_eq!(source.grid_size(3), (8, 5));
        assert_eq!(source.grid_size(2), (4, 3));
        assert_eq!(source.grid_size(0), (1, 1));
        // Above native zoom is clamped.
        assert_eq!(source.grid_size(7), (8, 5));
    }

    #[test]
    fn test_grid_size_deep_pyramid() {
        let source = TileSource::new("", "a", u32::MAX, 1, 1);
        assert_eq!(source.max_native_zoom(), 32);
        assert_eq!(source.grid_size(0), (1, 1));
        assert_eq!(source.grid_size(1), (2, 1));
        assert_eq!(source.grid_size(32), (u32::MAX, 1));
    }

    #[test]
    fn test_tiles_at_zoom() {
        let source = TileSource::new("", "a", 300, 100, 128);
        let tiles = source.tiles_at_zoom(source.max_native_zoom());
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0], TileCoord::new(2, 0, 0));
        assert_eq!(tiles[2], TileCoord::new(2, 2, 0));
    }

    #[test]
    fn test_max_bounds_wider_than_image() {
        let source = TileSource::new("", "a", 1000, 600, 128);
        let image = source.image_bounds();
        let max = source.max_bounds(20);
        assert!(max.contains(image.south_west));
        assert!(max.contains(image.north_east));
        assert!(max.south_west.lng < image.south_west.lng);
        assert!(max.north_east.lat > image.north_east.lat);
    }
}
