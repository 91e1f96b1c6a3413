//! Web-Mercator tile math and geographic-to-world conversion for the map
//! overlay.
//!
//! World layout: the model origin sits at the configured latitude/longitude,
//! +X points east, +Z points south and the map lies in the XZ plane.

use bevy::prelude::*;

use crate::constants::{MAX_TILE_ZOOM, MERCATOR_LAT_LIMIT};

/// Ground resolution at the equator for zoom 0, in meters per pixel
const EQUATOR_METERS_PER_PIXEL: f64 = 156_543.033_92;
/// Edge length of a raster tile in pixels
pub const TILE_PIXELS: u32 = 256;

/// Clamp latitude to valid Mercator projection range
pub fn clamp_latitude(lat: f64) -> f64 {
    lat.clamp(-MERCATOR_LAT_LIMIT, MERCATOR_LAT_LIMIT)
}

/// Wrap longitude into [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Fractional XYZ tile coordinates of a geographic point.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lat_rad = clamp_latitude(lat).to_radians();
    let x = (wrap_longitude(lon) + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

/// Geographic coordinates of a (possibly fractional) tile position.
pub fn tile_to_latlon(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lon = x / n * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lat, lon)
}

pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom.min(MAX_TILE_ZOOM)
}

/// Ground distance covered by one tile edge at `lat`, in meters.
pub fn tile_size_meters(lat: f64, zoom: u8) -> f64 {
    let meters_per_pixel =
        EQUATOR_METERS_PER_PIXEL * clamp_latitude(lat).to_radians().cos() / tiles_per_axis(zoom) as f64;
    meters_per_pixel * TILE_PIXELS as f64
}

/// One raster tile in the XYZ scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// The tile containing a geographic point.
    pub fn containing(lat: f64, lon: f64, zoom: u8) -> Self {
        let zoom = zoom.min(MAX_TILE_ZOOM);
        let max = tiles_per_axis(zoom) - 1;
        let (x, y) = latlon_to_tile(lat, lon, zoom);
        Self {
            zoom,
            x: (x.floor().max(0.0) as u32).min(max),
            y: (y.floor().max(0.0) as u32).min(max),
        }
    }

    /// Fill an endpoint template's `{z}`, `{x}` and `{y}` placeholders.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }

    /// File name used for this tile in the disk cache.
    pub fn cache_file_name(&self) -> String {
        format!("{}_{}_{}.tile.png", self.zoom, self.x, self.y)
    }

    /// Tiles within `radius` steps of this one, clipped to the valid range.
    /// Rows wrap in longitude; columns stop at the poles.
    pub fn neighborhood(&self, radius: u8) -> Vec<TileId> {
        let n = tiles_per_axis(self.zoom) as i64;
        let radius = (radius as i64).min(n / 2);
        let mut tiles = Vec::new();
        for dy in -radius..=radius {
            let y = self.y as i64 + dy;
            if y < 0 || y >= n {
                continue;
            }
            for dx in -radius..=radius {
                let x = (self.x as i64 + dx).rem_euclid(n);
                tiles.push(TileId {
                    zoom: self.zoom,
                    x: x as u32,
                    y: y as u32,
                });
            }
        }
        tiles
    }
}

// =============================================================================
// Coordinate Converter
// =============================================================================

/// Places tiles in world space relative to the model's geographic origin.
///
/// Tile sizes come from the ground resolution at the origin latitude, so a
/// handful of tiles around the model lines up with its real-world scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    origin_tile: (f64, f64),
    zoom: u8,
    tile_world_size: f32,
}

impl CoordinateConverter {
    pub fn new(origin_lat: f64, origin_lon: f64, zoom: u8, units_per_meter: f64) -> Self {
        let zoom = zoom.min(MAX_TILE_ZOOM);
        Self {
            origin_tile: latlon_to_tile(origin_lat, origin_lon, zoom),
            zoom,
            tile_world_size: (tile_size_meters(origin_lat, zoom) * units_per_meter) as f32,
        }
    }

    /// Edge length of one tile in world units.
    pub fn tile_world_size(&self) -> f32 {
        self.tile_world_size
    }

    /// The tile under the model origin.
    pub fn origin_tile(&self) -> TileId {
        TileId {
            zoom: self.zoom,
            x: self.origin_tile.0.floor() as u32,
            y: self.origin_tile.1.floor() as u32,
        }
    }

    /// World XZ position of a geographic point on the map plane.
    pub fn latlon_to_world(&self, lat: f64, lon: f64) -> Vec2 {
        let (x, y) = latlon_to_tile(lat, lon, self.zoom);
        self.tile_offset_to_world(x, y)
    }

    /// World XZ position of the center of a tile.
    pub fn tile_center(&self, tile: TileId) -> Vec2 {
        self.tile_offset_to_world(tile.x as f64 + 0.5, tile.y as f64 + 0.5)
    }

    fn tile_offset_to_world(&self, x: f64, y: f64) -> Vec2 {
        let dx = x - self.origin_tile.0;
        let dy = y - self.origin_tile.1;
        Vec2::new(
            (dx * self.tile_world_size as f64) as f32,
            (dy * self.tile_world_size as f64) as f32,
        )
    }
}
