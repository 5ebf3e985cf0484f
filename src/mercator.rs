//! Web Mercator tile geometry in world-pixel space.
//!
//! At zoom `z` the world is a square of `2^z * TILE_SIZE` pixels. A tile
//! `(z, x, y)` covers the world-pixel rectangle with origin
//! `(x * TILE_SIZE, y * TILE_SIZE)`; the origin is top-left and `y`
//! increases southward.
//!
//! Integer pixels are obtained by rounding half away from zero in *world*
//! coordinates and only then localizing to the tile, so a point on a shared
//! tile edge maps to the same world column on both neighbors.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::{GeoBounds, LngLat};

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 512;

/// Highest supported zoom level.
pub const MAX_ZOOM: u8 = 22;

/// World edge length in pixels at a zoom level.
#[inline]
fn world_size(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32) * TILE_SIZE as f64
}

/// Project a coordinate to world pixels at the given zoom.
///
/// Returns `None` for non-finite input or latitudes at or beyond the poles,
/// where the projection is undefined. Callers drop such points; the
/// rasterizer's adjacency rule keeps the resulting gap from being bridged.
#[inline]
pub fn lnglat_to_world_px(lng: f64, lat: f64, zoom: u8) -> Option<(f64, f64)> {
    if !lng.is_finite() || !lat.is_finite() || lat <= -90.0 || lat >= 90.0 {
        return None;
    }
    let n = world_size(zoom);
    let lat_rad = lat.to_radians();
    let px = (lng + 180.0) / 360.0 * n;
    let py = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    Some((px, py))
}

/// Inverse projection from world pixels back to longitude/latitude.
#[inline]
pub fn world_px_to_lnglat(px: f64, py: f64, zoom: u8) -> LngLat {
    let n = world_size(zoom);
    let lng = px / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * py / n)).sinh().atan();
    LngLat::new(lng, lat_rad.to_degrees())
}

/// A slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Create a validated tile address.
    ///
    /// Fails with `InvalidTileAddress` when `z > 22` or `x`/`y` fall outside
    /// the `2^z` grid.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self> {
        if z > MAX_ZOOM {
            return Err(RenderError::InvalidTileAddress { z, x, y });
        }
        let max = 1u32 << z;
        if x >= max || y >= max {
            return Err(RenderError::InvalidTileAddress { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// World-pixel bounds of this tile.
    pub fn pixel_bounds(&self) -> PixelRect {
        let min_x = self.x as f64 * TILE_SIZE as f64;
        let min_y = self.y as f64 * TILE_SIZE as f64;
        PixelRect {
            min_x,
            min_y,
            max_x: min_x + TILE_SIZE as f64,
            max_y: min_y + TILE_SIZE as f64,
        }
    }

    /// Geographic bounds of this tile.
    pub fn geo_bounds(&self) -> GeoBounds {
        let rect = self.pixel_bounds();
        // North edge is min_y: world-pixel y grows southward.
        let nw = world_px_to_lnglat(rect.min_x, rect.min_y, self.z);
        let se = world_px_to_lnglat(rect.max_x, rect.max_y, self.z);
        GeoBounds {
            min_lat: se.lat,
            max_lat: nw.lat,
            min_lng: nw.lng,
            max_lng: se.lng,
        }
    }
}

/// Axis-aligned rectangle in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl PixelRect {
    /// Grow the rectangle by `margin` pixels on every side.
    pub fn expand(&self, margin: f64) -> PixelRect {
        PixelRect {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// A projected GPS sample in world pixels, carrying the index the sample
/// held in its source track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub index: usize,
}

/// Project a track to world pixels, preserving original indices.
///
/// Points the projection rejects are dropped; their indices are simply
/// absent from the output, which downstream adjacency checks observe.
pub fn project_track(points: &[LngLat], zoom: u8) -> Vec<ProjectedPoint> {
    points
        .iter()
        .enumerate()
        .filter_map(|(index, p)| {
            lnglat_to_world_px(p.lng, p.lat, zoom).map(|(x, y)| ProjectedPoint { x, y, index })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_px_origin_and_center() {
        // Null island sits at the center of the world square.
        let (px, py) = lnglat_to_world_px(0.0, 0.0, 0).unwrap();
        assert!((px - 256.0).abs() < 1e-9);
        assert!((py - 256.0).abs() < 1e-9);

        let (px, py) = lnglat_to_world_px(0.0, 0.0, 1).unwrap();
        assert!((px - 512.0).abs() < 1e-9);
        assert!((py - 512.0).abs() < 1e-9);

        // The west edge of the world.
        let (px, _) = lnglat_to_world_px(-180.0, 0.0, 3).unwrap();
        assert!(px.abs() < 1e-9);
    }

    #[test]
    fn test_projection_rejects_poles() {
        assert!(lnglat_to_world_px(0.0, 90.0, 5).is_none());
        assert!(lnglat_to_world_px(0.0, -90.0, 5).is_none());
        assert!(lnglat_to_world_px(f64::NAN, 0.0, 5).is_none());
        assert!(lnglat_to_world_px(0.0, f64::INFINITY, 5).is_none());
    }

    #[test]
    fn test_roundtrip_within_half_pixel() {
        let samples = [
            (-0.1278, 51.5074),
            (-118.2437, 34.0522),
            (151.2093, -33.8688),
            (0.0, 0.0),
            (-179.9, 84.9),
            (179.9, -84.9),
        ];
        for zoom in [0u8, 5, 12, 18, 22] {
            for &(lng, lat) in &samples {
                let (px, py) = lnglat_to_world_px(lng, lat, zoom).unwrap();
                let back = world_px_to_lnglat(px, py, zoom);
                let (px2, py2) = lnglat_to_world_px(back.lng, back.lat, zoom).unwrap();
                assert!(
                    (px - px2).abs() < 0.5 && (py - py2).abs() < 0.5,
                    "roundtrip drifted at z={} for ({}, {})",
                    zoom,
                    lng,
                    lat
                );
            }
        }
    }

    #[test]
    fn test_tile_coord_validation() {
        assert!(TileCoord::new(0, 0, 0).is_ok());
        assert!(TileCoord::new(22, (1 << 22) - 1, 0).is_ok());
        assert!(matches!(
            TileCoord::new(23, 0, 0),
            Err(RenderError::InvalidTileAddress { .. })
        ));
        assert!(matches!(
            TileCoord::new(3, 8, 0),
            Err(RenderError::InvalidTileAddress { .. })
        ));
        assert!(matches!(
            TileCoord::new(0, 0, 1),
            Err(RenderError::InvalidTileAddress { .. })
        ));
    }

    #[test]
    fn test_pixel_bounds() {
        let coord = TileCoord::new(2, 1, 3).unwrap();
        let rect = coord.pixel_bounds();
        assert_eq!(rect.min_x, 512.0);
        assert_eq!(rect.min_y, 1536.0);
        assert_eq!(rect.max_x, 1024.0);
        assert_eq!(rect.max_y, 2048.0);
    }

    #[test]
    fn test_geo_bounds_of_world_tile() {
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let bounds = coord.geo_bounds();
        assert!((bounds.min_lng - (-180.0)).abs() < 1e-9);
        assert!((bounds.max_lng - 180.0).abs() < 1e-9);
        // Mercator world square spans +/- ~85.0511 degrees
        assert!((bounds.max_lat - 85.0511).abs() < 0.001);
        assert!((bounds.min_lat + 85.0511).abs() < 0.001);
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        let a = TileCoord::new(10, 100, 200).unwrap();
        let b = TileCoord::new(10, 101, 200).unwrap();
        assert_eq!(a.pixel_bounds().max_x, b.pixel_bounds().min_x);

        let ga = a.geo_bounds();
        let gb = b.geo_bounds();
        assert!((ga.max_lng - gb.min_lng).abs() < 1e-12);
    }

    #[test]
    fn test_project_track_keeps_indices() {
        let points = vec![
            LngLat::new(0.0, 0.0),
            LngLat::new(0.0, 90.0), // rejected
            LngLat::new(0.001, 0.001),
        ];
        let projected = project_track(&points, 10);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected[0].index, 0);
        assert_eq!(projected[1].index, 2);
    }
}
