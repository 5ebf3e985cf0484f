//! # Trackrender
//!
//! Overlap-weighted raster tile rendering for GPS activity heatmaps.
//!
//! This library provides:
//! - Google polyline decoding/encoding
//! - Web Mercator tile geometry in world-pixel space
//! - Overlap-count line rasterization with seam-consistent clipping
//! - Gradient palettes mapping overlap counts to RGBA
//! - A bounded in-memory tile cache with FIFO eviction
//!
//! Tiles are 512x512 RGBA PNGs addressed by standard slippy-map Z/X/Y
//! coordinates. Per-pixel brightness encodes how many tracks pass through
//! that pixel.
//!
//! ## Quick Start
//!
//! ```rust
//! use trackrender::{ActivityFilter, InMemoryProvider, Palette, RenderConfig,
//!                   TileCoord, TileService};
//!
//! let provider = InMemoryProvider::new(vec![]);
//! let service = TileService::new(provider, RenderConfig::default());
//!
//! let coord = TileCoord::new(12, 656, 1582).unwrap();
//! let tile = service
//!     .render_tile(coord, &Palette::default(), &ActivityFilter::default())
//!     .unwrap();
//!
//! // An empty corpus still renders: a fully transparent PNG.
//! assert_eq!(&tile.png[0..4], &[0x89, 0x50, 0x4E, 0x47]);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{RenderError, Result};

// Google polyline codec
pub mod polyline;

// Web Mercator tile geometry (world-pixel space)
pub mod mercator;
pub use mercator::{ProjectedPoint, TileCoord, MAX_ZOOM, TILE_SIZE};

// Cohen-Sutherland segment clipping
pub mod clip;

// Overlap-grid line rasterization
pub mod raster;
pub use raster::{OverlapGrid, TileRaster};

// Count-to-color gradient palettes
pub mod gradient;
pub use gradient::{Gradient, Palette, PresetName, Rgba};

// Bounded tile cache
pub mod cache;
pub use cache::{CacheStats, TileCache, TileKey};

// Activity source port and in-memory implementation
pub mod provider;
pub use provider::{Activity, ActivityFilter, ActivityProvider, InMemoryProvider};

// One-tile rendering pipeline
pub mod render;
pub use render::{RenderConfig, RenderStats};

// Owned service facade (cache + provider + config)
pub mod service;
pub use service::{CacheStatus, TileResponse, TileService};

// Request parameter parsing and normalization
pub mod request;
pub use request::TileQuery;

// ============================================================================
// Core Types
// ============================================================================

/// A geodetic coordinate, longitude first to match the tile geometry.
///
/// # Example
/// ```
/// use trackrender::LngLat;
/// let point = LngLat::new(-0.1278, 51.5074); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    /// Create a new coordinate.
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Check that the coordinate is finite and within WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    /// Create bounds from coordinates.
    pub fn from_points(points: &[LngLat]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Axis-aligned intersection test, boundary inclusive.
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        self.min_lng <= other.max_lng
            && self.max_lng >= other.min_lng
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Grow the box by `fraction` of its width/height on each side.
    pub fn inflate(&self, fraction: f64) -> GeoBounds {
        let dlng = (self.max_lng - self.min_lng) * fraction;
        let dlat = (self.max_lat - self.min_lat) * fraction;
        GeoBounds {
            min_lat: self.min_lat - dlat,
            max_lat: self.max_lat + dlat,
            min_lng: self.min_lng - dlng,
            max_lng: self.max_lng + dlng,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
