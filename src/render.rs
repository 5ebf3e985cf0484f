//! One-tile rendering pipeline.
//!
//! `render_tile` orchestrates the full pass for a single tile: spatial
//! prefilter against the provider, polyline decode, projection, overlap
//! rasterization, gradient colorize, PNG encode. Per-activity failures are
//! logged and skipped; the tile still renders. Per-tile failures (provider
//! down, deadline expired, encoder error) abort the render.

use std::io::Cursor;
use std::time::{Duration, Instant};

use image::{ImageBuffer, Rgba, RgbaImage};
use log::{debug, warn};

use crate::error::{RenderError, Result};
use crate::gradient::Gradient;
use crate::mercator::{project_track, TileCoord, TILE_SIZE};
use crate::provider::{ActivityFilter, ActivityProvider};
use crate::raster::{OverlapGrid, TileRaster};
use crate::{cache, polyline};

/// Tuning knobs for the render pipeline and its cache.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Tile cache capacity in bytes.
    pub cache_capacity: usize,
    /// Fraction by which the tile's geographic bounds are inflated for the
    /// activity prefilter query.
    pub prefilter_margin: f64,
    /// Wall-clock budget for a single tile render. Checked between
    /// activities; a render is never interrupted mid-raster.
    pub tile_deadline: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: cache::DEFAULT_CACHE_CAPACITY,
            prefilter_margin: 0.1,
            tile_deadline: Duration::from_secs(30),
        }
    }
}

/// Counters from one tile render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Activities the provider returned for the inflated tile bounds.
    pub activities_total: usize,
    /// Activities that decoded and contributed to the raster.
    pub activities_rendered: usize,
}

/// A freshly rendered tile.
#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub png: Vec<u8>,
    pub stats: RenderStats,
}

/// Render one tile from scratch.
pub fn render_tile<P: ActivityProvider + ?Sized>(
    provider: &P,
    coord: TileCoord,
    gradient: &Gradient,
    filter: &ActivityFilter,
    config: &RenderConfig,
) -> Result<RenderedTile> {
    let query_bounds = coord.geo_bounds().inflate(config.prefilter_margin);
    let activities = provider.query(filter, &query_bounds)?;

    let started = Instant::now();
    let mut raster = TileRaster::new(coord);
    let mut total = 0usize;
    let mut rendered = 0usize;

    for activity in activities {
        let elapsed = started.elapsed();
        if elapsed > config.tile_deadline {
            return Err(RenderError::RenderTimeout {
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }

        total += 1;
        if !activity.bounds.intersects(&query_bounds) {
            continue;
        }

        let track = match polyline::decode(&activity.polyline)
            .map_err(|err| err.for_activity(&activity.id))
        {
            Ok(track) => track,
            Err(err) => {
                warn!("skipping activity: {}", err);
                continue;
            }
        };

        let projected = project_track(&track, coord.z);
        if projected.len() < 2 {
            continue;
        }

        raster.draw_polyline(&projected);
        rendered += 1;
    }

    let png = encode_png(raster.grid(), gradient)?;

    debug!(
        "rendered tile {}/{}/{}: {} of {} activities, {} bytes",
        coord.z,
        coord.x,
        coord.y,
        rendered,
        total,
        png.len()
    );

    Ok(RenderedTile {
        png,
        stats: RenderStats {
            activities_total: total,
            activities_rendered: rendered,
        },
    })
}

/// Colorize an overlap grid through the gradient and encode it as PNG.
pub fn encode_png(grid: &OverlapGrid, gradient: &Gradient) -> Result<Vec<u8>> {
    let img: RgbaImage =
        ImageBuffer::from_fn(TILE_SIZE, TILE_SIZE, |x, y| Rgba(gradient.sample(grid.get(x, y))));

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|err| RenderError::EncodeFailure {
            message: err.to_string(),
        })?;
    Ok(png)
}

// ============================================================================
// Tests
// ============================================================================
