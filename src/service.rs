//! Owned tile service facade.
//!
//! [`TileService`] wires the cache, the activity provider and the render
//! configuration into one value owned by the embedding server and shared
//! by reference across request handlers. There are no process globals: two
//! services are two fully independent caches.
//!
//! The cache mutex guards only map lookups and bookkeeping; it is never
//! held across a provider query or a render.

use std::sync::{Arc, Mutex};

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::cache::{CacheStats, TileCache, TileKey};
use crate::error::Result;
use crate::gradient::Palette;
use crate::mercator::TileCoord;
use crate::provider::{ActivityFilter, ActivityProvider};
use crate::render::{self, RenderConfig, RenderStats};

/// Whether a response was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Header-friendly form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// One served tile.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// Encoded PNG, shared with the cache.
    pub png: Arc<Vec<u8>>,
    pub cache: CacheStatus,
    /// Render counters; `None` when served from cache.
    pub stats: Option<RenderStats>,
}

/// Tile rendering service owning the cache and the activity provider.
pub struct TileService<P> {
    provider: P,
    cache: Mutex<TileCache>,
    config: RenderConfig,
}

impl<P: ActivityProvider> TileService<P> {
    pub fn new(provider: P, config: RenderConfig) -> Self {
        Self {
            provider,
            cache: Mutex::new(TileCache::new(config.cache_capacity)),
            config,
        }
    }

    /// Serve one tile, from cache when possible.
    ///
    /// Concurrent misses for the same key each render independently and
    /// produce byte-identical PNGs; the last insert wins.
    pub fn render_tile(
        &self,
        coord: TileCoord,
        palette: &Palette,
        filter: &ActivityFilter,
    ) -> Result<TileResponse> {
        let key = TileKey::new(coord, palette, filter);

        if let Some(png) = self.cache.lock().unwrap().get(&key) {
            return Ok(TileResponse {
                png,
                cache: CacheStatus::Hit,
                stats: None,
            });
        }

        let gradient = palette.gradient()?;
        let rendered = render::render_tile(&self.provider, coord, &gradient, filter, &self.config)?;

        let png = Arc::new(rendered.png);
        self.cache.lock().unwrap().put(key, Arc::clone(&png));

        Ok(TileResponse {
            png,
            cache: CacheStatus::Miss,
            stats: Some(rendered.stats),
        })
    }

    /// Render a batch of tiles in parallel on the rayon pool.
    ///
    /// Tiles are independent; ordering of results matches the input.
    pub fn render_many(
        &self,
        requests: &[(TileCoord, Palette, ActivityFilter)],
    ) -> Vec<Result<TileResponse>> {
        requests
            .par_iter()
            .map(|(coord, palette, filter)| self.render_tile(*coord, palette, filter))
            .collect()
    }

    /// Drop every cached tile, reporting how many were removed.
    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.lock().unwrap().clear();
        info!("tile cache cleared: {} entries removed", removed);
        removed
    }

    /// Snapshot of cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().unwrap().stats()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

// ============================================================================
// Tests
// ============================================================================
