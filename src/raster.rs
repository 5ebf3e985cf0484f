//! Overlap-count line rasterization onto a tile grid.
//!
//! A [`TileRaster`] consumes the projected points of one track at a time and
//! stamps a [`OverlapGrid`] of saturating `u8` counters: the count at a
//! pixel is the number of drawn segments that covered it, clipped to 255.
//!
//! Two rules keep tiles honest:
//! - a segment is drawn only between points whose original indices are
//!   consecutive, so samples dropped by projection or prefiltering never
//!   get bridged by a spurious line;
//! - clipping happens against the tile rectangle expanded by one pixel and
//!   endpoints are rounded in world coordinates, so adjacent tiles agree on
//!   the pixels of a shared boundary crossing.

use crate::clip::clip_segment;
use crate::mercator::{PixelRect, ProjectedPoint, TileCoord, TILE_SIZE};

/// Margin added to the tile rectangle before clipping, in pixels.
const CLIP_MARGIN: f64 = 1.0;

/// A `TILE_SIZE x TILE_SIZE` grid of saturating overlap counters.
#[derive(Debug, Clone)]
pub struct OverlapGrid {
    counts: Vec<u8>,
}

impl OverlapGrid {
    pub fn new() -> Self {
        Self {
            counts: vec![0u8; (TILE_SIZE * TILE_SIZE) as usize],
        }
    }

    /// Count at local pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.counts[(y * TILE_SIZE + x) as usize]
    }

    /// Increment the counter at `(x, y)`, saturating at 255. Coordinates
    /// outside the grid are ignored.
    #[inline]
    pub fn stamp(&mut self, x: i64, y: i64) {
        if x < 0 || y < 0 || x >= TILE_SIZE as i64 || y >= TILE_SIZE as i64 {
            return;
        }
        let cell = &mut self.counts[(y * TILE_SIZE as i64 + x) as usize];
        *cell = cell.saturating_add(1);
    }

    /// Raw row-major counters.
    pub fn counts(&self) -> &[u8] {
        &self.counts
    }

    /// Number of pixels with a non-zero count.
    pub fn lit_pixels(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }
}

impl Default for OverlapGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterizes polylines onto the overlap grid of one tile.
#[derive(Debug)]
pub struct TileRaster {
    clip_rect: PixelRect,
    origin_x: i64,
    origin_y: i64,
    grid: OverlapGrid,
}

impl TileRaster {
    pub fn new(coord: TileCoord) -> Self {
        let bounds = coord.pixel_bounds();
        Self {
            clip_rect: bounds.expand(CLIP_MARGIN),
            origin_x: bounds.min_x as i64,
            origin_y: bounds.min_y as i64,
            grid: OverlapGrid::new(),
        }
    }

    /// Draw one track's projected points.
    ///
    /// Walks consecutive pairs in input order and draws a segment only when
    /// the original indices are exactly adjacent (`i1 - i0 == 1`). Points
    /// whose segment falls outside the expanded tile rectangle are skipped
    /// by the clipper.
    pub fn draw_polyline(&mut self, points: &[ProjectedPoint]) {
        for pair in points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if b.index != a.index + 1 {
                continue;
            }
            if let Some((c0, c1)) = clip_segment(&self.clip_rect, (a.x, a.y), (b.x, b.y)) {
                self.draw_segment(c0, c1);
            }
        }
    }

    /// Access the overlap grid.
    pub fn grid(&self) -> &OverlapGrid {
        &self.grid
    }

    /// Consume the raster and return the grid.
    pub fn into_grid(self) -> OverlapGrid {
        self.grid
    }

    fn draw_segment(&mut self, p0: (f64, f64), p1: (f64, f64)) {
        // Round in world coordinates, then localize.
        let x0 = p0.0.round() as i64 - self.origin_x;
        let y0 = p0.1.round() as i64 - self.origin_y;
        let x1 = p1.0.round() as i64 - self.origin_x;
        let y1 = p1.1.round() as i64 - self.origin_y;

        // A segment collapsing to a single pixel stamps nothing: it carries
        // no direction and would double-count against its neighbors.
        if x0 == x1 && y0 == y1 {
            return;
        }

        self.stamp_line(x0, y0, x1, y1);
    }

    /// Bresenham walk from `(x0, y0)` to `(x1, y1)` inclusive, stamping
    /// every visited pixel that lies inside the grid.
    fn stamp_line(&mut self, mut x: i64, mut y: i64, x1: i64, y1: i64) {
        let dx = (x1 - x).abs();
        let dy = (y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            self.grid.stamp(x, y);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercator::TILE_SIZE;

    const T: u32 = TILE_SIZE;

    /// Raster for tile (z=1, x=0, y=0): world pixels equal local pixels.
    fn origin_raster() -> TileRaster {
        TileRaster::new(TileCoord::new(1, 0, 0).unwrap())
    }

    fn pt(x: f64, y: f64, index: usize) -> ProjectedPoint {
        ProjectedPoint { x, y, index }
    }

    #[test]
    fn test_diagonal_line_lights_every_pixel_once() {
        let mut raster = origin_raster();
        raster.draw_polyline(&[pt(0.0, 0.0, 0), pt(511.0, 511.0, 1)]);

        let grid = raster.grid();
        assert_eq!(grid.lit_pixels(), T as usize);
        for i in 0..T {
            assert_eq!(grid.get(i, i), 1, "diagonal pixel ({}, {})", i, i);
        }
    }

    #[test]
    fn test_adjacency_rule_skips_index_gaps() {
        // Indices {0, 1, 2, 4, 5}: 3 was dropped upstream. Segments (0,1),
        // (1,2), (4,5) draw; nothing bridges 2 -> 4.
        let mut raster = origin_raster();
        raster.draw_polyline(&[
            pt(0.0, 0.0, 0),
            pt(10.0, 0.0, 1),
            pt(20.0, 0.0, 2),
            pt(200.0, 0.0, 4),
            pt(210.0, 0.0, 5),
        ]);

        let grid = raster.grid();
        for x in 0..=20 {
            assert!(grid.get(x, 0) > 0, "x={}", x);
        }
        for x in 21..200 {
            assert_eq!(grid.get(x, 0), 0, "gap must stay unlit at x={}", x);
        }
        for x in 200..=210 {
            assert!(grid.get(x, 0) > 0, "x={}", x);
        }
        // The shared vertex of two consecutive segments is stamped by both.
        assert_eq!(grid.get(10, 0), 2);
    }

    #[test]
    fn test_prefilter_drop_never_bridged() {
        // Track [(0,0), (10,10), (20,20), (500,500)] with (20,20) missing
        // from the projected input: only (0,0)-(10,10) may draw.
        let mut raster = origin_raster();
        raster.draw_polyline(&[
            pt(0.0, 0.0, 0),
            pt(10.0, 10.0, 1),
            pt(500.0, 500.0, 3),
        ]);

        let grid = raster.grid();
        for i in 0..=10 {
            assert_eq!(grid.get(i, i), 1);
        }
        for i in 11..=500 {
            assert_eq!(grid.get(i, i), 0, "no segment may reach ({}, {})", i, i);
        }
    }

    #[test]
    fn test_overlap_counts_accumulate() {
        let mut raster = origin_raster();
        let track = [pt(0.0, 100.0, 0), pt(511.0, 100.0, 1)];
        raster.draw_polyline(&track);
        raster.draw_polyline(&track);

        let grid = raster.grid();
        for x in 0..T {
            assert_eq!(grid.get(x, 100), 2);
        }
    }

    #[test]
    fn test_saturation_at_255() {
        let mut raster = origin_raster();
        let track = [pt(0.0, 7.0, 0), pt(50.0, 7.0, 1)];
        for _ in 0..300 {
            raster.draw_polyline(&track);
        }

        let grid = raster.grid();
        for x in 0..=50 {
            assert_eq!(grid.get(x, 7), 255);
        }
        assert_eq!(grid.get(51, 7), 0);
    }

    #[test]
    fn test_total_mass_matches_contributions() {
        // Stamp a pixel k times via k single segments; count == min(k, 255).
        for k in [1usize, 17, 254, 255, 256, 400] {
            let mut raster = origin_raster();
            for _ in 0..k {
                raster.draw_polyline(&[pt(3.0, 3.0, 0), pt(4.0, 3.0, 1)]);
            }
            let expected = k.min(255) as u8;
            assert_eq!(raster.grid().get(3, 3), expected, "k={}", k);
            assert_eq!(raster.grid().get(4, 3), expected, "k={}", k);
        }
    }

    #[test]
    fn test_draw_order_does_not_change_counts() {
        let tracks = [
            [pt(0.0, 0.0, 0), pt(511.0, 511.0, 1)],
            [pt(0.0, 511.0, 0), pt(511.0, 0.0, 1)],
            [pt(0.0, 100.0, 0), pt(511.0, 100.0, 1)],
        ];

        let mut forward = origin_raster();
        for t in &tracks {
            forward.draw_polyline(t);
        }
        let mut reverse = origin_raster();
        for t in tracks.iter().rev() {
            reverse.draw_polyline(t);
        }

        assert_eq!(forward.grid().counts(), reverse.grid().counts());
    }

    #[test]
    fn test_degenerate_segment_stamps_nothing() {
        let mut raster = origin_raster();
        raster.draw_polyline(&[pt(5.2, 5.2, 0), pt(5.4, 5.3, 1)]);
        assert_eq!(raster.grid().lit_pixels(), 0);
    }

    #[test]
    fn test_segment_outside_tile_rejected() {
        let mut raster = origin_raster();
        raster.draw_polyline(&[pt(600.0, 10.0, 0), pt(700.0, 20.0, 1)]);
        assert_eq!(raster.grid().lit_pixels(), 0);
    }

    #[test]
    fn test_seam_horizontal_crossing() {
        // A horizontal segment crossing the vertical edge between (5,10,10)
        // and (5,11,10). The lit rows on the facing boundary columns of the
        // two tiles must be identical.
        let a = TileCoord::new(5, 10, 10).unwrap();
        let b = TileCoord::new(5, 11, 10).unwrap();
        let edge_x = a.pixel_bounds().max_x;
        let y = a.pixel_bounds().min_y + 77.3;

        let track = [
            pt(edge_x - 40.0, y, 0),
            pt(edge_x + 40.0, y, 1),
        ];

        let mut raster_a = TileRaster::new(a);
        raster_a.draw_polyline(&track);
        let mut raster_b = TileRaster::new(b);
        raster_b.draw_polyline(&track);

        let rows_a: Vec<u32> = (0..T)
            .filter(|&v| raster_a.grid().get(T - 1, v) > 0)
            .collect();
        let rows_b: Vec<u32> = (0..T)
            .filter(|&v| raster_b.grid().get(0, v) > 0)
            .collect();
        assert!(!rows_a.is_empty());
        assert_eq!(rows_a, rows_b);
    }

    #[test]
    fn test_seam_vertical_crossing() {
        let a = TileCoord::new(5, 10, 10).unwrap();
        let b = TileCoord::new(5, 10, 11).unwrap();
        let edge_y = a.pixel_bounds().max_y;
        let x = a.pixel_bounds().min_x + 123.6;

        let track = [
            pt(x, edge_y - 25.0, 0),
            pt(x, edge_y + 25.0, 1),
        ];

        let mut raster_a = TileRaster::new(a);
        raster_a.draw_polyline(&track);
        let mut raster_b = TileRaster::new(b);
        raster_b.draw_polyline(&track);

        let cols_a: Vec<u32> = (0..T)
            .filter(|&u| raster_a.grid().get(u, T - 1) > 0)
            .collect();
        let cols_b: Vec<u32> = (0..T)
            .filter(|&u| raster_b.grid().get(u, 0) > 0)
            .collect();
        assert!(!cols_a.is_empty());
        assert_eq!(cols_a, cols_b);
    }

    #[test]
    fn test_seam_diagonal_continuity() {
        // A diagonal crossing must produce an 8-connected joint: the last
        // lit pixel of tile A and the first lit pixel of tile B differ by
        // at most one row.
        let a = TileCoord::new(5, 10, 10).unwrap();
        let b = TileCoord::new(5, 11, 10).unwrap();
        let edge_x = a.pixel_bounds().max_x;
        let y = a.pixel_bounds().min_y + 200.0;

        let track = [
            pt(edge_x - 30.0, y - 30.0, 0),
            pt(edge_x + 30.0, y + 30.0, 1),
        ];

        let mut raster_a = TileRaster::new(a);
        raster_a.draw_polyline(&track);
        let mut raster_b = TileRaster::new(b);
        raster_b.draw_polyline(&track);

        let rows_a: Vec<u32> = (0..T)
            .filter(|&v| raster_a.grid().get(T - 1, v) > 0)
            .collect();
        let rows_b: Vec<u32> = (0..T)
            .filter(|&v| raster_b.grid().get(0, v) > 0)
            .collect();
        assert!(!rows_a.is_empty());
        assert!(!rows_b.is_empty());

        let last_a = *rows_a.last().unwrap() as i64;
        let first_b = rows_b[0] as i64;
        assert!(
            (last_a - first_b).abs() <= 1,
            "seam gap: tile A row {} vs tile B row {}",
            last_a,
            first_b
        );
    }
}
