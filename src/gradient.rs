//! Count-to-color gradient palettes.
//!
//! A [`Gradient`] maps overlap counts (0-255) to RGBA through an ordered
//! stop list over positions in `[0, 1]` plus a `span`: the count that maps
//! to position 1.0. Sampling computes `t = clamp(count / span, 0, 1)` and
//! interpolates linearly per channel between the bracketing stops. The
//! whole mapping is materialized once into a 256-entry lookup table.
//!
//! Count 0 always renders fully transparent so empty pixels never occlude
//! the base map, regardless of the RGB listed on the first stop.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// An RGBA color.
pub type Rgba = [u8; 4];

const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Default count mapped to the mid stop scale of custom palettes.
pub const DEFAULT_MIDPOINT: u32 = 10;

// ============================================================================
// Gradient
// ============================================================================

/// A resolved palette: overlap count in, RGBA out.
#[derive(Clone)]
pub struct Gradient {
    lut: Box<[Rgba; 256]>,
}

impl std::fmt::Debug for Gradient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gradient")
            .field("max", &self.lut[255])
            .finish()
    }
}

impl Gradient {
    /// Build a gradient from a stop list and a span.
    ///
    /// Stops are `(position, rgba)` with positions strictly increasing, the
    /// first at 0.0 and the last at 1.0. `span` is the count mapped to
    /// position 1.0 and must be at least 1.
    pub fn from_stops(stops: &[(f32, Rgba)], span: f32) -> Result<Self> {
        if stops.len() < 2 {
            return Err(RenderError::InvalidPaletteArgs {
                message: format!("need at least 2 stops, got {}", stops.len()),
            });
        }
        if stops[0].0 != 0.0 {
            return Err(RenderError::InvalidPaletteArgs {
                message: format!("first stop must sit at 0.0, got {}", stops[0].0),
            });
        }
        if stops[stops.len() - 1].0 != 1.0 {
            return Err(RenderError::InvalidPaletteArgs {
                message: format!(
                    "last stop must sit at 1.0, got {}",
                    stops[stops.len() - 1].0
                ),
            });
        }
        if stops.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(RenderError::InvalidPaletteArgs {
                message: "stop positions must be strictly increasing".to_string(),
            });
        }
        if !span.is_finite() || span < 1.0 {
            return Err(RenderError::InvalidPaletteArgs {
                message: format!("span must be >= 1, got {}", span),
            });
        }

        let mut lut = Box::new([TRANSPARENT; 256]);
        for (count, entry) in lut.iter_mut().enumerate().skip(1) {
            let t = (count as f32 / span).clamp(0.0, 1.0);
            *entry = sample_stops(stops, t);
        }

        Ok(Self { lut })
    }

    /// Custom three-color form: `t = clamp(count / midpoint, 0, 1)` over
    /// stops at 0, 0.5 and 1.
    pub fn custom(min: Rgba, mid: Rgba, max: Rgba, midpoint: u32) -> Result<Self> {
        if midpoint < 1 {
            return Err(RenderError::InvalidPaletteArgs {
                message: "midpoint must be >= 1".to_string(),
            });
        }
        Self::from_stops(&[(0.0, min), (0.5, mid), (1.0, max)], midpoint as f32)
    }

    /// Color for an overlap count.
    #[inline]
    pub fn sample(&self, count: u8) -> Rgba {
        self.lut[count as usize]
    }
}

/// Linear interpolation over the stop list at parameter `t`.
fn sample_stops(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    for w in stops.windows(2) {
        let (p0, c0) = w[0];
        let (p1, c1) = w[1];
        if t <= p1 {
            let local = (t - p0) / (p1 - p0);
            return lerp(c0, c1, local);
        }
    }
    stops[stops.len() - 1].1
}

fn lerp(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (a[i] as f32 + (b[i] as f32 - a[i] as f32) * t).round() as u8;
    }
    out
}

// ============================================================================
// Presets
// ============================================================================

/// Brand orange: dark orange fading to bright at 10 overlaps.
pub static ORANGE: Lazy<Gradient> = Lazy::new(|| {
    Gradient::from_stops(
        &[
            (0.0, TRANSPARENT),
            (0.1, [252, 74, 26, 255]),
            (1.0, [247, 183, 51, 255]),
        ],
        10.0,
    )
    .expect("preset stop list")
});

/// Semi-transparent pink ramping to white at 50 overlaps.
pub static PINKISH: Lazy<Gradient> = Lazy::new(|| {
    Gradient::from_stops(
        &[
            (0.0, TRANSPARENT),
            (0.02, [255, 177, 255, 127]),
            (0.2, [255, 177, 255, 255]),
            (1.0, [255, 255, 255, 255]),
        ],
        50.0,
    )
    .expect("preset stop list")
});

/// Blue through red to white.
pub static BLUE_RED: Lazy<Gradient> = Lazy::new(|| {
    Gradient::from_stops(
        &[
            (0.0, TRANSPARENT),
            (0.02, [63, 94, 251, 255]),
            (0.2, [252, 70, 107, 255]),
            (1.0, [255, 255, 255, 255]),
        ],
        50.0,
    )
    .expect("preset stop list")
});

/// Dark red through pale yellow to white.
pub static RED: Lazy<Gradient> = Lazy::new(|| {
    Gradient::from_stops(
        &[
            (0.0, TRANSPARENT),
            (0.02, [178, 10, 44, 255]),
            (0.2, [255, 251, 213, 255]),
            (1.0, [255, 255, 255, 255]),
        ],
        50.0,
    )
    .expect("preset stop list")
});

// ============================================================================
// Palette Specification
// ============================================================================

/// A named preset palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    Orange,
    Pinkish,
    BlueRed,
    Red,
}

impl PresetName {
    /// Parse a preset name (case-insensitive).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "orange" => Some(Self::Orange),
            "pinkish" => Some(Self::Pinkish),
            "blue_red" => Some(Self::BlueRed),
            "red" => Some(Self::Red),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orange => "orange",
            Self::Pinkish => "pinkish",
            Self::BlueRed => "blue_red",
            Self::Red => "red",
        }
    }

    fn gradient(&self) -> &'static Gradient {
        match self {
            Self::Orange => &ORANGE,
            Self::Pinkish => &PINKISH,
            Self::BlueRed => &BLUE_RED,
            Self::Red => &RED,
        }
    }
}

/// Normalized palette specification, as resolved from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    Preset(PresetName),
    Custom {
        min: Rgba,
        mid: Rgba,
        max: Rgba,
        midpoint: u32,
    },
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Preset(PresetName::Orange)
    }
}

impl Palette {
    /// Resolve the specification into a sampling gradient.
    pub fn gradient(&self) -> Result<Gradient> {
        match self {
            Palette::Preset(name) => Ok(name.gradient().clone()),
            Palette::Custom {
                min,
                mid,
                max,
                midpoint,
            } => Gradient::custom(*min, *mid, *max, *midpoint),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
