//! Request parameter parsing and normalization.
//!
//! The HTTP layer lives outside this crate; it deserializes the tile
//! endpoint's query string into a [`TileQuery`] and resolves it here.
//! Normalization happens exactly once, at parse time: the resolved
//! [`Palette`] and [`ActivityFilter`] are what the renderer and the cache
//! key both see.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::gradient::{Palette, PresetName, Rgba, DEFAULT_MIDPOINT};
use crate::provider::ActivityFilter;

/// Query parameters of the tile endpoint, all optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TileQuery {
    /// Preset palette name.
    pub gradient: Option<String>,
    /// Custom palette colors; all three must be present to take effect.
    pub min_color: Option<String>,
    pub mid_color: Option<String>,
    pub max_color: Option<String>,
    /// Count mapped to the top of a custom palette.
    pub midpoint: Option<u32>,
    /// Filter to one activity type.
    pub activity_type: Option<String>,
    /// Inclusive ISO-8601 date range.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl TileQuery {
    /// Resolve the raw parameters into a normalized palette and filter.
    pub fn resolve(&self) -> Result<(Palette, ActivityFilter)> {
        Ok((self.palette()?, self.filter()?))
    }

    /// Palette selection: custom colors override the preset when all three
    /// are present; otherwise the named preset applies, defaulting to
    /// orange.
    pub fn palette(&self) -> Result<Palette> {
        if let (Some(min), Some(mid), Some(max)) =
            (&self.min_color, &self.mid_color, &self.max_color)
        {
            let midpoint = self.midpoint.unwrap_or(DEFAULT_MIDPOINT);
            if midpoint < 1 {
                return Err(RenderError::InvalidPaletteArgs {
                    message: "midpoint must be >= 1".to_string(),
                });
            }
            return Ok(Palette::Custom {
                min: parse_hex_color(min)?,
                mid: parse_hex_color(mid)?,
                max: parse_hex_color(max)?,
                midpoint,
            });
        }

        match &self.gradient {
            None => Ok(Palette::default()),
            Some(name) => PresetName::parse(name)
                .map(Palette::Preset)
                .ok_or_else(|| RenderError::InvalidPaletteArgs {
                    message: format!("unknown gradient '{}'", name),
                }),
        }
    }

    /// Filter normalization: type lowercased, dates parsed as ISO-8601.
    pub fn filter(&self) -> Result<ActivityFilter> {
        let start_date = self
            .start_date
            .as_deref()
            .map(parse_date)
            .transpose()?;
        let end_date = self.end_date.as_deref().map(parse_date).transpose()?;
        Ok(ActivityFilter::new(
            self.activity_type.as_deref(),
            start_date,
            end_date,
        ))
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex_color(input: &str) -> Result<Rgba> {
    let hex = input.trim().trim_start_matches('#');
    let invalid = || RenderError::InvalidPaletteArgs {
        message: format!("invalid hex color '{}'", input),
    };
    if !hex.is_ascii() {
        return Err(invalid());
    }

    let byte_at = |i: usize| -> Result<u8> {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid())
    };

    match hex.len() {
        6 => Ok([byte_at(0)?, byte_at(2)?, byte_at(4)?, 255]),
        8 => Ok([byte_at(0)?, byte_at(2)?, byte_at(4)?, byte_at(6)?]),
        _ => Err(invalid()),
    }
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    input
        .trim()
        .parse::<NaiveDate>()
        .map_err(|_| RenderError::InvalidFilterArgs {
            message: format!("invalid date '{}'", input),
        })
}

// ============================================================================
// Tests
// ============================================================================
