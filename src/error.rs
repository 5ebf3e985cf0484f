//! Unified error handling for the tile rendering pipeline.
//!
//! This module provides a consistent error type for all rendering operations.
//! Per-activity failures (a polyline that does not decode) are recovered
//! locally by the renderer; everything else aborts the tile.

use std::fmt;

/// Unified error type for tile rendering operations.
#[derive(Debug, Clone)]
pub enum RenderError {
    /// A polyline string does not decode
    MalformedPolyline {
        activity_id: String,
        message: String,
    },
    /// Tile address outside the valid Z/X/Y range
    InvalidTileAddress { z: u8, x: u32, y: u32 },
    /// Palette parameters do not resolve to a gradient
    InvalidPaletteArgs { message: String },
    /// Filter parameters do not parse
    InvalidFilterArgs { message: String },
    /// The activity source failed to answer a query
    ProviderUnavailable { message: String },
    /// The per-tile render deadline expired
    RenderTimeout { elapsed_ms: u64 },
    /// PNG encoding failed
    EncodeFailure { message: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MalformedPolyline {
                activity_id,
                message,
            } => {
                if activity_id.is_empty() {
                    write!(f, "Malformed polyline: {}", message)
                } else {
                    write!(
                        f,
                        "Malformed polyline for activity '{}': {}",
                        activity_id, message
                    )
                }
            }
            RenderError::InvalidTileAddress { z, x, y } => {
                write!(f, "Invalid tile address {}/{}/{}", z, x, y)
            }
            RenderError::InvalidPaletteArgs { message } => {
                write!(f, "Invalid palette arguments: {}", message)
            }
            RenderError::InvalidFilterArgs { message } => {
                write!(f, "Invalid filter arguments: {}", message)
            }
            RenderError::ProviderUnavailable { message } => {
                write!(f, "Activity provider unavailable: {}", message)
            }
            RenderError::RenderTimeout { elapsed_ms } => {
                write!(f, "Tile render deadline exceeded after {}ms", elapsed_ms)
            }
            RenderError::EncodeFailure { message } => {
                write!(f, "PNG encoding failed: {}", message)
            }
        }
    }
}

impl std::error::Error for RenderError {}

impl RenderError {
    /// Attach the owning activity to a polyline error.
    ///
    /// The codec does not know which activity a string belongs to, so its
    /// errors carry an empty `activity_id`; callers that do know fill it in
    /// here. Other variants pass through unchanged.
    pub fn for_activity(self, activity_id: &str) -> RenderError {
        match self {
            RenderError::MalformedPolyline { message, .. } => RenderError::MalformedPolyline {
                activity_id: activity_id.to_string(),
                message,
            },
            other => other,
        }
    }
}

/// Result type alias for tile rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
