//! Google polyline codec.
//!
//! Activity sources deliver GPS tracks as Google polyline strings: each
//! coordinate is a ZigZag-encoded integer delta packed into 5-bit chunks
//! offset by 63. The wire format stores latitude first; the decoder emits
//! longitude-first [`LngLat`] values to match the tile geometry.

use crate::error::{RenderError, Result};
use crate::LngLat;

/// Default precision exponent: coordinates are scaled by 10^5.
pub const DEFAULT_PRECISION: u32 = 5;

/// Decode a polyline string at the default precision.
///
/// An empty string decodes to an empty track. Decoding preserves point
/// order, so the index of each output coordinate is the index the GPS
/// sample held in the source track.
pub fn decode(encoded: &str) -> Result<Vec<LngLat>> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

/// Decode a polyline string with an explicit precision exponent.
pub fn decode_with_precision(encoded: &str, precision: u32) -> Result<Vec<LngLat>> {
    let bytes = encoded.as_bytes();
    let factor = 10f64.powi(precision as i32);

    let mut coords = Vec::new();
    let mut idx = 0usize;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while idx < bytes.len() {
        lat += decode_delta(bytes, &mut idx)?;
        lng += decode_delta(bytes, &mut idx)?;
        coords.push(LngLat::new(lng as f64 / factor, lat as f64 / factor));
    }

    Ok(coords)
}

/// Encode coordinates at the default precision.
pub fn encode(points: &[LngLat]) -> String {
    encode_with_precision(points, DEFAULT_PRECISION)
}

/// Encode coordinates with an explicit precision exponent.
///
/// The output is canonical: `encode(decode(s)?) == s` for any valid `s`
/// produced at the same precision.
pub fn encode_with_precision(points: &[LngLat], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for p in points {
        let lat = (p.lat * factor).round() as i64;
        let lng = (p.lng * factor).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

/// Polyline errors leave the codec with an empty `activity_id`; callers
/// that know the owning activity attach it via `RenderError::for_activity`.
fn malformed(message: String) -> RenderError {
    RenderError::MalformedPolyline {
        activity_id: String::new(),
        message,
    }
}

/// Decode one ZigZag delta starting at `*idx`, advancing it past the chunk.
fn decode_delta(bytes: &[u8], idx: &mut usize) -> Result<i64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;

    loop {
        let byte = match bytes.get(*idx) {
            Some(&b) => b,
            None => return Err(malformed("stream ended inside a coordinate".to_string())),
        };
        if !(63..=126).contains(&byte) {
            return Err(malformed(format!(
                "invalid character 0x{:02x} at offset {}",
                byte, idx
            )));
        }
        *idx += 1;

        let chunk = (byte - 63) as u64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(malformed(format!(
                "unterminated coordinate ending at offset {}",
                idx
            )));
        }
    }

    let value = result as i64;
    Ok(if value & 1 != 0 {
        !(value >> 1)
    } else {
        value >> 1
    })
}

fn encode_value(value: i64, out: &mut String) {
    let mut v = (if value < 0 { !(value << 1) } else { value << 1 }) as u64;
    while v >= 0x20 {
        out.push((((0x20 | (v & 0x1f)) as u8) + 63) as char);
        v >>= 5;
    }
    out.push(((v as u8) + 63) as char);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // The worked example from Google's polyline format documentation.
    const DOC_EXAMPLE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn test_decode_documented_example() {
        let coords = decode(DOC_EXAMPLE).unwrap();
        assert_eq!(coords.len(), 3);
        assert_eq!(coords[0], LngLat::new(-120.2, 38.5));
        assert_eq!(coords[1], LngLat::new(-120.95, 40.7));
        assert_eq!(coords[2], LngLat::new(-126.453, 43.252));
    }

    #[test]
    fn test_encode_documented_example() {
        let coords = vec![
            LngLat::new(-120.2, 38.5),
            LngLat::new(-120.95, 40.7),
            LngLat::new(-126.453, 43.252),
        ];
        assert_eq!(encode(&coords), DOC_EXAMPLE);
    }

    #[test]
    fn test_round_trip() {
        let decoded = decode(DOC_EXAMPLE).unwrap();
        assert_eq!(encode(&decoded), DOC_EXAMPLE);
    }

    #[test]
    fn test_round_trip_synthetic() {
        let points = vec![
            LngLat::new(0.0, 0.0),
            LngLat::new(0.00001, -0.00001),
            LngLat::new(-179.99999, 85.0),
            LngLat::new(179.99999, -85.0),
        ];
        let encoded = encode(&points);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, points);
        assert_eq!(encode(&decoded), encoded);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode("").unwrap(), vec![]);
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_truncated_mid_coordinate() {
        // Continuation bit set on the final character
        let result = decode("_p~iF~ps|U_");
        match result {
            Err(RenderError::MalformedPolyline { activity_id, .. }) => {
                // The codec does not know the owning activity.
                assert!(activity_id.is_empty());
            }
            other => panic!("expected MalformedPolyline, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_longitude() {
        // A single complete latitude chunk with no longitude following
        let result = decode("_p~iF");
        assert!(matches!(
            result,
            Err(RenderError::MalformedPolyline { .. })
        ));
    }

    #[test]
    fn test_invalid_character() {
        let result = decode("_p~iF ~ps|U");
        assert!(matches!(
            result,
            Err(RenderError::MalformedPolyline { .. })
        ));
    }

    #[test]
    fn test_precision_factor() {
        let points = vec![LngLat::new(-120.2, 38.5)];
        let encoded = encode_with_precision(&points, 6);
        let decoded = decode_with_precision(&encoded, 6).unwrap();
        assert_eq!(decoded, points);
        // Same data at different precisions encodes differently
        assert_ne!(encoded, encode_with_precision(&points, 5));
    }
}
