//! 24-bit packed elevation pixel encoding.
//!
//! Elevation tiles store one elevation per RGB pixel:
//!
//! ```text
//! x = r * 65536 + g * 256 + b
//! x <  2^23  ->  elevation =  x         * 0.01 m
//! x == 2^23  ->  no data
//! x >  2^23  ->  elevation = (x - 2^24) * 0.01 m
//! ```
//!
//! The layout must match the upstream providers bit for bit. Decoded values
//! outside the plausible physical range are reported as no data as well, which
//! keeps a handful of miscoded border pixels out of the statistics.

/// Packed value reserved for "no data".
pub const NO_DATA_VALUE: u32 = 1 << 23;

/// RGB triple of the no-data sentinel.
pub const NO_DATA_PIXEL: [u8; 3] = [0x80, 0x00, 0x00];

/// Meters per encoded unit.
pub const ELEVATION_RESOLUTION_M: f64 = 0.01;

/// Lowest elevation accepted as physically plausible.
pub const MIN_PLAUSIBLE_ELEVATION_M: f64 = -500.0;

/// Highest elevation accepted as physically plausible.
pub const MAX_PLAUSIBLE_ELEVATION_M: f64 = 4000.0;

const WRAP: i64 = 1 << 24;

/// Check whether an elevation lies in the plausible physical range.
#[inline]
pub fn is_plausible_elevation(elevation: f64) -> bool {
    (MIN_PLAUSIBLE_ELEVATION_M..=MAX_PLAUSIBLE_ELEVATION_M).contains(&elevation)
}

/// Decode one pixel into an elevation in meters.
///
/// Returns `None` for the sentinel and for implausible values.
#[inline]
pub fn decode_pixel(r: u8, g: u8, b: u8) -> Option<f64> {
    let x = (r as u32) << 16 | (g as u32) << 8 | b as u32;
    let units = match x.cmp(&NO_DATA_VALUE) {
        std::cmp::Ordering::Equal => return None,
        std::cmp::Ordering::Less => x as i64,
        std::cmp::Ordering::Greater => x as i64 - WRAP,
    };

    let elevation = units as f64 * ELEVATION_RESOLUTION_M;
    is_plausible_elevation(elevation).then_some(elevation)
}

/// Encode an elevation in meters into its RGB pixel.
///
/// Values are rounded to the nearest centimeter. `None` and non-finite values
/// encode as [`NO_DATA_PIXEL`]; values that would collide with the sentinel are
/// pulled one unit towards zero.
pub fn encode_elevation(elevation: Option<f64>) -> [u8; 3] {
    let Some(elevation) = elevation.filter(|e| e.is_finite()) else {
        return NO_DATA_PIXEL;
    };

    let max_units = NO_DATA_VALUE as i64 - 1;
    let units = (elevation / ELEVATION_RESOLUTION_M)
        .round()
        .clamp(-max_units as f64, max_units as f64) as i64;
    let x = units.rem_euclid(WRAP) as u32;

    [(x >> 16) as u8, (x >> 8) as u8, x as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sentinel_is_no_data() {
        let [r, g, b] = NO_DATA_PIXEL;
        assert_eq!(decode_pixel(r, g, b), None);
        assert_eq!(encode_elevation(None), NO_DATA_PIXEL);
        assert_eq!(encode_elevation(Some(f64::NAN)), NO_DATA_PIXEL);
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_pixel(0, 0, 0), Some(0.0));
        // 0x000001 -> 0.01 m
        assert_abs_diff_eq!(decode_pixel(0, 0, 1).unwrap(), 0.01, epsilon = 1e-9);
        // 0x0186A0 = 100000 -> 1000 m
        assert_abs_diff_eq!(decode_pixel(0x01, 0x86, 0xA0).unwrap(), 1000.0, epsilon = 1e-9);
        // 0xFFFFFF -> -1 unit -> -0.01 m
        assert_abs_diff_eq!(decode_pixel(0xFF, 0xFF, 0xFF).unwrap(), -0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_decode_rejects_implausible() {
        // 0x7FFFFF is the largest positive value, ~83886 m
        assert_eq!(decode_pixel(0x7F, 0xFF, 0xFF), None);
        // 0x800001 is the most negative value
        assert_eq!(decode_pixel(0x80, 0x00, 0x01), None);
        // Just above and below the accepted range
        let [r, g, b] = encode_elevation(Some(4000.01));
        assert_eq!(decode_pixel(r, g, b), None);
        let [r, g, b] = encode_elevation(Some(-500.01));
        assert_eq!(decode_pixel(r, g, b), None);
    }

    #[test]
    fn test_round_trip_over_plausible_range() {
        let mut e = MIN_PLAUSIBLE_ELEVATION_M;
        while e < MAX_PLAUSIBLE_ELEVATION_M {
            let [r, g, b] = encode_elevation(Some(e));
            let decoded = decode_pixel(r, g, b).expect("plausible value must decode");
            assert!((decoded - e).abs() <= 0.01, "{} decoded as {}", e, decoded);
            e += 1.37;
        }
    }

    #[test]
    fn test_round_trip_centimeter_steps_near_zero() {
        for units in -2000i64..2000 {
            let e = units as f64 * 0.01;
            let [r, g, b] = encode_elevation(Some(e));
            assert_abs_diff_eq!(decode_pixel(r, g, b).unwrap(), e, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_encode_negative_wraps() {
        // -0.01 m is the top of the 24-bit range
        assert_eq!(encode_elevation(Some(-0.01)), [0xFF, 0xFF, 0xFF]);
        assert_eq!(encode_elevation(Some(0.0)), [0, 0, 0]);
    }
}
