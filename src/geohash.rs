//! Base-32 geohash encoding.
//!
//! Filters carry a short geohash of their center as a forward-compatible spatial
//! tag. Approximate cell sizes by precision:
//!
//! | chars | cell error |
//! |-------|------------|
//! | 1     | ±2,500 km  |
//! | 2     | ±630 km    |
//! | 3     | ±78 km     |
//! | 4     | ±20 km     |
//! | 5     | ±2.4 km    |

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision used for filter prefixes (about 78 km).
pub const FILTER_PRECISION: usize = 3;

/// Encodes a coordinate into a geohash of `precision` characters.
///
/// Bits alternate longitude first, five bits per character.
///
/// # Examples
///
/// ```
/// assert_eq!(nearcity::geohash::encode(29.76328, -95.36327, 3), "9vk");
/// assert_eq!(nearcity::geohash::encode(57.64911, 10.40744, 11), "u4pruydqqvj");
/// ```
pub fn encode(lat: f64, lng: f64, precision: usize) -> String {
    let mut hash = String::with_capacity(precision);
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lng_min, mut lng_max) = (-180.0_f64, 180.0_f64);
    let mut even = true;
    let mut bits = 0u8;
    let mut ch = 0usize;

    while hash.len() < precision {
        ch <<= 1;
        if even {
            let mid = (lng_min + lng_max) / 2.0;
            if lng >= mid {
                ch |= 1;
                lng_min = mid;
            } else {
                lng_max = mid;
            }
        } else {
            let mid = (lat_min + lat_max) / 2.0;
            if lat >= mid {
                ch |= 1;
                lat_min = mid;
            } else {
                lat_max = mid;
            }
        }
        even = !even;
        bits += 1;

        if bits == 5 {
            hash.push(BASE32[ch] as char);
            bits = 0;
            ch = 0;
        }
    }

    hash
}
