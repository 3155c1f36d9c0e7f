//! Bit-interleaved base-32 geohash codec.
//!
//! A geohash string is built by repeatedly halving a longitude/latitude
//! bounding box and recording which half the target coordinate fell into.
//! Bits are produced in strict longitude/latitude alternation (five bits per
//! output character) and packed MSB-first into the standard geohash base-32
//! alphabet. Because geohash prefixes nest spatially, a point-cloud trie can
//! use the encoded string directly as its key: two points with a common
//! geohash prefix are guaranteed to be near each other.
use std::error::Error;
use std::fmt;

/// The geohash base-32 alphabet. Digits, then lowercase letters with `a`,
/// `i`, `l`, `o` removed to avoid confusion with `4`, `1`, `1`, `0`.
pub const BASE32_ALPHABET: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

/// Upper bound on the number of characters `encode` will produce. This is the
/// codec's own ceiling, independent of (and looser than) the 18-character cap
/// a `ght::Tree` imposes on stored hashes.
pub const MAX_RESOLUTION: usize = 22;

/// A longitude/latitude pair in degrees, WGS84.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Longitude, degrees, `[-180, 180]`.
    pub x: f64,
    /// Latitude, degrees, `[-90, 90]`.
    pub y: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Coordinate {
        Coordinate { x, y }
    }
}

/// A closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// A bounding rectangle, as decoded from a geohash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: Range,
    pub y: Range,
}

impl Area {
    /// The coordinate at the center of this area.
    pub fn center(&self) -> Coordinate {
        Coordinate {
            x: (self.x.min + self.x.max) / 2.0,
            y: (self.y.min + self.y.max) / 2.0,
        }
    }

    /// Width (longitude span) and height (latitude span) of the area.
    pub fn size(&self) -> (f64, f64) {
        (self.x.width(), self.y.width())
    }
}

/// Errors that can occur encoding or decoding a geohash.
#[derive(Debug)]
pub enum GeohashError {
    /// The coordinate fell outside WGS84 bounds.
    CoordinateOutOfRange(Coordinate),
    /// The requested resolution is larger than `MAX_RESOLUTION`.
    ResolutionTooLarge(usize),
    /// A character outside the base-32 geohash alphabet was encountered.
    InvalidHashCharacter(char),
}

impl fmt::Display for GeohashError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GeohashError::CoordinateOutOfRange(c) => {
                write!(f, "coordinate ({}, {}) is outside WGS84 bounds", c.x, c.y)
            }
            GeohashError::ResolutionTooLarge(r) => write!(
                f,
                "requested resolution {} exceeds the maximum of {}",
                r, MAX_RESOLUTION
            ),
            GeohashError::InvalidHashCharacter(c) => {
                write!(f, "'{}' is not a valid geohash character", c)
            }
        }
    }
}

impl Error for GeohashError {}

fn refine_bit(value: f64, range: &mut Range) -> bool {
    let mid = (range.max + range.min) / 2.0;
    if value >= mid {
        range.min = mid;
        true
    } else {
        range.max = mid;
        false
    }
}

/// Encodes a coordinate into a geohash string of the given length.
///
/// Bits are drawn in strict longitude/latitude alternation starting with
/// longitude, five bits per output character, MSB first.
pub fn encode(coord: Coordinate, resolution: usize) -> Result<String, GeohashError> {
    if resolution > MAX_RESOLUTION {
        return Err(GeohashError::ResolutionTooLarge(resolution));
    }
    if !(-180.0..=180.0).contains(&coord.x) || !(-90.0..=90.0).contains(&coord.y) {
        return Err(GeohashError::CoordinateOutOfRange(coord));
    }

    let mut lon_range = Range {
        min: -180.0,
        max: 180.0,
    };
    let mut lat_range = Range {
        min: -90.0,
        max: 90.0,
    };
    let mut longitude_turn = true;
    let alphabet = BASE32_ALPHABET.as_bytes();
    let mut out = String::with_capacity(resolution);

    for _ in 0..resolution {
        let mut bits: u8 = 0;
        for _ in 0..5 {
            bits <<= 1;
            let bit = if longitude_turn {
                refine_bit(coord.x, &mut lon_range)
            } else {
                refine_bit(coord.y, &mut lat_range)
            };
            if bit {
                bits |= 1;
            }
            longitude_turn = !longitude_turn;
        }
        out.push(alphabet[bits as usize] as char);
    }
    Ok(out)
}

/// Decodes a geohash string into the bounding rectangle it represents.
/// Accepts mixed-case input.
pub fn decode(hash: &str) -> Result<Area, GeohashError> {
    let mut lon_range = Range {
        min: -180.0,
        max: 180.0,
    };
    let mut lat_range = Range {
        min: -90.0,
        max: 90.0,
    };
    let mut longitude_turn = true;

    for c in hash.chars() {
        let lower = c.to_ascii_lowercase();
        let bits = BASE32_ALPHABET
            .find(lower)
            .ok_or(GeohashError::InvalidHashCharacter(c))? as u8;
        for shift in (0..5).rev() {
            let bit = (bits >> shift) & 1;
            let range = if longitude_turn {
                &mut lon_range
            } else {
                &mut lat_range
            };
            let mid = (range.max + range.min) / 2.0;
            if bit == 1 {
                range.min = mid;
            } else {
                range.max = mid;
            }
            longitude_turn = !longitude_turn;
        }
    }

    Ok(Area {
        x: lon_range,
        y: lat_range,
    })
}

/// Length of the common prefix of `a` and `b`, up to `cap` characters.
///
/// Returns `-1` (not `0`) if the first characters differ and neither string
/// is empty: a strong "no overlap" signal distinct from the "either string is
/// the global `\"\"` hash" case, which returns `0`.
pub fn common_length(a: &str, b: &str, cap: usize) -> i32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a[0] != b[0] {
        return -1;
    }
    let max_len = cap.min(a.len()).min(b.len());
    let mut index = 0;
    while index < max_len && a[index] == b[index] {
        index += 1;
    }
    index as i32
}

/// The outcome of comparing two hashes for trie insertion purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// `a` is the empty "global" hash; `b` becomes its child verbatim.
    Global,
    /// `a` and `b` are identical (up to `cap`).
    Same,
    /// `a` is a proper prefix of `b`; `b` extends `a`.
    Child,
    /// `a` and `b` share a proper, non-empty prefix and then diverge.
    Split,
}

/// No common prefix exists (`a` and `b` share no characters), or `a` is
/// longer than `b` while still being a candidate prefix, both of which are
/// refused by the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMatch;

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "hashes share no usable common prefix")
    }
}

impl Error for NoMatch {}

/// Splits `a` (a potential parent hash) and `b` (a potential child) into the
/// part they share and the parts that remain once that shared prefix is
/// stripped off, classifying the relationship as a [`MatchKind`].
///
/// This is the core primitive the trie's `insert` uses to decide whether a
/// new hash becomes a descendant of, a duplicate of, or a sibling-by-split
/// of an existing node.
pub fn leaf_parts<'a>(
    a: &'a str,
    b: &'a str,
    maxlen: usize,
) -> Result<(MatchKind, &'a str, &'a str), NoMatch> {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let mut i = 0;
    while i < a_bytes.len() && i < b_bytes.len() && i < maxlen && a_bytes[i] == b_bytes[i] {
        i += 1;
    }

    if i == 0 {
        if a.is_empty() && !b.is_empty() {
            return Ok((MatchKind::Global, a, b));
        }
        return Err(NoMatch);
    }

    let a_rest = &a[i..];
    let b_rest = &b[i..];
    if a_rest.is_empty() && b_rest.is_empty() {
        Ok((MatchKind::Same, a_rest, b_rest))
    } else if a_rest.is_empty() {
        Ok((MatchKind::Child, a_rest, b_rest))
    } else if b_rest.is_empty() {
        // `a` is longer than `b`: this should never happen for full-length
        // hashes being inserted into a trie built from shorter prefixes.
        Err(NoMatch)
    } else {
        Ok((MatchKind::Split, a_rest, b_rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_geohash() {
        let hash = encode(Coordinate::new(1.0, 1.0), 20).unwrap();
        assert_eq!(hash, "s00twy01mtw037ms06g7");
        let area = decode(&hash).unwrap();
        let center = area.center();
        assert!((center.x - 1.0).abs() < 1e-10);
        assert!((center.y - 1.0).abs() < 1e-10);
    }

    #[test]
    fn poles_and_meridian() {
        assert_eq!(
            encode(Coordinate::new(0.0, 0.0), 20).unwrap(),
            "s0000000000000000000"
        );
        assert_eq!(
            encode(Coordinate::new(90.0, 0.0), 20).unwrap(),
            "w0000000000000000000"
        );
        assert_eq!(
            encode(Coordinate::new(90.0, 45.0), 20).unwrap(),
            "y0000000000000000000"
        );
        assert_eq!(
            encode(Coordinate::new(-180.0, 45.0), 20).unwrap(),
            "b0000000000000000000"
        );
        assert_eq!(
            encode(Coordinate::new(180.0, 45.0), 20).unwrap(),
            "zbpbpbpbpbpbpbpbpbpb"
        );
    }

    #[test]
    fn resolution_too_large_errors() {
        match encode(Coordinate::new(0.0, 0.0), MAX_RESOLUTION + 1) {
            Err(GeohashError::ResolutionTooLarge(r)) => assert_eq!(r, MAX_RESOLUTION + 1),
            other => panic!("expected ResolutionTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_coordinate_errors() {
        assert!(matches!(
            encode(Coordinate::new(200.0, 0.0), 5),
            Err(GeohashError::CoordinateOutOfRange(_))
        ));
        assert!(matches!(
            encode(Coordinate::new(0.0, -91.0), 5),
            Err(GeohashError::CoordinateOutOfRange(_))
        ));
    }

    #[test]
    fn invalid_hash_character_errors() {
        assert!(matches!(
            decode("s00a"),
            Err(GeohashError::InvalidHashCharacter('a'))
        ));
    }

    #[test]
    fn round_trip_contains_original_coordinate() {
        let samples = [
            (1.0, 1.0),
            (-73.98, 40.75),
            (139.69, 35.68),
            (0.0, 0.0),
            (-179.9, -89.9),
        ];
        for &(x, y) in &samples {
            for resolution in 1..=18 {
                let coord = Coordinate::new(x, y);
                let hash = encode(coord, resolution).unwrap();
                let area = decode(&hash).unwrap();
                assert!(area.x.min <= coord.x && coord.x <= area.x.max, "{:?}", hash);
                assert!(area.y.min <= coord.y && coord.y <= area.y.max, "{:?}", hash);
                let (width, height) = area.size();
                assert!(width <= 360.0 * 2f64.powi(-(((resolution * 5) as f64 / 2.0).ceil() as i32)) + 1e-9);
                assert!(height <= 180.0 * 2f64.powi(-(((resolution * 5) as f64 / 2.0).floor() as i32)) + 1e-9);
            }
        }
    }

    #[test]
    fn common_length_global_sentinel() {
        assert_eq!(common_length("", "abc", 18), 0);
        assert_eq!(common_length("abc", "", 18), 0);
    }

    #[test]
    fn common_length_no_overlap() {
        assert_eq!(common_length("abc", "xyz", 18), -1);
    }

    #[test]
    fn common_length_partial_overlap() {
        assert_eq!(common_length("abcdef", "abcxyz", 18), 3);
        assert_eq!(common_length("abcdef", "abcdef", 3), 3);
    }

    #[test]
    fn leaf_parts_global() {
        let (kind, a_leaf, b_leaf) = leaf_parts("", "wpzpy4vtv4", 18).unwrap();
        assert_eq!(kind, MatchKind::Global);
        assert_eq!(a_leaf, "");
        assert_eq!(b_leaf, "wpzpy4vtv4");
    }

    #[test]
    fn leaf_parts_none_no_overlap() {
        assert!(leaf_parts("abc", "xyz", 18).is_err());
    }

    #[test]
    fn leaf_parts_both_empty_is_none() {
        assert!(leaf_parts("", "", 18).is_err());
    }

    #[test]
    fn leaf_parts_same() {
        let (kind, a_leaf, b_leaf) = leaf_parts("abcdefg", "abcdefg", 18).unwrap();
        assert_eq!(kind, MatchKind::Same);
        assert_eq!(a_leaf, "");
        assert_eq!(b_leaf, "");
    }

    #[test]
    fn leaf_parts_child() {
        let (kind, a_leaf, b_leaf) = leaf_parts("abcd", "abcdefg", 18).unwrap();
        assert_eq!(kind, MatchKind::Child);
        assert_eq!(a_leaf, "");
        assert_eq!(b_leaf, "efg");
    }

    #[test]
    fn leaf_parts_parent_longer_is_none() {
        assert!(leaf_parts("abcdefg", "abcd", 18).is_err());
    }

    #[test]
    fn leaf_parts_split() {
        let (kind, a_leaf, b_leaf) =
            leaf_parts("c0v2hdm1wpzpy4vtv4", "c0v2hdm1gcuekpf9y1", 18).unwrap();
        assert_eq!(kind, MatchKind::Split);
        assert_eq!(a_leaf, "wpzpy4vtv4");
        assert_eq!(b_leaf, "gcuekpf9y1");
    }
}
