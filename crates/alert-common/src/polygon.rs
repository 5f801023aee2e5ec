//! Lenient parsing of CAP polygon strings.
//!
//! CAP encodes an area boundary as whitespace separated `lat,lon` pairs.
//! Upstream feeds occasionally contain broken vertices; rather than failing
//! the whole polygon, a broken vertex collapses to the origin and every
//! origin vertex is dropped afterwards. Spanish alert areas never touch
//! (0, 0), so the only casualty is a vertex that was unusable anyway.

use serde::{Deserialize, Serialize};

/// Minimum number of vertices for a polygon to be renderable.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A geographic vertex in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const ORIGIN: LatLon = LatLon { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_origin(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Parse a CAP polygon string into an ordered list of vertices.
///
/// Never fails. Returns an empty list when fewer than
/// [`MIN_POLYGON_VERTICES`] usable vertices remain.
pub fn parse_polygon(input: &str) -> Vec<LatLon> {
    let vertices: Vec<LatLon> = input
        .split_whitespace()
        .map(parse_vertex)
        .filter(|v| !v.is_origin())
        .collect();

    if vertices.len() < MIN_POLYGON_VERTICES {
        return Vec::new();
    }

    vertices
}

/// Parse a single `lat,lon` token, yielding the origin for anything unusable.
fn parse_vertex(token: &str) -> LatLon {
    let mut parts = token.split(',');
    let (Some(lat), Some(lon)) = (parts.next(), parts.next()) else {
        return LatLon::ORIGIN;
    };

    match (parse_coordinate(lat), parse_coordinate(lon)) {
        (Some(lat), Some(lon)) => LatLon::new(lat, lon),
        _ => LatLon::ORIGIN,
    }
}

fn parse_coordinate(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_coords_approx_eq;

    fn pairs(vertices: &[LatLon]) -> Vec<(f64, f64)> {
        vertices.iter().map(|v| (v.lat, v.lon)).collect()
    }

    #[test]
    fn test_parse_triangle() {
        let poly = parse_polygon("1,2 3,4 5,6");
        assert_eq!(pairs(&poly), vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
    }

    #[test]
    fn test_two_vertices_not_renderable() {
        assert!(parse_polygon("1,2 3,4").is_empty());
    }

    #[test]
    fn test_malformed_token_dropped() {
        let poly = parse_polygon("bad 1,2 3,4 5,6");
        assert_eq!(pairs(&poly), vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(parse_polygon("").is_empty());
        assert!(parse_polygon("   \n\t ").is_empty());
    }

    #[test]
    fn test_non_numeric_component_dropped() {
        let poly = parse_polygon("40.8,-4.1 abc,1 41.0,-3.8 40.9,-3.5 40.7,-3.8");
        assert_eq!(poly.len(), 4);
        assert_coords_approx_eq!((poly[1].lat, poly[1].lon), (41.0, -3.8), 1e-9);
    }

    #[test]
    fn test_drops_below_minimum_after_filtering() {
        // Three tokens, one of them broken: only two survive.
        assert!(parse_polygon("1,2 x,y 3,4").is_empty());
    }

    #[test]
    fn test_origin_vertex_dropped() {
        let poly = parse_polygon("0,0 1,2 3,4 5,6");
        assert_eq!(poly.len(), 3);
        assert!(poly.iter().all(|v| !v.is_origin()));
    }

    #[test]
    fn test_extra_components_ignored() {
        let poly = parse_polygon("1,2,9 3,4 5,6");
        assert_eq!(pairs(&poly), vec![(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]);
    }

    #[test]
    fn test_mixed_whitespace_separators() {
        let poly = parse_polygon("  42.6,-0.5\n42.8,0.2\t42.6,0.8  42.4,0.1 ");
        assert_eq!(poly.len(), 4);
        assert_coords_approx_eq!((poly[0].lat, poly[0].lon), (42.6, -0.5), 1e-9);
    }

    #[test]
    fn test_nan_and_infinity_rejected() {
        assert!(parse_polygon("NaN,1 inf,2 1,2 3,4").is_empty());
    }
}
