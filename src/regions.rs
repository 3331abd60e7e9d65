/// Region polygons from GeoJSON and grid-cell classification.
///
/// Each feature of the FeatureCollection is one region; its position in the
/// file is the region id. Only the outer ring of each Polygon is used.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::model::{IngestError, RegionMask};

// ============================================================================
// GeoJSON structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    geometry_type: String,
    coordinates: Vec<Vec<Vec<f64>>>,
}

// ============================================================================
// Region polygons
// ============================================================================

/// One region: its id, optional display name, and outer ring as
/// `(lon, lat)` vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPolygon {
    pub id: usize,
    pub name: Option<String>,
    pub ring: Vec<(f64, f64)>,
}

impl RegionPolygon {
    /// True if the point lies inside the ring or on its boundary.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.ring[i];
            let (xj, yj) = self.ring[j];

            if on_segment(lon, lat, (xi, yi), (xj, yj)) {
                return true;
            }
            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

fn on_segment(x: f64, y: f64, a: (f64, f64), b: (f64, f64)) -> bool {
    const EPS: f64 = 1e-12;
    let cross = (b.0 - a.0) * (y - a.1) - (b.1 - a.1) * (x - a.0);
    if cross.abs() > EPS {
        return false;
    }
    x >= a.0.min(b.0) - EPS && x <= a.0.max(b.0) + EPS && y >= a.1.min(b.1) - EPS && y <= a.1.max(b.1) + EPS
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Parses a GeoJSON FeatureCollection of Polygon features.
///
/// `source` is only used in error messages.
pub fn parse_regions(json: &str, source: &Path) -> Result<Vec<RegionPolygon>, IngestError> {
    let parse_error = |message: String| IngestError::Parse {
        path: source.to_path_buf(),
        message,
    };

    let collection: FeatureCollection =
        serde_json::from_str(json).map_err(|e| parse_error(format!("invalid geojson: {}", e)))?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(id, feature)| {
            if feature.geometry.geometry_type != "Polygon" {
                return Err(parse_error(format!(
                    "feature {} is a {}, expected Polygon",
                    id, feature.geometry.geometry_type
                )));
            }

            let outer = feature
                .geometry
                .coordinates
                .into_iter()
                .next()
                .ok_or_else(|| parse_error(format!("feature {} has no rings", id)))?;

            let ring = outer
                .into_iter()
                .map(|position| match position.as_slice() {
                    [lon, lat, ..] => Ok((*lon, *lat)),
                    _ => Err(parse_error(format!("feature {} has a position with fewer than 2 values", id))),
                })
                .collect::<Result<Vec<_>, _>>()?;

            let name = feature
                .properties
                .as_ref()
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .map(str::to_string);

            Ok(RegionPolygon { id, name, ring })
        })
        .collect()
}

/// Loads region polygons from a GeoJSON file.
pub fn load_regions<P: AsRef<Path>>(path: P) -> Result<Vec<RegionPolygon>, IngestError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| IngestError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_regions(&content, path)
}

// ============================================================================
// Classification
// ============================================================================

/// Region id of the first polygon containing the point, if any.
pub fn classify_point(lon: f64, lat: f64, polygons: &[RegionPolygon]) -> Option<usize> {
    polygons.iter().find(|p| p.contains(lon, lat)).map(|p| p.id)
}

/// Labels every cell of a `[lat][lon]` grid.
pub fn build_region_mask(latitude: &[f64], longitude: &[f64], polygons: &[RegionPolygon]) -> RegionMask {
    latitude
        .iter()
        .flat_map(|&lat| longitude.iter().map(move |&lon| classify_point(lon, lat, polygons)))
        .collect()
}

/// Number of cells labelled `region`.
pub fn member_count(mask: &RegionMask, region: usize) -> usize {
    mask.iter().filter(|label| **label == Some(region)).count()
}

// ============================================================================
// Tests
// ============================================================================
