//! # Boundary Loader
//!
//! Reads administrative outlines from an ESRI shapefile (`.shp` plus optional `.dbf`, `.shx`
//! and `.prj` siblings) and returns them in geographic WGS84 coordinates.
//!
//! Polygon and polyline shapes (including their M/Z variants) contribute outline parts.
//! Point and null shapes carry no outline and are skipped.

use log::{debug, info, warn};
use shapefile::Shape;
use shapefile::dbase::{FieldValue, Record};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Nc2GifError, Result};
use crate::projection::Crs;

/// One outline part as a sequence of `(lon, lat)` vertices.
pub type Part = Vec<(f64, f64)>;

/// A single shapefile record reprojected to WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Value of the `name` attribute, if the `.dbf` has one
    pub name: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub parts: Vec<Part>,
    /// Polygon rings are closed outlines; polyline parts are not
    pub closed: bool,
}

/// Every outline from one shapefile, always in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDataset {
    pub features: Vec<BoundaryFeature>,
    /// Always geographic WGS84 once loaded
    pub crs: Crs,
    /// Description of the CRS the file was stored in
    pub source_crs: String,
}

impl BoundaryDataset {
    /// Longitude/latitude bounding box `(lon_min, lon_max, lat_min, lat_max)`.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .features
            .iter()
            .flat_map(|f| f.parts.iter())
            .flat_map(|p| p.iter());
        let &(x0, y0) = points.next()?;
        Some(points.fold((x0, x0, y0, y0), |(x_min, x_max, y_min, y_max), &(x, y)| {
            (x_min.min(x), x_max.max(x), y_min.min(y), y_max.max(y))
        }))
    }

    pub fn part_count(&self) -> usize {
        self.features.iter().map(|f| f.parts.len()).sum()
    }

    pub fn point_count(&self) -> usize {
        self.features
            .iter()
            .flat_map(|f| f.parts.iter())
            .map(|p| p.len())
            .sum()
    }
}

/// Loads a shapefile and reprojects every vertex to WGS84.
///
/// # Arguments
///
/// * `path` - Path to the `.shp` file. A `.prj` sibling defines the source CRS; without one
///   the coordinates are assumed to already be WGS84 longitude/latitude.
///
/// # Returns
///
/// The reprojected [`BoundaryDataset`], or an error for unreadable files and unsupported
/// projections.
pub fn load_boundaries(path: &Path) -> Result<BoundaryDataset> {
    if !path.exists() {
        return Err(Nc2GifError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("boundary file not found: {}", path.display()),
        )));
    }

    let crs = read_crs(path)?;
    let source_crs = crs.name();
    debug!("Boundary CRS: {}", source_crs);

    let mut features = Vec::new();
    let mut skipped = 0usize;

    match sibling(path, "dbf") {
        Some(_) => {
            let mut reader = shapefile::Reader::from_path(path)?;
            for item in reader.iter_shapes_and_records() {
                let (shape, record) = item?;
                match feature_from_shape(shape, Some(record), &crs) {
                    Some(feature) => features.push(feature),
                    None => skipped += 1,
                }
            }
        }
        None => {
            debug!("No .dbf next to {}, reading geometry only", path.display());
            for shape in shapefile::ShapeReader::from_path(path)?.read()? {
                match feature_from_shape(shape, None, &crs) {
                    Some(feature) => features.push(feature),
                    None => skipped += 1,
                }
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} shapes without an outline", skipped);
    }

    let dataset = BoundaryDataset {
        features,
        crs: Crs::wgs84(),
        source_crs,
    };
    info!(
        "Loaded {} boundary features ({} parts, {} vertices) from {}",
        dataset.features.len(),
        dataset.part_count(),
        dataset.point_count(),
        path.display()
    );
    Ok(dataset)
}

/// Finds `path` with the given extension in either letter case.
fn sibling(path: &Path, extension: &str) -> Option<PathBuf> {
    [extension.to_string(), extension.to_ascii_uppercase()]
        .into_iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.exists())
}

fn read_crs(path: &Path) -> Result<Crs> {
    match sibling(path, "prj") {
        Some(prj) => {
            let wkt = std::fs::read_to_string(&prj)?;
            Ok(Crs::from_wkt(&wkt)?)
        }
        None => {
            warn!(
                "No .prj next to {}; assuming WGS84 longitude/latitude",
                path.display()
            );
            Ok(Crs::wgs84())
        }
    }
}

macro_rules! ring_parts {
    ($polygon:expr) => {
        $polygon
            .rings()
            .iter()
            .map(|ring| ring.points().iter().map(|p| (p.x, p.y)).collect())
            .collect::<Vec<Part>>()
    };
}

macro_rules! line_parts {
    ($polyline:expr) => {
        $polyline
            .parts()
            .iter()
            .map(|part| part.iter().map(|p| (p.x, p.y)).collect())
            .collect::<Vec<Part>>()
    };
}

fn feature_from_shape(shape: Shape, record: Option<Record>, crs: &Crs) -> Option<BoundaryFeature> {
    let (parts, closed) = match shape {
        Shape::Polygon(polygon) => (ring_parts!(polygon), true),
        Shape::PolygonM(polygon) => (ring_parts!(polygon), true),
        Shape::PolygonZ(polygon) => (ring_parts!(polygon), true),
        Shape::Polyline(line) => (line_parts!(line), false),
        Shape::PolylineM(line) => (line_parts!(line), false),
        Shape::PolylineZ(line) => (line_parts!(line), false),
        _ => return None,
    };

    let reproject = !crs.is_wgs84_geographic();
    let parts: Vec<Part> = parts
        .into_iter()
        .map(|part| {
            part.into_iter()
                .map(|(x, y)| if reproject { crs.to_wgs84(x, y) } else { (x, y) })
                .filter(|(lon, lat)| lon.is_finite() && lat.is_finite())
                .collect::<Part>()
        })
        .filter(|part| part.len() >= 2)
        .collect();

    let attributes = record.map(record_attributes).unwrap_or_default();
    let name = attributes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("name"))
        .map(|(_, value)| value.clone());

    Some(BoundaryFeature {
        name,
        attributes,
        parts,
        closed,
    })
}

fn record_attributes(record: Record) -> BTreeMap<String, String> {
    let fields: HashMap<String, FieldValue> = record.into();
    fields
        .into_iter()
        .filter_map(|(key, value)| field_text(value).map(|text| (key, text)))
        .collect()
}

fn field_text(value: FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(text)) => Some(text.trim().to_string()),
        FieldValue::Memo(text) => Some(text.trim().to_string()),
        FieldValue::Numeric(Some(number)) => Some(number.to_string()),
        FieldValue::Float(Some(number)) => Some(number.to_string()),
        FieldValue::Integer(number) => Some(number.to_string()),
        FieldValue::Double(number) => Some(number.to_string()),
        FieldValue::Logical(Some(flag)) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{write_dbf_names, write_polygon_shapefile};
    use tempfile::tempdir;

    const SQUARE: [(f64, f64); 5] = [(70.0, 10.0), (70.0, 30.0), (90.0, 30.0), (90.0, 10.0), (70.0, 10.0)];

    #[test]
    fn test_load_geometry_only_without_prj() {
        let dir = tempdir().unwrap();
        let shp = dir.path().join("india.shp");
        write_polygon_shapefile(&shp, &[SQUARE.to_vec()]).unwrap();

        let dataset = load_boundaries(&shp).unwrap();
        assert_eq!(dataset.features.len(), 1);
        assert!(dataset.crs.is_wgs84_geographic());
        let feature = &dataset.features[0];
        assert!(feature.closed);
        assert_eq!(feature.name, None);
        assert_eq!(feature.parts.len(), 1);
        assert_eq!(feature.parts[0].len(), 5);
        assert_eq!(dataset.bounds(), Some((70.0, 90.0, 10.0, 30.0)));
    }

    #[test]
    fn test_load_with_names_from_dbf() {
        let dir = tempdir().unwrap();
        let shp = dir.path().join("states.shp");
        let west: Vec<(f64, f64)> = vec![(70.0, 10.0), (70.0, 30.0), (80.0, 30.0), (80.0, 10.0), (70.0, 10.0)];
        let east: Vec<(f64, f64)> = vec![(80.0, 10.0), (80.0, 30.0), (90.0, 30.0), (90.0, 10.0), (80.0, 10.0)];
        write_polygon_shapefile(&shp, &[west, east]).unwrap();
        write_dbf_names(&shp.with_extension("dbf"), &["Gujarat", "Odisha"]).unwrap();

        let dataset = load_boundaries(&shp).unwrap();
        let names: Vec<_> = dataset.features.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, vec![Some("Gujarat".to_string()), Some("Odisha".to_string())]);
        assert_eq!(dataset.features[1].attributes.get("name").map(String::as_str), Some("Odisha"));
        assert_eq!(dataset.part_count(), 2);
        assert_eq!(dataset.point_count(), 10);
    }

    #[test]
    fn test_projected_source_is_reprojected() {
        let dir = tempdir().unwrap();
        let shp = dir.path().join("mercator.shp");
        // Web Mercator corners of lon 70..90, lat 10..30
        let r = 6_378_137.0_f64;
        let x = |lon: f64| r * lon.to_radians();
        let y = |lat: f64| r * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        let ring: Vec<(f64, f64)> = SQUARE.iter().map(|&(lon, lat)| (x(lon), y(lat))).collect();
        write_polygon_shapefile(&shp, &[ring]).unwrap();
        std::fs::write(
            shp.with_extension("prj"),
            r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#,
        )
        .unwrap();

        let dataset = load_boundaries(&shp).unwrap();
        assert!(dataset.crs.is_wgs84_geographic());
        assert!(dataset.source_crs.contains("Web_Mercator"));
        let (lon_min, lon_max, lat_min, lat_max) = dataset.bounds().unwrap();
        assert!((lon_min - 70.0).abs() < 1e-6);
        assert!((lon_max - 90.0).abs() < 1e-6);
        assert!((lat_min - 10.0).abs() < 1e-6);
        assert!((lat_max - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_unsupported_projection_fails() {
        let dir = tempdir().unwrap();
        let shp = dir.path().join("odd.shp");
        write_polygon_shapefile(&shp, &[SQUARE.to_vec()]).unwrap();
        std::fs::write(
            shp.with_extension("prj"),
            r#"PROJCS["odd",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]],PROJECTION["Robinson"],UNIT["metre",1]]"#,
        )
        .unwrap();

        assert!(matches!(load_boundaries(&shp), Err(Nc2GifError::Projection(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_boundaries(Path::new("/nonexistent/boundary.shp"));
        assert!(matches!(result, Err(Nc2GifError::Io(_))));
    }
}
