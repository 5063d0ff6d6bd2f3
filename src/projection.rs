//! # Coordinate Reference Systems
//!
//! Boundary shapefiles carry their coordinate system as OGC/ESRI WKT in a `.prj` sidecar.
//! This module parses that WKT and converts projected coordinates back to geographic
//! longitude/latitude so every boundary ends up in WGS84.
//!
//! Supported projections are implemented from their closed-form (or series) equations:
//!
//! - Mercator, ellipsoidal (1SP/2SP) and Web/Pseudo Mercator (auxiliary sphere)
//! - Lambert Conformal Conic (1SP and 2SP)
//! - Transverse Mercator, which covers every UTM zone
//!
//! Datum shifts are not modelled: geographic coordinates on another datum are taken
//! as WGS84, which at country scale moves outlines by well under a kilometre.

use log::warn;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use thiserror::Error;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_INV_F: f64 = 298.257_223_563;
const MAX_ITERATIONS: usize = 15;
const CONVERGENCE: f64 = 1e-12;

/// Errors raised while parsing WKT or building a projection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("malformed WKT at offset {offset}: {message}")]
    Malformed { offset: usize, message: String },

    #[error("unsupported coordinate system '{0}'")]
    UnsupportedCrs(String),

    #[error("unsupported projection '{0}'")]
    UnsupportedProjection(String),

    #[error("WKT is missing {0}")]
    Missing(String),
}

/// A value inside a WKT node.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    Node(WktNode),
}

/// `KEYWORD[value, value, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub values: Vec<WktValue>,
}

impl WktNode {
    /// Parses a complete WKT string.
    pub fn parse(text: &str) -> Result<Self, ProjectionError> {
        let mut parser = WktParser {
            bytes: text.as_bytes(),
            pos: 0,
        };
        let node = parser.node()?;
        parser.skip_whitespace();
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("trailing characters after WKT"));
        }
        Ok(node)
    }

    /// First direct child with the given keyword (case-insensitive).
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.children(keyword).next()
    }

    pub fn children<'a, 'k>(&'a self, keyword: &'k str) -> impl Iterator<Item = &'a WktNode> + use<'a, 'k> {
        self.values.iter().filter_map(move |value| match value {
            WktValue::Node(node) if node.keyword.eq_ignore_ascii_case(keyword) => Some(node),
            _ => None,
        })
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            WktValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        match self.values.get(index)? {
            WktValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// `PARAMETER["name", value]` lookup over several accepted spellings.
    fn parameter(&self, names: &[&str]) -> Option<f64> {
        self.children("PARAMETER").find_map(|param| {
            let name = param.text(0)?;
            names
                .iter()
                .any(|candidate| name.eq_ignore_ascii_case(candidate))
                .then(|| param.number(1))
                .flatten()
        })
    }
}

struct WktParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl WktParser<'_> {
    fn error(&self, message: &str) -> ProjectionError {
        ProjectionError::Malformed {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn node(&mut self) -> Result<WktNode, ProjectionError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected keyword"));
        }
        let keyword = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();

        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Err(self.error("expected '[' or '('")),
        };
        self.pos += 1;

        let mut values = Vec::new();
        if self.peek() == Some(close) {
            self.pos += 1;
            return Ok(WktNode { keyword, values });
        }
        loop {
            values.push(self.value()?);
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(WktNode { keyword, values });
                }
                _ => return Err(self.error("expected ',' or closing bracket")),
            }
        }
    }

    fn value(&mut self) -> Result<WktValue, ProjectionError> {
        match self.peek() {
            Some(b'"') => self.quoted().map(WktValue::Text),
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => {
                self.number().map(WktValue::Number)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                // Bare enumerations such as AXIS["Easting", EAST] are kept as text
                let checkpoint = self.pos;
                match self.node() {
                    Ok(node) => Ok(WktValue::Node(node)),
                    Err(_) => {
                        self.pos = checkpoint;
                        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_alphanumeric() {
                            self.pos += 1;
                        }
                        let word = &self.bytes[checkpoint..self.pos];
                        Ok(WktValue::Text(String::from_utf8_lossy(word).into_owned()))
                    }
                }
            }
            _ => Err(self.error("unexpected character")),
        }
    }

    fn quoted(&mut self) -> Result<String, ProjectionError> {
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.error("unterminated string")),
                Some(b'"') if self.bytes.get(self.pos + 1) == Some(&b'"') => {
                    out.push(b'"');
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
                Some(&c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<f64, ProjectionError> {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && matches!(self.bytes[self.pos], b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| self.error("invalid number"))
    }
}

/// Reference ellipsoid given by semi-major axis and eccentricity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    /// First eccentricity squared
    pub e2: f64,
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Self::from_inverse_flattening(WGS84_A, WGS84_INV_F)
    }

    pub fn sphere(radius: f64) -> Self {
        Ellipsoid { a: radius, e2: 0.0 }
    }

    pub fn from_inverse_flattening(a: f64, inverse_flattening: f64) -> Self {
        if inverse_flattening == 0.0 {
            return Self::sphere(a);
        }
        let f = 1.0 / inverse_flattening;
        Ellipsoid { a, e2: f * (2.0 - f) }
    }

    fn e(&self) -> f64 {
        self.e2.sqrt()
    }
}

/// Forward and inverse mapping between geographic radians and projected metres
/// (false easting/northing excluded).
pub trait MapProjection {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64);
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}

// Conformal latitude helper shared by Mercator and Lambert: t(phi)
fn tsfn(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

// Inverse of tsfn by fixed-point iteration
fn phi_from_ts(ts: f64, e: f64) -> f64 {
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..MAX_ITERATIONS {
        let es = e * phi.sin();
        let next = FRAC_PI_2 - 2.0 * (ts * ((1.0 - es) / (1.0 + es)).powf(e / 2.0)).atan();
        if (next - phi).abs() < CONVERGENCE {
            return next;
        }
        phi = next;
    }
    phi
}

fn msfn(phi: f64, e2: f64) -> f64 {
    phi.cos() / (1.0 - e2 * phi.sin().powi(2)).sqrt()
}

/// Normal-aspect Mercator. Web Mercator is the spherical case.
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    pub ellipsoid: Ellipsoid,
    pub lon0: f64,
    pub k0: f64,
}

impl MapProjection for Mercator {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let ak = self.ellipsoid.a * self.k0;
        (ak * (lon - self.lon0), -ak * tsfn(lat, self.ellipsoid.e()).ln())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let ak = self.ellipsoid.a * self.k0;
        let lat = phi_from_ts((-y / ak).exp(), self.ellipsoid.e());
        (x / ak + self.lon0, lat)
    }
}

/// Lambert Conformal Conic on the ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformalConic {
    pub ellipsoid: Ellipsoid,
    pub lon0: f64,
    pub k0: f64,
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformalConic {
    /// `lat1 == lat2` gives the tangent (1SP) cone.
    pub fn new(ellipsoid: Ellipsoid, lon0: f64, lat0: f64, lat1: f64, lat2: f64, k0: f64) -> Self {
        let e = ellipsoid.e();
        let m1 = msfn(lat1, ellipsoid.e2);
        let t1 = tsfn(lat1, e);
        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            let m2 = msfn(lat2, ellipsoid.e2);
            let t2 = tsfn(lat2, e);
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let f = m1 / (n * t1.powf(n));
        let rho0 = ellipsoid.a * k0 * f * tsfn(lat0, e).powf(n);
        Self {
            ellipsoid,
            lon0,
            k0,
            n,
            f,
            rho0,
        }
    }
}

impl MapProjection for LambertConformalConic {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.ellipsoid.a * self.k0 * self.f * tsfn(lat, self.ellipsoid.e()).powf(self.n);
        let theta = self.n * (lon - self.lon0);
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let sign = self.n.signum();
        let dy = self.rho0 - y;
        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);
        let lon = theta / self.n + self.lon0;
        if rho == 0.0 {
            return (lon, sign * FRAC_PI_2);
        }
        let ts = (rho / (self.ellipsoid.a * self.k0 * self.f)).powf(1.0 / self.n);
        (lon, phi_from_ts(ts, self.ellipsoid.e()))
    }
}

/// Transverse Mercator (Snyder series), the basis of UTM.
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    pub lon0: f64,
    pub lat0: f64,
    pub k0: f64,
}

impl TransverseMercator {
    fn ep2(&self) -> f64 {
        self.ellipsoid.e2 / (1.0 - self.ellipsoid.e2)
    }

    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.ellipsoid.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.ellipsoid.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

impl MapProjection for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2;
        let ep2 = self.ep2();
        let (sin, cos) = lat.sin_cos();
        let n = self.ellipsoid.a / (1.0 - e2 * sin * sin).sqrt();
        let t = lat.tan().powi(2);
        let c = ep2 * cos * cos;
        let a = (lon - self.lon0) * cos;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);
        let y = self.k0
            * (self.meridian_arc(lat) - self.meridian_arc(self.lat0)
                + n * lat.tan()
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
        (x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = self.ep2();
        let a = self.ellipsoid.a;

        let m = self.meridian_arc(self.lat0) + y / self.k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let c1 = ep2 * cos1 * cos1;
        let t1 = phi1.tan().powi(2);
        let n1 = a / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = x / (n1 * self.k0);

        let lat = phi1
            - (n1 * phi1.tan() / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos1;
        (lon, lat)
    }
}

/// The projections a `.prj` file may name.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Mercator(Mercator),
    LambertConformal(LambertConformalConic),
    TransverseMercator(TransverseMercator),
}

impl MapProjection for Projection {
    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Mercator(p) => p.forward(lon, lat),
            Projection::LambertConformal(p) => p.forward(lon, lat),
            Projection::TransverseMercator(p) => p.forward(lon, lat),
        }
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Mercator(p) => p.inverse(x, y),
            Projection::LambertConformal(p) => p.inverse(x, y),
            Projection::TransverseMercator(p) => p.inverse(x, y),
        }
    }
}

/// Geographic part of a CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCrs {
    pub datum: String,
    pub ellipsoid: Ellipsoid,
    /// Prime meridian east of Greenwich, degrees
    pub prime_meridian: f64,
}

impl GeographicCrs {
    pub fn wgs84() -> Self {
        GeographicCrs {
            datum: "WGS_1984".to_string(),
            ellipsoid: Ellipsoid::wgs84(),
            prime_meridian: 0.0,
        }
    }

    pub fn is_wgs84(&self) -> bool {
        let datum = self.datum.to_ascii_uppercase().replace([' ', '-'], "_");
        datum.contains("WGS_1984") || datum.contains("WGS84") || datum.contains("WORLD_GEODETIC_SYSTEM_1984")
    }

    fn from_wkt(node: &WktNode) -> Result<Self, ProjectionError> {
        let datum_node = node
            .child("DATUM")
            .ok_or_else(|| ProjectionError::Missing("DATUM".to_string()))?;
        let datum = datum_node.text(0).unwrap_or_default().to_string();
        let ellipsoid = datum_node
            .child("SPHEROID")
            .or_else(|| datum_node.child("ELLIPSOID"))
            .and_then(|sph| Some(Ellipsoid::from_inverse_flattening(sph.number(1)?, sph.number(2)?)))
            .unwrap_or_else(Ellipsoid::wgs84);
        let prime_meridian = node.child("PRIMEM").and_then(|p| p.number(1)).unwrap_or(0.0);
        Ok(GeographicCrs {
            datum,
            ellipsoid,
            prime_meridian,
        })
    }
}

/// Projected CRS: projection plus false origin and linear unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCrs {
    pub name: String,
    pub geographic: GeographicCrs,
    pub projection: Projection,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Metres per CRS linear unit
    pub unit: f64,
}

/// Coordinate reference system of a boundary dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    Geographic(GeographicCrs),
    Projected(ProjectedCrs),
}

impl Crs {
    pub fn wgs84() -> Self {
        Crs::Geographic(GeographicCrs::wgs84())
    }

    /// Builds a CRS from the contents of a `.prj` file.
    pub fn from_wkt(text: &str) -> Result<Self, ProjectionError> {
        let root = WktNode::parse(text.trim())?;
        let keyword = root.keyword.to_ascii_uppercase();
        let crs = match keyword.as_str() {
            "GEOGCS" | "GEOGCRS" => Crs::Geographic(GeographicCrs::from_wkt(&root)?),
            "PROJCS" => Crs::Projected(projected_from_wkt(&root)?),
            _ => return Err(ProjectionError::UnsupportedCrs(root.keyword.clone())),
        };
        crs.warn_on_datum();
        Ok(crs)
    }

    pub fn name(&self) -> String {
        match self {
            Crs::Geographic(geo) => format!("geographic ({})", geo.datum),
            Crs::Projected(proj) => proj.name.clone(),
        }
    }

    pub fn is_wgs84_geographic(&self) -> bool {
        matches!(self, Crs::Geographic(geo) if geo.is_wgs84() && geo.prime_meridian == 0.0)
    }

    fn warn_on_datum(&self) {
        let geo = match self {
            Crs::Geographic(geo) => geo,
            Crs::Projected(proj) => &proj.geographic,
        };
        if !geo.is_wgs84() {
            warn!(
                "Datum '{}' is not WGS84; coordinates are used without a datum shift",
                geo.datum
            );
        }
    }

    /// Converts a coordinate in this CRS to WGS84 `(lon, lat)` degrees.
    pub fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Crs::Geographic(geo) => (x + geo.prime_meridian, y),
            Crs::Projected(proj) => {
                let xm = (x - proj.false_easting) * proj.unit;
                let ym = (y - proj.false_northing) * proj.unit;
                let (lon, lat) = proj.projection.inverse(xm, ym);
                (lon.to_degrees() + proj.geographic.prime_meridian, lat.to_degrees())
            }
        }
    }
}

fn projected_from_wkt(root: &WktNode) -> Result<ProjectedCrs, ProjectionError> {
    let name = root.text(0).unwrap_or_default().to_string();
    let geographic = match root.child("GEOGCS") {
        Some(node) => GeographicCrs::from_wkt(node)?,
        None => GeographicCrs::wgs84(),
    };
    let method = root
        .child("PROJECTION")
        .and_then(|p| p.text(0))
        .ok_or_else(|| ProjectionError::Missing("PROJECTION".to_string()))?
        .to_string();

    let deg = |names: &[&str]| root.parameter(names).unwrap_or(0.0).to_radians();
    let lon0 = deg(&["central_meridian", "longitude_of_origin", "longitude_of_center", "longitude_of_natural_origin"]);
    let lat0 = deg(&["latitude_of_origin", "latitude_of_center", "latitude_of_natural_origin", "latitude_of_false_origin"]);
    let k0 = root
        .parameter(&["scale_factor", "scale_factor_at_natural_origin"])
        .unwrap_or(1.0);
    let ellipsoid = geographic.ellipsoid;

    let normalized = method.to_ascii_lowercase().replace(' ', "_");
    let projection = if normalized.contains("auxiliary_sphere") || normalized.contains("pseudo_mercator") {
        Projection::Mercator(Mercator {
            ellipsoid: Ellipsoid::sphere(ellipsoid.a),
            lon0,
            k0: 1.0,
        })
    } else if normalized.starts_with("mercator") {
        let k0 = match root.parameter(&["standard_parallel_1"]) {
            Some(lat_ts) if lat_ts != 0.0 => msfn(lat_ts.to_radians(), ellipsoid.e2),
            _ => k0,
        };
        Projection::Mercator(Mercator { ellipsoid, lon0, k0 })
    } else if normalized.starts_with("lambert_conformal_conic") {
        let lat1 = root
            .parameter(&["standard_parallel_1"])
            .map(f64::to_radians)
            .unwrap_or(lat0);
        let lat2 = root
            .parameter(&["standard_parallel_2"])
            .map(f64::to_radians)
            .unwrap_or(lat1);
        Projection::LambertConformal(LambertConformalConic::new(ellipsoid, lon0, lat0, lat1, lat2, k0))
    } else if normalized == "transverse_mercator" || normalized == "gauss_kruger" {
        Projection::TransverseMercator(TransverseMercator {
            ellipsoid,
            lon0,
            lat0,
            k0,
        })
    } else {
        return Err(ProjectionError::UnsupportedProjection(method));
    };

    Ok(ProjectedCrs {
        name,
        geographic,
        projection,
        false_easting: root.parameter(&["false_easting"]).unwrap_or(0.0),
        false_northing: root.parameter(&["false_northing"]).unwrap_or(0.0),
        unit: root.child("UNIT").and_then(|u| u.number(1)).unwrap_or(1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOGCS_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    const WEB_MERCATOR: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;

    const UTM_44N: &str = r#"PROJCS["WGS_1984_UTM_Zone_44N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",81.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

    const INDIA_LCC: &str = r#"PROJCS["India_LCC",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",4000000.0],PARAMETER["False_Northing",4000000.0],PARAMETER["Central_Meridian",80.0],PARAMETER["Standard_Parallel_1",12.472955],PARAMETER["Standard_Parallel_2",35.17280444],PARAMETER["Scale_Factor",1.0],PARAMETER["Latitude_Of_Origin",24.0],UNIT["Meter",1.0]]"#;

    fn assert_close(actual: (f64, f64), expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.0 - expected.0).abs() < tolerance && (actual.1 - expected.1).abs() < tolerance,
            "{:?} != {:?}",
            actual,
            expected
        );
    }

    #[test]
    fn test_parse_wkt_tree() {
        let node = WktNode::parse(GEOGCS_WGS84).unwrap();
        assert_eq!(node.keyword, "GEOGCS");
        assert_eq!(node.text(0), Some("GCS_WGS_1984"));
        let spheroid = node.child("DATUM").unwrap().child("SPHEROID").unwrap();
        assert_eq!(spheroid.number(1), Some(6378137.0));
    }

    #[test]
    fn test_parse_wkt_with_parentheses_and_enums() {
        let node = WktNode::parse(r#"LOCAL_CS("x", AXIS("Easting", EAST))"#).unwrap();
        let axis = node.child("AXIS").unwrap();
        assert_eq!(axis.values[1], WktValue::Text("EAST".to_string()));
    }

    #[test]
    fn test_malformed_wkt() {
        assert!(matches!(
            WktNode::parse(r#"GEOGCS["unterminated"#),
            Err(ProjectionError::Malformed { .. })
        ));
        assert!(WktNode::parse("GEOGCS").is_err());
        assert!(WktNode::parse(r#"GEOGCS["a"] trailing"#).is_err());
    }

    #[test]
    fn test_geographic_is_passthrough() {
        let crs = Crs::from_wkt(GEOGCS_WGS84).unwrap();
        assert!(crs.is_wgs84_geographic());
        assert_eq!(crs.to_wgs84(77.2, 28.6), (77.2, 28.6));
    }

    #[test]
    fn test_non_wgs84_datum_is_accepted() {
        let wkt = r#"GEOGCS["Kalianpur 1975",DATUM["Kalianpur_1975",SPHEROID["Everest 1830 (1975 Definition)",6377299.151,300.8017255]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;
        let crs = Crs::from_wkt(wkt).unwrap();
        assert!(!crs.is_wgs84_geographic());
        assert_eq!(crs.to_wgs84(80.0, 20.0), (80.0, 20.0));
    }

    #[test]
    fn test_web_mercator_inverse_known_point() {
        let crs = Crs::from_wkt(WEB_MERCATOR).unwrap();
        let (lon, lat) = crs.to_wgs84(8_905_559.263_461_886, 2_273_030.926_987_689);
        assert_close((lon, lat), (80.0, 20.0), 1e-6);
    }

    #[test]
    fn test_utm_central_meridian() {
        let crs = Crs::from_wkt(UTM_44N).unwrap();
        assert_close(crs.to_wgs84(500_000.0, 0.0), (81.0, 0.0), 1e-9);

        if let Crs::Projected(proj) = &crs {
            let (x, y) = proj.projection.forward(78f64.to_radians(), 20f64.to_radians());
            assert!(x < 0.0, "west of the central meridian");
            let back = crs.to_wgs84(x + 500_000.0, y);
            assert_close(back, (78.0, 20.0), 1e-7);
        } else {
            panic!("Expected projected CRS");
        }
    }

    #[test]
    fn test_lambert_conformal_roundtrip() {
        let crs = Crs::from_wkt(INDIA_LCC).unwrap();
        // Origin maps to the false origin
        assert_close(crs.to_wgs84(4_000_000.0, 4_000_000.0), (80.0, 24.0), 1e-9);

        let proj = match &crs {
            Crs::Projected(proj) => proj,
            _ => panic!("Expected projected CRS"),
        };
        for (lon, lat) in [(68.0, 8.0), (97.0, 35.0), (88.4, 22.6)] {
            let (x, y) = proj.projection.forward(f64::to_radians(lon), f64::to_radians(lat));
            let back = crs.to_wgs84(x + proj.false_easting, y + proj.false_northing);
            assert_close(back, (lon, lat), 1e-8);
        }
    }

    #[test]
    fn test_mercator_2sp_scale() {
        let wkt = r#"PROJCS["merc",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0]],PROJECTION["Mercator_2SP"],PARAMETER["standard_parallel_1",20],PARAMETER["central_meridian",75],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1]]"#;
        let crs = Crs::from_wkt(wkt).unwrap();
        if let Crs::Projected(proj) = &crs {
            let (x, y) = proj.projection.forward(85f64.to_radians(), 15f64.to_radians());
            assert_close(crs.to_wgs84(x, y), (85.0, 15.0), 1e-8);
        } else {
            panic!("Expected projected CRS");
        }
    }

    #[test]
    fn test_unit_and_false_origin_in_feet() {
        let wkt = UTM_44N.replace(r#"UNIT["Meter",1.0]]"#, r#"UNIT["Foot_US",0.3048006096012192]]"#)
            .replace("500000.0", "1640416.6667");
        let crs = Crs::from_wkt(&wkt).unwrap();
        assert_close(crs.to_wgs84(1_640_416.6667, 0.0), (81.0, 0.0), 1e-6);
    }

    #[test]
    fn test_unsupported_projection() {
        let wkt = UTM_44N.replace("Transverse_Mercator", "Polyconic");
        assert_eq!(
            Crs::from_wkt(&wkt),
            Err(ProjectionError::UnsupportedProjection("Polyconic".to_string()))
        );
        assert!(matches!(
            Crs::from_wkt(r#"VERT_CS["height"]"#),
            Err(ProjectionError::UnsupportedCrs(_))
        ));
    }
}
