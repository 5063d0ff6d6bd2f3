//! # Grid Loader
//!
//! Reads the precipitation field, its latitude/longitude axes and the decoded time axis
//! from a NetCDF file into a [`GriddedField`].
//!
//! The loader validates everything up front so a bad file fails with a clear message
//! before any rendering starts:
//!
//! - all four variables exist (configured names first, then CF aliases)
//! - the field is 3-D, ordered `(time, lat, lon)` or `(time, lon, lat)`
//! - axis lengths match the field dimensions
//! - latitude and longitude are strictly monotonic
//! - the decoded time axis is strictly increasing with at least one step

use log::{debug, info};
use std::path::Path;

use crate::error::{Nc2GifError, Result};
use crate::input::VariableConfig;
use crate::timeaxis::{CfDateTime, decode_time_axis, ensure_strictly_increasing};

const LAT_ALIASES: &[&str] = &["lat", "latitude", "y"];
const LON_ALIASES: &[&str] = &["lon", "longitude", "x"];
pub(crate) const TIME_ALIASES: &[&str] = &["datetime", "time"];

/// A time series of 2-D scalar grids.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    /// Values in `[time][lat][lon]` order; missing cells are NaN
    values: Vec<f32>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub times: Vec<CfDateTime>,
    /// `units` attribute of the field, when present
    pub units: Option<String>,
}

impl GriddedField {
    /// Builds a field from `[time][lat][lon]` values, checking every shape invariant.
    pub fn new(values: Vec<f32>, lats: Vec<f64>, lons: Vec<f64>, times: Vec<CfDateTime>) -> Result<Self> {
        if times.is_empty() {
            return Err(Nc2GifError::ShapeMismatch("time axis has no steps".to_string()));
        }
        check_monotonic("latitude", &lats)?;
        check_monotonic("longitude", &lons)?;
        ensure_strictly_increasing(&times)?;

        let expected = times.len() * lats.len() * lons.len();
        if values.len() != expected {
            return Err(Nc2GifError::ShapeMismatch(format!(
                "field has {} values, expected {} x {} x {} = {}",
                values.len(),
                times.len(),
                lats.len(),
                lons.len(),
                expected
            )));
        }

        Ok(GriddedField {
            values,
            lats,
            lons,
            times,
            units: None,
        })
    }

    pub fn time_len(&self) -> usize {
        self.times.len()
    }

    pub fn lat_len(&self) -> usize {
        self.lats.len()
    }

    pub fn lon_len(&self) -> usize {
        self.lons.len()
    }

    /// The `[lat][lon]` grid for one time step.
    ///
    /// # Panics
    ///
    /// Panics if `t >= self.time_len()`.
    pub fn slice(&self, t: usize) -> &[f32] {
        let size = self.lat_len() * self.lon_len();
        &self.values[t * size..(t + 1) * size]
    }

    /// Minimum and maximum over all finite values, or `None` if every cell is missing.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of missing (NaN) cells across all steps.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Loads a [`GriddedField`] from a NetCDF file.
///
/// # Arguments
///
/// * `path` - NetCDF file to read
/// * `names` - Variable names for the field and its three axes
///
/// # Examples
///
/// ```rust,no_run
/// use nc2gif::grid::load_gridded_field;
/// use nc2gif::input::VariableConfig;
/// use std::path::Path;
///
/// let field = load_gridded_field(Path::new("rainfall.nc"), &VariableConfig::default())?;
/// println!("{} steps starting {}", field.time_len(), field.times[0]);
/// # Ok::<(), nc2gif::Nc2GifError>(())
/// ```
pub fn load_gridded_field(path: &Path, names: &VariableConfig) -> Result<GriddedField> {
    let display = path.display().to_string();
    let file = netcdf::open(path)?;

    let precip = find_variable(&file, &names.precip, &[], &display)?;
    let lat_var = find_variable(&file, &names.lat, LAT_ALIASES, &display)?;
    let lon_var = find_variable(&file, &names.lon, LON_ALIASES, &display)?;
    let time_var = find_variable(&file, &names.time, TIME_ALIASES, &display)?;

    let lats: Vec<f64> = lat_var.get_values(..)?;
    let lons: Vec<f64> = lon_var.get_values(..)?;
    let raw_times: Vec<f64> = time_var.get_values(..)?;

    let time_units = string_attr(&time_var, "units").ok_or_else(|| Nc2GifError::MissingAttribute {
        variable: time_var.name().to_string(),
        attribute: "units".to_string(),
    })?;
    let calendar = string_attr(&time_var, "calendar");
    debug!(
        "Time axis '{}': units '{}', calendar {}",
        time_var.name(),
        time_units,
        calendar.as_deref().unwrap_or("standard (default)")
    );
    let times = decode_time_axis(&raw_times, &time_units, calendar.as_deref())?;

    let dims = precip.dimensions();
    if dims.len() != 3 {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "'{}' must have 3 dimensions (time, lat, lon), found {}",
            precip.name(),
            dims.len()
        )));
    }
    let dim_names: Vec<String> = dims.iter().map(|d| d.name().to_string()).collect();
    let dim_lens: Vec<usize> = dims.iter().map(|d| d.len()).collect();
    debug!("'{}' dimensions: {:?} {:?}", precip.name(), dim_names, dim_lens);

    if dim_lens[0] != times.len() {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "'{}' has {} time steps but the time axis has {}",
            precip.name(),
            dim_lens[0],
            times.len()
        )));
    }

    let lat_dim = axis_dimension(&lat_var);
    let lon_dim = axis_dimension(&lon_var);
    let lon_first = matches!(
        (&lat_dim, &lon_dim),
        (Some(lat_dim), Some(lon_dim)) if dim_names[1] == *lon_dim && dim_names[2] == *lat_dim
    );
    let (rows, cols) = if lon_first {
        (lons.len(), lats.len())
    } else {
        (lats.len(), lons.len())
    };
    if dim_lens[1] != rows || dim_lens[2] != cols {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "'{}' is {} x {} per step but the axes give {} latitudes and {} longitudes",
            precip.name(),
            dim_lens[1],
            dim_lens[2],
            lats.len(),
            lons.len()
        )));
    }

    let raw: Vec<f32> = precip.get_values(..)?;
    let mut values = unpack(&precip, raw);
    if lon_first {
        debug!("Transposing '{}' from (time, lon, lat)", precip.name());
        values = transpose_steps(&values, times.len(), lons.len(), lats.len());
    }

    let mut field = GriddedField::new(values, lats, lons, times)?;
    field.units = string_attr(&precip, "units");

    info!(
        "Loaded '{}' from {}: {} steps, {} x {} grid ({} to {})",
        precip.name(),
        display,
        field.time_len(),
        field.lat_len(),
        field.lon_len(),
        field.times[0],
        field.times[field.time_len() - 1]
    );
    Ok(field)
}

fn find_variable<'f>(
    file: &'f netcdf::File,
    name: &str,
    aliases: &[&str],
    path: &str,
) -> Result<netcdf::Variable<'f>> {
    if let Some(var) = file.variable(name) {
        return Ok(var);
    }
    for alias in aliases.iter().filter(|alias| **alias != name) {
        if let Some(var) = file.variable(alias) {
            debug!("Variable '{}' not found, using '{}'", name, alias);
            return Ok(var);
        }
    }
    Err(Nc2GifError::MissingVariable {
        variable: name.to_string(),
        path: path.to_string(),
    })
}

fn axis_dimension(var: &netcdf::Variable) -> Option<String> {
    var.dimensions().first().map(|d| d.name().to_string())
}

fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

pub(crate) fn string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(text) => Some(text),
        netcdf::AttributeValue::Strs(texts) => texts.into_iter().next(),
        _ => None,
    }
}

/// Applies `scale_factor`/`add_offset` and masks `_FillValue`/`missing_value` cells.
fn unpack(var: &netcdf::Variable, raw: Vec<f32>) -> Vec<f32> {
    let scale = f64_attr(var, "scale_factor").unwrap_or(1.0);
    let offset = f64_attr(var, "add_offset").unwrap_or(0.0);
    let fills: Vec<f32> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| f64_attr(var, name))
        .map(|v| v as f32)
        .collect();

    if scale == 1.0 && offset == 0.0 && fills.is_empty() {
        return raw;
    }
    raw.into_iter()
        .map(|v| {
            if v.is_nan() || fills.contains(&v) {
                f32::NAN
            } else {
                (v as f64 * scale + offset) as f32
            }
        })
        .collect()
}

/// `[t][a][b]` to `[t][b][a]`.
fn transpose_steps(values: &[f32], steps: usize, a: usize, b: usize) -> Vec<f32> {
    let mut out = vec![f32::NAN; values.len()];
    for t in 0..steps {
        let base = t * a * b;
        for i in 0..a {
            for j in 0..b {
                out[base + j * a + i] = values[base + i * b + j];
            }
        }
    }
    out
}

fn check_monotonic(name: &str, axis: &[f64]) -> Result<()> {
    if axis.is_empty() {
        return Err(Nc2GifError::ShapeMismatch(format!("{} axis is empty", name)));
    }
    if let Some(bad) = axis.iter().position(|v| !v.is_finite()) {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "{} axis has a non-finite value at index {}",
            name, bad
        )));
    }
    let increasing = axis.windows(2).all(|w| w[1] > w[0]);
    let decreasing = axis.windows(2).all(|w| w[1] < w[0]);
    if increasing || decreasing {
        Ok(())
    } else {
        Err(Nc2GifError::ShapeMismatch(format!(
            "{} axis is not strictly monotonic",
            name
        )))
    }
}
