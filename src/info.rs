//! # NetCDF File Information Module
//!
//! Inspection of NetCDF inputs for the `info` subcommand: dimensions, variables and
//! attributes, plus the decoded coverage of the time axis when one can be found.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::grid::{TIME_ALIASES, string_attr};
use crate::timeaxis::decode_time_axis;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfDimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfVariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub shape: Vec<usize>,
}

/// Decoded extent of the time axis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeCoverage {
    pub variable: String,
    pub units: String,
    pub calendar: String,
    pub steps: usize,
    pub first: Option<String>,
    pub last: Option<String>,
}

/// Complete information about a NetCDF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetCdfInfo {
    pub path: String,
    pub dimensions: Vec<NetCdfDimensionInfo>,
    pub variables: Vec<NetCdfVariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
    pub time_coverage: Option<TimeCoverage>,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub total_dimensions: usize,
}

/// Extracts structure information from a NetCDF file.
///
/// `variable` restricts the variable listing to one name; `detailed` adds the global
/// attributes. The time coverage is reported whenever a time variable with `units`
/// is present, whether or not it is part of the listing.
pub fn get_netcdf_info(file_path: &str, variable: Option<&str>, detailed: bool) -> Result<NetCdfInfo> {
    debug!("Opening NetCDF file: {}", file_path);
    let file = netcdf::open(file_path).with_context(|| format!("Failed to open NetCDF file: {}", file_path))?;

    let file_size = std::fs::metadata(Path::new(file_path)).ok().map(|m| m.len());

    let dimensions: Vec<NetCdfDimensionInfo> = file
        .dimensions()
        .map(|dim| NetCdfDimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        if let Some(name) = variable
            && var.name() != name
        {
            continue;
        }
        let attributes = var
            .attributes()
            .filter_map(|attr| Some((attr.name().to_string(), format_attribute_value(&attr.value().ok()?))))
            .collect();
        variables.push(NetCdfVariableInfo {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            attributes,
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
        });
    }
    if let Some(name) = variable
        && variables.is_empty()
    {
        anyhow::bail!("Variable '{}' not found in {}", name, file_path);
    }

    let mut global_attributes = BTreeMap::new();
    if detailed {
        for attr in file.attributes() {
            if let Ok(value) = attr.value() {
                global_attributes.insert(attr.name().to_string(), format_attribute_value(&value));
            }
        }
    }

    let time_coverage = time_coverage(&file)?;

    Ok(NetCdfInfo {
        path: file_path.to_string(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        global_attributes,
        time_coverage,
        file_size,
    })
}

/// Finds the time variable (by name, then by a "since" units string) and decodes its ends.
fn time_coverage(file: &netcdf::File) -> Result<Option<TimeCoverage>> {
    let by_name = TIME_ALIASES
        .iter()
        .filter_map(|name| file.variable(name))
        .find(|var| string_attr(var, "units").is_some());
    let candidate = by_name.or_else(|| {
        file.variables().find(|var| {
            var.dimensions().len() == 1
                && string_attr(var, "units").is_some_and(|units| units.to_ascii_lowercase().contains(" since "))
        })
    });
    let Some(var) = candidate else {
        debug!("No time variable with units found");
        return Ok(None);
    };

    let units = string_attr(&var, "units").unwrap_or_default();
    let calendar = string_attr(&var, "calendar");
    let values: Vec<f64> = var
        .get_values(..)
        .with_context(|| format!("Failed to read time variable '{}'", var.name()))?;
    let times = decode_time_axis(&values, &units, calendar.as_deref())
        .with_context(|| format!("Failed to decode time variable '{}'", var.name()))?;

    Ok(Some(TimeCoverage {
        variable: var.name().to_string(),
        units,
        calendar: calendar.unwrap_or_else(|| "standard".to_string()),
        steps: times.len(),
        first: times.first().map(|t| t.to_string()),
        last: times.last().map(|t| t.to_string()),
    }))
}

/// Format netcdf attribute value for display
fn format_attribute_value(value: &netcdf::AttributeValue) -> String {
    use netcdf::AttributeValue as V;
    match value {
        V::Str(text) => text.clone(),
        V::Strs(texts) => texts.join(", "),
        V::Double(v) => v.to_string(),
        V::Float(v) => v.to_string(),
        V::Int(v) => v.to_string(),
        V::Short(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}

/// Print NetCDF info in human-readable format
pub fn print_file_info_human(info: &NetCdfInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.total_dimensions);
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.total_variables);
    for var in &info.variables {
        println!("    {} ({}) - dimensions: [{}]", var.name, var.data_type, var.dimensions.join(", "));
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if let Some(coverage) = &info.time_coverage {
        println!("  Time Axis: '{}' ({}, {} calendar)", coverage.variable, coverage.units, coverage.calendar);
        println!(
            "    {} steps from {} to {}",
            coverage.steps,
            coverage.first.as_deref().unwrap_or("-"),
            coverage.last.as_deref().unwrap_or("-")
        );
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

/// Print NetCDF info in JSON format
pub fn print_file_info_json(info: &NetCdfInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print NetCDF info in YAML format
pub fn print_file_info_yaml(info: &NetCdfInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize NetCDF info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::GridFixture;
    use tempfile::tempdir;

    #[test]
    fn test_info_lists_structure_and_time_coverage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rain.nc");
        GridFixture::constant(2.0, 3).write(&path).unwrap();

        let info = get_netcdf_info(path.to_str().unwrap(), None, true).unwrap();
        let names: Vec<&str> = info.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"lat") && names.contains(&"lon") && names.contains(&"datetime"));
        assert_eq!(info.total_variables, 4);

        let precip = info.variables.iter().find(|v| v.name == "precip").unwrap();
        assert_eq!(precip.shape, vec![3, 3, 3]);
        assert_eq!(precip.attributes.get("units").map(String::as_str), Some("mm"));

        let coverage = info.time_coverage.unwrap();
        assert_eq!(coverage.variable, "datetime");
        assert_eq!(coverage.steps, 3);
        assert_eq!(coverage.calendar, "standard");
        assert_eq!(coverage.first.as_deref(), Some("2023-07-01 00:00:00"));
        assert_eq!(coverage.last.as_deref(), Some("2023-07-03 00:00:00"));
    }

    #[test]
    fn test_info_single_variable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rain.nc");
        GridFixture::constant(2.0, 2).write(&path).unwrap();

        let info = get_netcdf_info(path.to_str().unwrap(), Some("lat"), false).unwrap();
        assert_eq!(info.variables.len(), 1);
        assert_eq!(info.variables[0].name, "lat");
        assert!(info.global_attributes.is_empty());

        assert!(get_netcdf_info(path.to_str().unwrap(), Some("nope"), false).is_err());
    }

    #[test]
    fn test_info_serializes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rain.nc");
        GridFixture::constant(2.0, 2).write(&path).unwrap();

        let info = get_netcdf_info(path.to_str().unwrap(), None, false).unwrap();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["time_coverage"]["steps"], 2);
        assert!(serde_yaml::to_string(&info).unwrap().contains("time_coverage"));
    }

    #[test]
    fn test_missing_file() {
        assert!(get_netcdf_info("/nonexistent/rain.nc", None, false).is_err());
    }
}
