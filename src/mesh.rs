//! # Mesh
//!
//! The 2-D longitude/latitude coordinate arrays behind the pseudocolour raster, plus the
//! cell edges each grid point owns. Built once from the axes and reused for every frame.

/// Outer-product expansion of the grid axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Longitude of every grid point, `[lat][lon]` order
    pub lon2d: Vec<f64>,
    /// Latitude of every grid point, `[lat][lon]` order
    pub lat2d: Vec<f64>,
    /// `lon_len + 1` cell boundaries along longitude
    pub lon_edges: Vec<f64>,
    /// `lat_len + 1` cell boundaries along latitude
    pub lat_edges: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Mesh {
    /// Expands 1-D axes into the mesh. Axes may run in either direction.
    pub fn from_axes(lons: &[f64], lats: &[f64]) -> Self {
        let rows = lats.len();
        let cols = lons.len();
        let mut lon2d = Vec::with_capacity(rows * cols);
        let mut lat2d = Vec::with_capacity(rows * cols);
        for &lat in lats {
            for &lon in lons {
                lon2d.push(lon);
                lat2d.push(lat);
            }
        }
        Mesh {
            lon2d,
            lat2d,
            lon_edges: axis_edges(lons),
            lat_edges: axis_edges(lats),
            rows,
            cols,
        }
    }

    /// `(rows, cols)`, that is `(lat_len, lon_len)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Column whose cell contains `lon`, if any.
    pub fn lon_cell(&self, lon: f64) -> Option<usize> {
        locate(&self.lon_edges, lon)
    }

    /// Row whose cell contains `lat`, if any.
    pub fn lat_cell(&self, lat: f64) -> Option<usize> {
        locate(&self.lat_edges, lat)
    }

    /// Area covered by the cells: `(lon_min, lon_max, lat_min, lat_max)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (lon_a, lon_b) = ends(&self.lon_edges);
        let (lat_a, lat_b) = ends(&self.lat_edges);
        (lon_a.min(lon_b), lon_a.max(lon_b), lat_a.min(lat_b), lat_a.max(lat_b))
    }
}

fn ends(edges: &[f64]) -> (f64, f64) {
    match (edges.first(), edges.last()) {
        (Some(&a), Some(&b)) => (a, b),
        _ => (f64::NAN, f64::NAN),
    }
}

/// Cell boundaries halfway between points, extrapolated by half a step at both ends.
///
/// A single point gets a cell one unit wide.
pub fn axis_edges(axis: &[f64]) -> Vec<f64> {
    match axis.len() {
        0 => Vec::new(),
        1 => vec![axis[0] - 0.5, axis[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(axis[0] - (axis[1] - axis[0]) / 2.0);
            edges.extend(axis.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(axis[n - 1] + (axis[n - 1] - axis[n - 2]) / 2.0);
            edges
        }
    }
}

/// Index of the cell containing `value` in monotonic `edges`.
fn locate(edges: &[f64], value: f64) -> Option<usize> {
    let cells = edges.len().checked_sub(1).filter(|&n| n > 0)?;
    let (first, last) = ends(edges);
    if !value.is_finite() || value < first.min(last) || value > first.max(last) {
        return None;
    }
    let index = if first <= last {
        edges.partition_point(|&e| e <= value).saturating_sub(1)
    } else {
        edges.partition_point(|&e| e > value).saturating_sub(1)
    };
    Some(index.min(cells - 1))
}
