use rayon::prelude::*;

use crate::error::{Error, Result};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two `(lat, lon)` points in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let d_lat = lat2_rad - lat1_rad;
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Dense row-major distance matrix indexed by site index on both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n_rows: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != n_cols) {
            return Err(Error::Parse(format!(
                "distance row {bad} has {} columns, expected {n_cols}",
                rows[bad].len()
            )));
        }
        Ok(Self {
            n_rows,
            n_cols,
            values: rows.into_iter().flatten().collect(),
        })
    }

    pub fn nrows(&self) -> usize {
        self.n_rows
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n_cols + j]
    }

    /// Check the matrix covers `n` sites on both axes.
    pub fn ensure_square(&self, n: usize) -> Result<()> {
        if self.n_rows != n || self.n_cols != n {
            return Err(Error::Parse(format!(
                "distance matrix is {}x{}, expected {n}x{n}",
                self.n_rows, self.n_cols
            )));
        }
        Ok(())
    }
}

/// Compute the haversine distance matrix between two sets of `(lat, lon)` points.
pub fn haversine_matrix(from: &[(f64, f64)], to: &[(f64, f64)]) -> DistanceMatrix {
    let n1 = from.len();
    let n2 = to.len();

    let row = |&(lat1, lon1): &(f64, f64)| {
        to.iter()
            .map(|&(lat2, lon2)| haversine_km(lat1, lon1, lat2, lon2))
            .collect::<Vec<_>>()
    };

    // Compute distances in parallel for large matrices
    let values: Vec<f64> = if n1 * n2 > 10000 {
        from.par_iter().flat_map(row).collect()
    } else {
        from.iter().flat_map(row).collect()
    };

    DistanceMatrix {
        n_rows: n1,
        n_cols: n2,
        values,
    }
}
