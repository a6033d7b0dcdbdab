//! CSV loaders for the demand table and the pairwise distance matrix.
//!
//! # Demand table
//!
//! One row per site, in master-table order. `Latitude` and `Longitude` are
//! required; every column whose header is an integer is a year of forecast
//! demand. Other columns (such as `Index`) are ignored.
//!
//! ```csv
//! Index,Latitude,Longitude,2018,2019
//! 0,24.66818,71.33144,8.47,8.86
//! 1,24.66818,71.41106,24.02,28.55
//! ```
//!
//! # Distance matrix
//!
//! Square, with a header row of column labels and a leading row-label
//! column; both are ignored and position gives the site index.

use std::io::Read;
use std::path::Path;

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::model::{DemandTable, Site};

pub fn load_demand_csv(path: &Path) -> Result<DemandTable> {
    let file = std::fs::File::open(path)?;
    load_demand_reader(file)
}

/// Like [`load_demand_csv`] but accepts any `Read` source.
pub fn load_demand_reader<R: Read>(reader: R) -> Result<DemandTable> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::Parse(format!("demand table has no {name} column")))
    };
    let lat_col = column("Latitude")?;
    let lon_col = column("Longitude")?;
    let year_cols: Vec<(usize, u32)> = headers
        .iter()
        .enumerate()
        .filter_map(|(pos, h)| h.trim().parse::<u32>().ok().map(|y| (pos, y)))
        .collect();

    let mut sites = Vec::new();
    let mut demand: Vec<Vec<f64>> = vec![Vec::new(); year_cols.len()];

    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;
        let field = |pos: usize| -> Result<f64> {
            let raw = record.get(pos).unwrap_or("").trim();
            raw.parse::<f64>()
                .map_err(|e| Error::Parse(format!("row {row}, column {}: {raw:?}: {e}", &headers[pos])))
        };
        sites.push(Site::new(row, field(lat_col)?, field(lon_col)?));
        for (column, &(pos, _)) in demand.iter_mut().zip(&year_cols) {
            column.push(field(pos)?);
        }
    }

    let years = year_cols.into_iter().map(|(_, y)| y).collect();
    DemandTable::new(sites, years, demand)
}

pub fn load_distance_csv(path: &Path) -> Result<DistanceMatrix> {
    let file = std::fs::File::open(path)?;
    load_distance_reader(file)
}

pub fn load_distance_reader<R: Read>(reader: R) -> Result<DistanceMatrix> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let record = result?;
        let values = record
            .iter()
            .skip(1)
            .map(|raw| {
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| Error::Parse(format!("distance row {row}: {raw:?}: {e}")))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }
    DistanceMatrix::from_rows(rows)
}
