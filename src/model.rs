//! Core data types: sites, zones, facilities and the master location index.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// A harvesting site. `index` is its row in the master location table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub index: usize,
    pub lat: f64,
    pub lon: f64,
}

impl Site {
    pub fn new(index: usize, lat: f64, lon: f64) -> Self {
        Self { index, lat, lon }
    }
}

/// A subset of sites produced by the partitioner.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: usize,
    /// Site indices into the master table.
    pub members: Vec<usize>,
    /// Aggregate demand of the members for the reference year.
    pub demand: f64,
}

impl Zone {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityKind {
    Depot,
    Refinery,
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityKind::Depot => write!(f, "depot"),
            FacilityKind::Refinery => write!(f, "refinery"),
        }
    }
}

/// A sited depot or refinery. Its coordinate always equals some site's
/// coordinate, and `source_index` is that site's index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facility {
    pub kind: FacilityKind,
    pub lat: f64,
    pub lon: f64,
    pub source_index: usize,
    pub capacity: f64,
}

/// Immutable coordinate → site index lookup built once per run.
///
/// Keys are the exact `"{lat}_{lon}"` rendering of the coordinates, so a
/// facility resolves only if it sits on a site bit-for-bit.
#[derive(Debug, Clone)]
pub struct LocationIndex {
    by_key: HashMap<String, usize>,
    coords: Vec<(f64, f64)>,
}

impl LocationIndex {
    /// Build from the master site table. When two sites share a coordinate
    /// the lowest index wins.
    pub fn from_sites(sites: &[Site]) -> Self {
        let mut by_key = HashMap::with_capacity(sites.len());
        let mut coords = vec![(0.0, 0.0); sites.len()];
        for site in sites {
            by_key.entry(location_key(site.lat, site.lon)).or_insert(site.index);
            if site.index < coords.len() {
                coords[site.index] = (site.lat, site.lon);
            }
        }
        Self { by_key, coords }
    }

    pub fn lookup(&self, lat: f64, lon: f64) -> Result<usize> {
        let key = location_key(lat, lon);
        self.by_key
            .get(&key)
            .copied()
            .ok_or(Error::LocationLookup(key))
    }

    /// Coordinate of a site index, `(lat, lon)`.
    pub fn coordinate(&self, index: usize) -> Option<(f64, f64)> {
        self.coords.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

pub fn location_key(lat: f64, lon: f64) -> String {
    format!("{lat}_{lon}")
}

/// Forecast demand per site and year.
#[derive(Debug, Clone)]
pub struct DemandTable {
    sites: Vec<Site>,
    years: Vec<u32>,
    /// `demand[y][i]` = demand of site `i` in `years[y]`.
    demand: Vec<Vec<f64>>,
}

impl DemandTable {
    pub fn new(sites: Vec<Site>, years: Vec<u32>, demand: Vec<Vec<f64>>) -> Result<Self> {
        if demand.len() != years.len() {
            return Err(Error::Parse(format!(
                "{} year labels but {} demand columns",
                years.len(),
                demand.len()
            )));
        }
        for (pos, site) in sites.iter().enumerate() {
            if site.index != pos {
                return Err(Error::Parse(format!(
                    "site at row {pos} carries index {}",
                    site.index
                )));
            }
        }
        for (year, column) in years.iter().zip(&demand) {
            if column.len() != sites.len() {
                return Err(Error::Parse(format!(
                    "year {year}: {} values for {} sites",
                    column.len(),
                    sites.len()
                )));
            }
            if let Some(bad) = column.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(Error::Parse(format!(
                    "year {year}: site {bad} has invalid demand {}",
                    column[bad]
                )));
            }
        }
        Ok(Self { sites, years, demand })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn years(&self) -> &[u32] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn demand(&self, year: u32) -> Result<&[f64]> {
        self.years
            .iter()
            .position(|&y| y == year)
            .map(|pos| self.demand[pos].as_slice())
            .ok_or_else(|| Error::Precondition(format!("no demand column for year {year}")))
    }

    pub fn total(&self, year: u32) -> Result<f64> {
        Ok(self.demand(year)?.iter().sum())
    }

    /// The year among `years` with the largest total demand; first wins on ties.
    pub fn reference_year(&self, years: &[u32]) -> Result<u32> {
        let mut best: Option<(u32, f64)> = None;
        for &year in years {
            let total = self.total(year)?;
            if best.map_or(true, |(_, t)| total > t) {
                best = Some((year, total));
            }
        }
        best.map(|(y, _)| y)
            .ok_or_else(|| Error::Precondition("no target years given".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_sites() -> Vec<Site> {
        vec![
            Site::new(0, 24.66818, 71.33144),
            Site::new(1, 24.66818, 71.41106),
            Site::new(2, 24.74782, 71.33144),
        ]
    }

    #[test]
    fn location_index_resolves_exact_coordinates() {
        let index = LocationIndex::from_sites(&three_sites());
        assert_eq!(index.lookup(24.66818, 71.41106).unwrap(), 1);
        assert_eq!(index.coordinate(2), Some((24.74782, 71.33144)));
    }

    #[test]
    fn location_index_miss_is_an_error() {
        let index = LocationIndex::from_sites(&three_sites());
        let err = index.lookup(24.66818, 71.41107).unwrap_err();
        assert!(matches!(err, Error::LocationLookup(_)));
    }

    #[test]
    fn duplicate_coordinates_keep_lowest_index() {
        let sites = vec![Site::new(0, 1.0, 2.0), Site::new(1, 1.0, 2.0)];
        let index = LocationIndex::from_sites(&sites);
        assert_eq!(index.lookup(1.0, 2.0).unwrap(), 0);
    }

    #[test]
    fn reference_year_picks_largest_total() {
        let table = DemandTable::new(
            three_sites(),
            vec![2018, 2019],
            vec![vec![1.0, 2.0, 3.0], vec![2.0, 2.0, 3.0]],
        )
        .unwrap();
        assert_eq!(table.reference_year(&[2018, 2019]).unwrap(), 2019);
        assert_eq!(table.total(2018).unwrap(), 6.0);
    }

    #[test]
    fn reference_year_ties_go_to_first() {
        let table = DemandTable::new(
            three_sites(),
            vec![2018, 2019],
            vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]],
        )
        .unwrap();
        assert_eq!(table.reference_year(&[2018, 2019]).unwrap(), 2018);
    }

    #[test]
    fn negative_demand_is_rejected() {
        let err = DemandTable::new(three_sites(), vec![2018], vec![vec![1.0, -2.0, 3.0]])
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn missing_year_is_a_precondition_error() {
        let table =
            DemandTable::new(three_sites(), vec![2018], vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(table.demand(2020), Err(Error::Precondition(_))));
    }
}
