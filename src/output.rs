//! Unified flow/location record table.
//!
//! Every result leaves the crate as rows of
//! `year, data_type, source_index, destination_index, value`. Location rows
//! use `destination_index = 0` and `value = 0`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::locate::p_median::RefineryPlan;
use crate::locate::transport::TransportPlan;
use crate::model::{DemandTable, Facility, FacilityKind, LocationIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    BiomassForecast,
    BiomassDemandSupply,
    PelletDemandSupply,
    DepotLocation,
    RefineryLocation,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::BiomassForecast => "biomass_forecast",
            DataType::BiomassDemandSupply => "biomass_demand_supply",
            DataType::PelletDemandSupply => "pellet_demand_supply",
            DataType::DepotLocation => "depot_location",
            DataType::RefineryLocation => "refinery_location",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Record {
    pub year: u32,
    pub data_type: DataType,
    pub source_index: usize,
    pub destination_index: usize,
    pub value: f64,
}

impl Record {
    pub fn location(year: u32, data_type: DataType, source_index: usize) -> Self {
        Self {
            year,
            data_type,
            source_index,
            destination_index: 0,
            value: 0.0,
        }
    }
}

/// Year tag for location rows: the target year labels concatenated, so
/// 2018 and 2019 give 20182019.
pub fn combined_year(years: &[u32]) -> Result<u32> {
    let joined: String = years.iter().map(u32::to_string).collect();
    joined
        .parse()
        .map_err(|_| Error::Config(format!("cannot form a year tag from {years:?}")))
}

/// Everything the assembler needs from one optimisation run.
pub struct Assembly<'a> {
    pub table: &'a DemandTable,
    pub years: &'a [u32],
    pub locations: &'a LocationIndex,
    /// Depots in the order the transportation plans report inflow.
    pub depots: &'a [Facility],
    pub refineries: &'a RefineryPlan,
    pub flows: &'a [TransportPlan],
}

impl Assembly<'_> {
    /// Build the full record table: forecasts, depot and refinery locations,
    /// biomass flows and pellet flows.
    ///
    /// Pellet rows carry the depot's biomass inflow for that year, so pellets
    /// leaving a depot balance biomass entering it.
    pub fn records(&self) -> Result<Vec<Record>> {
        let n_sites = self.locations.len();
        let mut records = Vec::new();

        for &year in self.years {
            let demand = self.table.demand(year)?;
            records.extend(demand.iter().enumerate().map(|(i, &value)| Record {
                year,
                data_type: DataType::BiomassForecast,
                source_index: i,
                destination_index: 0,
                value,
            }));
        }

        let tag = combined_year(self.years)?;
        for (facilities, data_type) in [
            (self.depots, DataType::DepotLocation),
            (self.refineries.refineries.as_slice(), DataType::RefineryLocation),
        ] {
            for index in resolve_facilities(facilities, self.locations)? {
                records.push(Record::location(tag, data_type, index));
            }
        }

        for plan in self.flows {
            if plan.depot_inflow.len() != self.depots.len() {
                return Err(Error::Precondition(format!(
                    "year {}: inflow reported for {} depots, {} sited",
                    plan.year,
                    plan.depot_inflow.len(),
                    self.depots.len()
                )));
            }
            records.extend(plan.records.iter().copied());
        }

        for plan in self.flows {
            let inflow: HashMap<usize, f64> = self
                .depots
                .iter()
                .map(|d| d.source_index)
                .zip(plan.depot_inflow.iter().copied())
                .collect();
            for a in &self.refineries.assignments {
                let value = inflow.get(&a.depot).copied().unwrap_or(0.0);
                if value > 0.0 {
                    records.push(Record {
                        year: plan.year,
                        data_type: DataType::PelletDemandSupply,
                        source_index: a.depot,
                        destination_index: a.refinery,
                        value,
                    });
                }
            }
        }

        if let Some(bad) = records
            .iter()
            .find(|r| r.source_index >= n_sites || r.destination_index >= n_sites)
        {
            return Err(Error::Precondition(format!(
                "{} record {} -> {} is outside the {n_sites}-site table",
                bad.data_type, bad.source_index, bad.destination_index
            )));
        }

        debug!(records = records.len(), "records assembled");
        Ok(records)
    }
}

/// Resolve each facility's coordinate to its site index, rejecting two
/// facilities of the same kind on one site.
pub fn resolve_facilities(facilities: &[Facility], locations: &LocationIndex) -> Result<Vec<usize>> {
    let mut seen: HashSet<(FacilityKind, usize)> = HashSet::with_capacity(facilities.len());
    facilities
        .iter()
        .map(|f| {
            let index = locations.lookup(f.lat, f.lon)?;
            if !seen.insert((f.kind, index)) {
                return Err(Error::DuplicateFacility { kind: f.kind, index });
            }
            Ok(index)
        })
        .collect()
}

pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for r in records {
        w.serialize(r)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[Record]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)
}
