//! End-to-end run: site depots, allocate biomass per year, site refineries,
//! assemble the record table.

use tracing::info;

use crate::config::Config;
use crate::distance::{haversine_matrix, DistanceMatrix};
use crate::error::{Error, Result};
use crate::locate::depot::{site_depots, DepotSitingParams};
use crate::locate::p_median::{solve_refineries, RefineryPlan};
use crate::locate::transport::{solve_flow, TransportPlan};
use crate::model::{DemandTable, Facility, LocationIndex};
use crate::output::{combined_year, Assembly, Record};

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reference_year: u32,
    pub depots: Vec<Facility>,
    pub refineries: RefineryPlan,
    pub flows: Vec<TransportPlan>,
    pub records: Vec<Record>,
}

/// Haversine distances between every pair of sites in the table.
pub fn site_distances(table: &DemandTable) -> DistanceMatrix {
    let coords: Vec<(f64, f64)> = table.sites().iter().map(|s| (s.lat, s.lon)).collect();
    haversine_matrix(&coords, &coords)
}

/// Run the full optimisation for `years` against `distances`.
///
/// Depots are sited once from the year with the largest total demand and
/// reused for every target year.
pub fn run(table: &DemandTable, distances: &DistanceMatrix, years: &[u32], config: &Config) -> Result<RunOutput> {
    config.validate()?;
    if table.is_empty() {
        return Err(Error::Precondition("demand table is empty".into()));
    }
    if years.is_empty() {
        return Err(Error::Precondition("no target years given".into()));
    }
    distances.ensure_square(table.len())?;
    // Location rows need the year tag; fail before any solve.
    combined_year(years)?;

    let locations = LocationIndex::from_sites(table.sites());
    let reference_year = table.reference_year(years)?;
    info!(reference_year, sites = table.len(), "starting run");

    let siting = DepotSitingParams {
        capacity: config.capacity.depot,
        zone_count: config.siting.zone_count,
        kmeans: config.siting.kmeans(),
    };
    let sited = site_depots(table.sites(), table.demand(reference_year)?, &locations, &siting)?;
    let depots = sited.depots;

    let options = config.solver.options();
    let flows = years
        .iter()
        .map(|&year| {
            solve_flow(
                year,
                table.demand(year)?,
                &depots,
                distances,
                config.capacity.depot,
                config.solver.flow_tolerance,
                &options,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let refineries = solve_refineries(
        &depots,
        distances,
        config.capacity.depot,
        config.capacity.refinery,
        &options,
    )?;

    let records = Assembly {
        table,
        years,
        locations: &locations,
        depots: &depots,
        refineries: &refineries,
        flows: &flows,
    }
    .records()?;

    info!(
        depots = depots.len(),
        refineries = refineries.refineries.len(),
        records = records.len(),
        "run complete"
    );

    Ok(RunOutput {
        reference_year,
        depots,
        refineries,
        flows,
        records,
    })
}
