//! Capacitated transportation problem (site → depot).
//!
//! Minimise total distance-weighted flow. Every site ships exactly its
//! demand and every depot receives exactly its capacity. A dummy site with
//! zero distance to every depot supplies the difference between total
//! capacity and total demand so both equality families stay satisfiable.

use highs::{Col, RowProblem, Sense};
use tracing::info;

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::locate::solver::{solve, SolverOptions};
use crate::model::Facility;
use crate::output::{DataType, Record};

const STAGE: &str = "transportation";

/// Flow allocation for one year.
#[derive(Debug, Clone)]
pub struct TransportPlan {
    pub year: u32,
    /// `biomass_demand_supply` records sorted by source then destination.
    pub records: Vec<Record>,
    /// Emitted inflow per depot, in the order of the input depot slice.
    pub depot_inflow: Vec<f64>,
    pub objective: f64,
}

/// Solve the site → depot allocation.
///
/// `demand` and both axes of `distances` are indexed by site index. Flows
/// at or below `tolerance` are dropped and the rest are reported as
/// `value - tolerance`.
pub fn solve_flow(
    year: u32,
    demand: &[f64],
    depots: &[Facility],
    distances: &DistanceMatrix,
    depot_capacity: f64,
    tolerance: f64,
    options: &SolverOptions,
) -> Result<TransportPlan> {
    let n_sites = demand.len();
    let n_dep = depots.len();

    if n_dep == 0 {
        return Err(Error::Precondition("transportation problem needs at least one depot".into()));
    }
    if distances.nrows() < n_sites {
        return Err(Error::Precondition(format!(
            "distance matrix has {} rows for {n_sites} sites",
            distances.nrows()
        )));
    }
    if let Some(d) = depots.iter().find(|d| d.source_index >= distances.ncols()) {
        return Err(Error::Precondition(format!(
            "depot at index {} is outside the distance matrix",
            d.source_index
        )));
    }

    let total_demand: f64 = demand.iter().sum();
    let total_capacity = n_dep as f64 * depot_capacity;
    let dummy_supply = total_capacity - total_demand;
    if dummy_supply < 0.0 {
        return Err(Error::Infeasible {
            stage: STAGE,
            status: format!(
                "total demand {total_demand:.2} exceeds total depot capacity {total_capacity:.2}"
            ),
        });
    }

    let mut pb = RowProblem::new();

    // x[i][j] = flow from site i to depot j; row n_sites is the dummy site.
    let mut x_cols: Vec<Vec<Col>> = Vec::with_capacity(n_sites + 1);
    for i in 0..n_sites {
        let row_cols: Vec<Col> = depots
            .iter()
            .map(|d| pb.add_column(distances.get(i, d.source_index), 0.0..))
            .collect();
        x_cols.push(row_cols);
    }
    x_cols.push((0..n_dep).map(|_| pb.add_column(0.0, 0.0..)).collect());

    // Supply: sum_j x[i][j] = demand[i], dummy ships the slack
    for (i, row) in x_cols.iter().enumerate() {
        let supply = if i < n_sites { demand[i] } else { dummy_supply };
        let terms: Vec<(Col, f64)> = row.iter().map(|&c| (c, 1.0)).collect();
        pb.add_row(supply..=supply, terms);
    }

    // Depot saturation: sum_i x[i][j] = capacity
    for j in 0..n_dep {
        let terms: Vec<(Col, f64)> = x_cols.iter().map(|row| (row[j], 1.0)).collect();
        pb.add_row(depot_capacity..=depot_capacity, terms);
    }

    let result = solve(pb, Sense::Minimise, STAGE, options)?;

    let mut records = Vec::new();
    let mut depot_inflow = vec![0.0; n_dep];
    for i in 0..n_sites {
        for (j, depot) in depots.iter().enumerate() {
            let value = result.solution[i * n_dep + j] - tolerance;
            if value > 0.0 {
                records.push(Record {
                    year,
                    data_type: DataType::BiomassDemandSupply,
                    source_index: i,
                    destination_index: depot.source_index,
                    value,
                });
                depot_inflow[j] += value;
            }
        }
    }
    records.sort_by_key(|r| (r.source_index, r.destination_index));

    info!(
        year,
        depots = n_dep,
        flows = records.len(),
        total_demand,
        dummy_supply,
        objective = result.objective,
        "transportation problem solved"
    );

    Ok(TransportPlan {
        year,
        records,
        depot_inflow,
        objective: result.objective,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::haversine_matrix;
    use crate::model::FacilityKind;

    fn depot(index: usize, lat: f64, lon: f64) -> Facility {
        Facility {
            kind: FacilityKind::Depot,
            lat,
            lon,
            source_index: index,
            capacity: 20000.0,
        }
    }

    fn line_sites() -> Vec<(f64, f64)> {
        vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]
    }

    #[test]
    fn saturates_depots_and_routes_all_demand() {
        let pts = line_sites();
        let distances = haversine_matrix(&pts, &pts);
        let demand = [5000.0, 15000.0, 5000.0];
        let depots = [depot(0, 0.0, 0.0), depot(1, 0.0, 1.0)];

        let plan = solve_flow(2018, &demand, &depots, &distances, 20000.0, 0.0, &SolverOptions::default())
            .unwrap();

        let mut outflow = [0.0; 3];
        for r in &plan.records {
            assert!(r.value > 0.0);
            outflow[r.source_index] += r.value;
        }
        for (out, d) in outflow.iter().zip(&demand) {
            assert!((out - d).abs() < 1e-6, "site ships {out}, demand {d}");
        }
        let total: f64 = plan.depot_inflow.iter().sum();
        assert!((total - 25000.0).abs() < 1e-6);
        for inflow in &plan.depot_inflow {
            assert!(*inflow <= 20000.0 + 1e-6);
        }
    }

    #[test]
    fn records_are_sorted_by_source() {
        let pts = line_sites();
        let distances = haversine_matrix(&pts, &pts);
        let demand = [5000.0, 15000.0, 5000.0];
        let depots = [depot(2, 0.0, 2.0), depot(0, 0.0, 0.0)];

        let plan = solve_flow(2018, &demand, &depots, &distances, 20000.0, 1e-5, &SolverOptions::default())
            .unwrap();
        let keys: Vec<(usize, usize)> = plan.records.iter().map(|r| (r.source_index, r.destination_index)).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert!(plan.records.iter().all(|r| r.data_type == DataType::BiomassDemandSupply));
    }

    #[test]
    fn full_depots_equal_capacity_when_demand_matches() {
        let pts = line_sites();
        let distances = haversine_matrix(&pts, &pts);
        let demand = [10000.0, 20000.0, 10000.0];
        let depots = [depot(0, 0.0, 0.0), depot(2, 0.0, 2.0)];

        let plan = solve_flow(2019, &demand, &depots, &distances, 20000.0, 0.0, &SolverOptions::default())
            .unwrap();
        for inflow in &plan.depot_inflow {
            assert!((inflow - 20000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn demand_above_capacity_is_infeasible() {
        let pts = line_sites();
        let distances = haversine_matrix(&pts, &pts);
        let demand = [15000.0, 15000.0, 15000.0];
        let depots = [depot(1, 0.0, 1.0)];

        let err = solve_flow(2018, &demand, &depots, &distances, 20000.0, 0.0, &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Infeasible { stage: "transportation", .. }));
    }

    #[test]
    fn no_depots_is_a_precondition_error() {
        let pts = line_sites();
        let distances = haversine_matrix(&pts, &pts);
        let err = solve_flow(2018, &[1.0, 1.0, 1.0], &[], &distances, 20000.0, 0.0, &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }
}
