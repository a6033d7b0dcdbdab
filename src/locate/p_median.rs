//! Capacitated P-Median Problem (depot → refinery)
//!
//! Open exactly p refineries among the depot locations and assign every
//! depot to one of them, minimising total assignment distance. Each refinery
//! serves at most `floor(refinery_capacity / depot_capacity)` depots.

use highs::{Col, RowProblem, Sense};
use tracing::{debug, info};

use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};
use crate::locate::solver::{solve, SolverOptions};
use crate::model::{Facility, FacilityKind};

const STAGE: &str = "p-median";

/// Depots one refinery can serve.
pub fn service_threshold(refinery_capacity: f64, depot_capacity: f64) -> Result<usize> {
    if !(depot_capacity > 0.0) {
        return Err(Error::Config(format!("depot capacity must be positive, got {depot_capacity}")));
    }
    let threshold = (refinery_capacity / depot_capacity).floor();
    if !(threshold >= 1.0) {
        return Err(Error::Config(format!(
            "refinery capacity {refinery_capacity} cannot serve a single depot of capacity {depot_capacity}"
        )));
    }
    Ok(threshold as usize)
}

/// Refineries to open for `n_depots` depots.
pub fn refinery_count(n_depots: usize, threshold: usize) -> usize {
    n_depots.div_ceil(threshold)
}

/// A depot served by a refinery, both as site indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub depot: usize,
    pub refinery: usize,
}

#[derive(Debug, Clone)]
pub struct RefineryPlan {
    /// Opened refineries in depot order.
    pub refineries: Vec<Facility>,
    /// One entry per depot, in depot order.
    pub assignments: Vec<Assignment>,
    pub threshold: usize,
    pub objective: f64,
}

impl RefineryPlan {
    /// Depots assigned to the refinery at site `refinery`.
    pub fn served_by(&self, refinery: usize) -> impl Iterator<Item = usize> + '_ {
        self.assignments
            .iter()
            .filter(move |a| a.refinery == refinery)
            .map(|a| a.depot)
    }
}

/// Solve refinery siting and depot assignment.
pub fn solve_refineries(
    depots: &[Facility],
    distances: &DistanceMatrix,
    depot_capacity: f64,
    refinery_capacity: f64,
    options: &SolverOptions,
) -> Result<RefineryPlan> {
    let n = depots.len();
    if n == 0 {
        return Err(Error::Precondition("refinery siting needs at least one depot".into()));
    }
    if let Some(d) = depots
        .iter()
        .find(|d| d.source_index >= distances.nrows() || d.source_index >= distances.ncols())
    {
        return Err(Error::Precondition(format!(
            "depot at index {} is outside the distance matrix",
            d.source_index
        )));
    }

    let threshold = service_threshold(refinery_capacity, depot_capacity)?;
    let p = refinery_count(n, threshold);
    debug!(depots = n, threshold, p, "refinery siting problem");

    let mut pb = RowProblem::new();

    // y[i] = 1 if candidate i is opened (columns 0..n)
    let y_cols: Vec<Col> = (0..n).map(|_| pb.add_integer_column(0.0, 0.0..=1.0)).collect();

    // x[i][j] = 1 if depot j is served by candidate i (columns n + i*n + j)
    let mut x_cols: Vec<Vec<Col>> = Vec::with_capacity(n);
    for cand in depots {
        let row_cols: Vec<Col> = depots
            .iter()
            .map(|dep| pb.add_integer_column(distances.get(cand.source_index, dep.source_index), 0.0..=1.0))
            .collect();
        x_cols.push(row_cols);
    }

    // sum_i x[i][j] = 1 for all j (each depot served by exactly one refinery)
    for j in 0..n {
        let terms: Vec<(Col, f64)> = x_cols.iter().map(|row| (row[j], 1.0)).collect();
        pb.add_row(1.0..=1.0, terms);
    }

    // sum_j x[i][j] <= threshold * y[i] for all i
    for i in 0..n {
        let mut terms: Vec<(Col, f64)> = x_cols[i].iter().map(|&c| (c, 1.0)).collect();
        terms.push((y_cols[i], -(threshold as f64)));
        pb.add_row(..=0.0, terms);
    }

    // sum_i y[i] = p
    let terms: Vec<(Col, f64)> = y_cols.iter().map(|&c| (c, 1.0)).collect();
    pb.add_row(p as f64..=p as f64, terms);

    // x[i][j] <= y[i]
    for i in 0..n {
        for j in 0..n {
            pb.add_row(..=0.0, [(x_cols[i][j], 1.0), (y_cols[i], -1.0)]);
        }
    }

    let result = solve(pb, Sense::Minimise, STAGE, options)?;
    let sol = &result.solution;

    let refineries: Vec<Facility> = depots
        .iter()
        .enumerate()
        .filter(|(i, _)| sol[*i] > 0.5)
        .map(|(_, d)| Facility {
            kind: FacilityKind::Refinery,
            lat: d.lat,
            lon: d.lon,
            source_index: d.source_index,
            capacity: refinery_capacity,
        })
        .collect();

    // Each depot goes to the candidate with the largest x value
    let assignments: Vec<Assignment> = depots
        .iter()
        .enumerate()
        .map(|(j, dep)| {
            let mut best_i = 0;
            let mut best_val = f64::MIN;
            for i in 0..n {
                let val = sol[n + i * n + j];
                if val > best_val {
                    best_val = val;
                    best_i = i;
                }
            }
            Assignment {
                depot: dep.source_index,
                refinery: depots[best_i].source_index,
            }
        })
        .collect();

    info!(
        depots = n,
        refineries = refineries.len(),
        threshold,
        objective = result.objective,
        "refinery siting solved"
    );

    Ok(RefineryPlan {
        refineries,
        assignments,
        threshold,
        objective: result.objective,
    })
}
