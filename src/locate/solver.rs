//! HiGHS LP/MIP solver interface
//!
//! Both allocation models build a `RowProblem` directly and hand it here.
//! Anything other than an optimal status is reported as infeasible; no
//! partial solution is returned.

use highs::{HighsModelStatus, RowProblem, Sense};
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolverOptions {
    /// Wall-clock limit passed to HiGHS.
    pub time_limit_secs: Option<f64>,
    /// Let HiGHS print its own log.
    pub verbose: bool,
}

/// Result of an optimal solve.
#[derive(Debug)]
pub struct SolveResult {
    pub objective: f64,
    /// Column values in the order the columns were added.
    pub solution: Vec<f64>,
}

pub fn solve(pb: RowProblem, sense: Sense, stage: &'static str, options: &SolverOptions) -> Result<SolveResult> {
    let mut model = pb.optimise(sense);
    model.set_option("output_flag", options.verbose);
    if let Some(limit) = options.time_limit_secs {
        model.set_option("time_limit", limit);
    }

    let solved = model.solve();
    let status = solved.status();

    match status {
        HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {
            let solution = solved.get_solution().columns().to_vec();
            let objective = solved.objective_value();
            debug!(stage, objective, n_cols = solution.len(), "solver finished");
            Ok(SolveResult { objective, solution })
        }
        _ => {
            warn!(stage, ?status, "solver returned non-optimal status");
            Err(Error::Infeasible {
                stage,
                status: format!("{status:?}"),
            })
        }
    }
}
