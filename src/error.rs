//! Crate error type.
//!
//! Every fallible stage returns [`Result`]. Facility-count mismatches in the
//! reconciler are not errors: they are logged and corrected in place.

use thiserror::Error;

use crate::model::FacilityKind;

#[derive(Debug, Error)]
pub enum Error {
    /// The LP/MIP backend did not report an optimal solution.
    #[error("{stage} problem has no optimal solution (solver status: {status})")]
    Infeasible { stage: &'static str, status: String },

    #[error("centroid requested for an empty or zero-weight group")]
    EmptyGroup,

    #[error("facility coordinate {0} is not in the master location table")]
    LocationLookup(String),

    #[error("more than one {kind} sited at location index {index}")]
    DuplicateFacility { kind: FacilityKind, index: usize },

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
