//! Facility siting and flow allocation.

pub mod centroid;
pub mod depot;
pub mod p_median;
pub mod reconcile;
pub mod solver;
pub mod transport;

pub use depot::{site_depots, DepotSitingParams, SitedDepots};
pub use p_median::{solve_refineries, Assignment, RefineryPlan};
pub use solver::SolverOptions;
pub use transport::{solve_flow, TransportPlan};
