//! Depot and refinery siting for a biomass-to-pellet supply chain.
//!
//! Harvesting sites are grouped into capacity-bounded zones with seeded
//! k-means, one depot is sited per group at its demand-weighted centre of
//! gravity, biomass is routed site → depot by a capacitated transportation
//! LP, and refineries are opened among the depots by a capacitated p-median
//! MIP. Both models are solved with HiGHS.
//!
//! [`pipeline::run`] drives the whole chain and returns the unified record
//! table described in [`output`].

pub mod config;
pub mod distance;
pub mod error;
pub mod input;
pub mod locate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod region;
pub mod telemetry;

pub use config::Config;
pub use distance::{haversine_km, haversine_matrix, DistanceMatrix};
pub use error::{Error, Result};
pub use model::{DemandTable, Facility, FacilityKind, LocationIndex, Site, Zone};
pub use output::{DataType, Record};
pub use pipeline::{run, RunOutput};
