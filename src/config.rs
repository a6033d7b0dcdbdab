//! Run configuration.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! environment variables prefixed `PELLETLOC__` with `__` separating nested
//! keys (for example `PELLETLOC__CAPACITY__DEPOT=25000`).

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locate::solver::SolverOptions;
use crate::region::KMeansParams;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capacity: CapacityConfig,
    pub siting: SitingConfig,
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Yearly throughput of one depot.
    pub depot: f64,
    /// Yearly throughput of one refinery.
    pub refinery: f64,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            depot: 20000.0,
            refinery: 100000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitingConfig {
    /// Coarse zones the site set is first split into.
    pub zone_count: usize,
    pub seed: u64,
    pub max_iter: usize,
    /// k-means restarts; unset means one per group.
    pub n_init: Option<usize>,
}

impl Default for SitingConfig {
    fn default() -> Self {
        Self {
            zone_count: 4,
            seed: 42,
            max_iter: 300,
            n_init: None,
        }
    }
}

impl SitingConfig {
    pub fn kmeans(&self) -> KMeansParams {
        KMeansParams {
            seed: self.seed,
            max_iter: self.max_iter,
            n_init: self.n_init,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Subtracted from every emitted transportation flow; smaller flows are dropped.
    pub flow_tolerance: f64,
    pub time_limit_secs: Option<f64>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            flow_tolerance: 1e-5,
            time_limit_secs: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn options(&self) -> SolverOptions {
        SolverOptions {
            time_limit_secs: self.time_limit_secs,
            verbose: self.verbose,
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` when given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!("config file {} not found", path.display())));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("PELLETLOC__").split("__"));

        let config: Config = figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.capacity;
        if !(c.depot > 0.0) || !c.depot.is_finite() {
            return Err(Error::Config(format!("depot capacity must be positive, got {}", c.depot)));
        }
        if !(c.refinery >= c.depot) || !c.refinery.is_finite() {
            return Err(Error::Config(format!(
                "refinery capacity {} must be at least the depot capacity {}",
                c.refinery, c.depot
            )));
        }
        if self.siting.zone_count == 0 {
            return Err(Error::Config("zone_count must be at least 1".into()));
        }
        if self.siting.n_init == Some(0) {
            return Err(Error::Config("n_init must be at least 1".into()));
        }
        if !(self.solver.flow_tolerance >= 0.0) {
            return Err(Error::Config(format!(
                "flow_tolerance must be non-negative, got {}",
                self.solver.flow_tolerance
            )));
        }
        if let Some(limit) = self.solver.time_limit_secs {
            if !(limit > 0.0) {
                return Err(Error::Config(format!("time_limit_secs must be positive, got {limit}")));
            }
        }
        Ok(())
    }
}
