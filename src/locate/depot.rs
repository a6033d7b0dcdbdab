//! Depot siting: zone partition, count reconciliation, then one centre of
//! gravity per sub-group.
//!
//! Siting is a tree build. The site set is split into coarse zones, each
//! zone is split into as many sub-groups as it has facilities, and each
//! sub-group yields one depot. Zones share no state, so they are sited in
//! parallel and collected in zone order.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::locate::centroid::{self, WeightedPoint};
use crate::locate::reconcile::{reconcile, SitingTask};
use crate::model::{Facility, FacilityKind, LocationIndex, Site, Zone};
use crate::region::{self, KMeansParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepotSitingParams {
    pub capacity: f64,
    pub zone_count: usize,
    pub kmeans: KMeansParams,
}

#[derive(Debug, Clone)]
pub struct SitedDepots {
    pub depots: Vec<Facility>,
    /// `ceil(total_demand / capacity)`.
    pub needed: usize,
    /// Sum of the per-zone rounded counts before any remainder.
    pub total_assigned: usize,
}

/// Site depots for the demand of a single reference year.
///
/// `demand` is indexed by site index.
pub fn site_depots(
    sites: &[Site],
    demand: &[f64],
    locations: &LocationIndex,
    params: &DepotSitingParams,
) -> Result<SitedDepots> {
    if sites.is_empty() {
        return Err(Error::Precondition("demand table has no sites".into()));
    }
    if demand.len() != sites.len() {
        return Err(Error::Precondition(format!(
            "{} demand values for {} sites",
            demand.len(),
            sites.len()
        )));
    }
    if !(params.capacity > 0.0) {
        return Err(Error::Config(format!("depot capacity must be positive, got {}", params.capacity)));
    }

    let all: Vec<usize> = (0..sites.len()).collect();
    let total_demand: f64 = demand.iter().sum();
    let zones = region::zones(sites, &all, demand, params.zone_count, &params.kmeans)?;
    let plan = reconcile(zones, total_demand, params.capacity);

    let (remainder, tasks): (Vec<SitingTask>, Vec<SitingTask>) =
        plan.tasks.into_iter().partition(|t| t.remainder);

    let no_exclusions = HashSet::new();
    let per_zone: Vec<Vec<usize>> = tasks
        .par_iter()
        .map(|task| site_zone(sites, demand, &task.zone, task.count, &no_exclusions, &params.kmeans))
        .collect::<Result<_>>()?;
    let mut sited: Vec<usize> = per_zone.into_iter().flatten().collect();

    // Remainder facilities may not reuse a site that already hosts a depot.
    for task in &remainder {
        let occupied: HashSet<usize> = sited.iter().copied().collect();
        let extra = site_zone(sites, demand, &task.zone, task.count, &occupied, &params.kmeans)?;
        info!(count = extra.len(), "remainder depots sited");
        sited.extend(extra);
    }

    // Sites sharing a coordinate resolve to one index; two depots there
    // would give the flow model two columns for the same site.
    let mut resolved = HashSet::with_capacity(sited.len());
    let depots = sited
        .into_iter()
        .map(|i| {
            let site = &sites[i];
            let source_index = locations.lookup(site.lat, site.lon)?;
            if !resolved.insert(source_index) {
                return Err(Error::DuplicateFacility {
                    kind: FacilityKind::Depot,
                    index: source_index,
                });
            }
            Ok(Facility {
                kind: FacilityKind::Depot,
                lat: site.lat,
                lon: site.lon,
                source_index,
                capacity: params.capacity,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        depots = depots.len(),
        needed = plan.needed,
        total_assigned = plan.total_assigned,
        "depots sited"
    );

    Ok(SitedDepots {
        depots,
        needed: plan.needed,
        total_assigned: plan.total_assigned,
    })
}

/// Site `count` facilities in `zone`, returning site indices.
///
/// One facility goes straight to the zone's centre of gravity; more split
/// the zone's loaded sites first and recurse into each sub-group with a
/// count of one. Zero-demand sites take no part in the split, so every
/// sub-group carries positive demand.
fn site_zone(
    sites: &[Site],
    demand: &[f64],
    zone: &Zone,
    count: usize,
    occupied: &HashSet<usize>,
    kmeans: &KMeansParams,
) -> Result<Vec<usize>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if zone.is_empty() {
        return Err(Error::EmptyGroup);
    }
    if count == 1 {
        return Ok(centre_of_gravity(sites, demand, &zone.members, occupied)?
            .into_iter()
            .collect());
    }

    let loaded: Vec<usize> = zone.members.iter().copied().filter(|&i| demand[i] > 0.0).collect();
    if loaded.is_empty() {
        return Err(Error::EmptyGroup);
    }
    let groups = region::zones(sites, &loaded, demand, count, kmeans)?;
    let mut sited = Vec::with_capacity(groups.len());
    for group in &groups {
        sited.extend(site_zone(sites, demand, group, 1, occupied, kmeans)?);
    }
    Ok(sited)
}

/// Weighted centroid of `members` snapped to the nearest member not in
/// `occupied`. `None` when every member is occupied.
fn centre_of_gravity(
    sites: &[Site],
    demand: &[f64],
    members: &[usize],
    occupied: &HashSet<usize>,
) -> Result<Option<usize>> {
    let points: Vec<WeightedPoint> = members
        .iter()
        .map(|&i| WeightedPoint {
            lat: sites[i].lat,
            lon: sites[i].lon,
            weight: demand[i],
        })
        .collect();
    let target = centroid::weighted_centroid(&points)?;

    let free: Vec<usize> = members.iter().copied().filter(|i| !occupied.contains(i)).collect();
    if free.is_empty() {
        warn!(sites = members.len(), "every site in group already hosts a depot, skipping");
        return Ok(None);
    }
    let candidates: Vec<WeightedPoint> = free
        .iter()
        .map(|&i| WeightedPoint {
            lat: sites[i].lat,
            lon: sites[i].lon,
            weight: demand[i],
        })
        .collect();

    Ok(centroid::snap(target, &candidates).map(|pos| free[pos]))
}
