//! Spatial partitioning of sites into zones.

pub mod kmeans;

use crate::error::Result;
use crate::model::{Site, Zone};

pub use kmeans::{partition, KMeansParams};

/// Split `members` (site indices) into `k` zones by k-means on their
/// coordinates. `demand` is indexed by site index and gives each zone its
/// aggregate demand. Zones come back ordered by id.
pub fn zones(
    sites: &[Site],
    members: &[usize],
    demand: &[f64],
    k: usize,
    params: &KMeansParams,
) -> Result<Vec<Zone>> {
    let points: Vec<(f64, f64)> = members.iter().map(|&i| (sites[i].lon, sites[i].lat)).collect();
    let labels = partition(&points, k, params)?;
    let n_zones = labels.iter().max().map_or(0, |m| m + 1);

    let mut zones: Vec<Zone> = (0..n_zones)
        .map(|id| Zone {
            id,
            members: Vec::new(),
            demand: 0.0,
        })
        .collect();
    for (&site, &label) in members.iter().zip(&labels) {
        zones[label].members.push(site);
        zones[label].demand += demand[site];
    }
    Ok(zones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zones_carry_members_and_demand() {
        let sites = vec![
            Site::new(0, 0.0, 0.0),
            Site::new(1, 0.0, 0.1),
            Site::new(2, 10.0, 10.0),
            Site::new(3, 10.0, 10.1),
        ];
        let demand = [1.0, 2.0, 3.0, 4.0];
        let zones = zones(&sites, &[0, 1, 2, 3], &demand, 2, &KMeansParams::default()).unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].members, vec![0, 1]);
        assert_eq!(zones[0].demand, 3.0);
        assert_eq!(zones[1].members, vec![2, 3]);
        assert_eq!(zones[1].demand, 7.0);
    }

    #[test]
    fn subset_partition_keeps_master_indices() {
        let sites = vec![
            Site::new(0, 0.0, 0.0),
            Site::new(1, 5.0, 5.0),
            Site::new(2, 5.0, 5.1),
        ];
        let demand = [1.0, 1.0, 1.0];
        let zones = zones(&sites, &[1, 2], &demand, 1, &KMeansParams::default()).unwrap();
        assert_eq!(zones[0].members, vec![1, 2]);
    }
}
