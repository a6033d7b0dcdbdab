//! Facility count reconciliation.
//!
//! Zones get `round(zone_demand / capacity)` facilities each. When the sum
//! falls short of `ceil(total_demand / capacity)` the zones that were rounded
//! down are pooled into a remainder zone that receives the missing count.

use tracing::{debug, info, warn};

use crate::model::Zone;

/// Total facilities required to absorb `total_demand`.
pub fn needed_facilities(total_demand: f64, capacity: f64) -> usize {
    (total_demand / capacity).ceil().max(0.0) as usize
}

/// Nearest-integer rounding with ties to even, so 0.5 → 0, 1.5 → 2, 2.5 → 2.
pub fn assigned_facilities(needed: f64) -> usize {
    needed.round_ties_even().max(0.0) as usize
}

/// One unit of siting work: split `zone` into `count` groups and site one
/// facility per group.
#[derive(Debug, Clone, PartialEq)]
pub struct SitingTask {
    pub zone: Zone,
    pub count: usize,
    /// Pooled shortfall zone rather than a partition zone.
    pub remainder: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitingPlan {
    pub needed: usize,
    pub total_assigned: usize,
    pub tasks: Vec<SitingTask>,
}

impl SitingPlan {
    /// Facilities the plan will site.
    pub fn planned(&self) -> usize {
        self.tasks.iter().map(|t| t.count).sum()
    }
}

pub fn reconcile(zones: Vec<Zone>, total_demand: f64, capacity: f64) -> SitingPlan {
    let needed = needed_facilities(total_demand, capacity);
    info!(needed, total_demand, capacity, "total facilities needed");

    let per_zone: Vec<(f64, usize)> = zones
        .iter()
        .map(|z| {
            let zone_needed = z.demand / capacity;
            (zone_needed, assigned_facilities(zone_needed))
        })
        .collect();
    for (zone, (zone_needed, assigned)) in zones.iter().zip(&per_zone) {
        debug!(zone = zone.id, sites = zone.members.len(), needed = zone_needed, assigned, "zone allocation");
    }

    let total_assigned: usize = per_zone.iter().map(|(_, a)| a).sum();
    let next_id = zones.iter().map(|z| z.id + 1).max().unwrap_or(0);

    let mut remainder = None;
    if total_assigned > needed {
        warn!(
            excess = total_assigned - needed,
            total_assigned, needed, "zones assigned more facilities than needed"
        );
    } else if total_assigned < needed {
        let missing = needed - total_assigned;
        warn!(missing, total_assigned, needed, "zones assigned fewer facilities than needed");

        let mut pool = Zone {
            id: next_id,
            members: Vec::new(),
            demand: 0.0,
        };
        for (zone, &(zone_needed, assigned)) in zones.iter().zip(&per_zone) {
            let shortfall = (zone_needed - assigned as f64).max(0.0);
            if shortfall > 0.0 {
                debug!(zone = zone.id, shortfall, "zone joins remainder pool");
                pool.members.extend_from_slice(&zone.members);
                pool.demand += zone.demand;
            }
        }

        if pool.is_empty() {
            warn!(missing, "no zone was rounded down, remainder facilities not sited");
        } else {
            remainder = Some(SitingTask {
                zone: pool,
                count: missing,
                remainder: true,
            });
        }
    }

    let mut tasks: Vec<SitingTask> = zones
        .into_iter()
        .zip(per_zone)
        .filter(|(_, (_, assigned))| *assigned > 0)
        .map(|(zone, (_, count))| SitingTask {
            zone,
            count,
            remainder: false,
        })
        .collect();
    tasks.extend(remainder);

    SitingPlan {
        needed,
        total_assigned,
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn zone(id: usize, members: Vec<usize>, demand: f64) -> Zone {
        Zone { id, members, demand }
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(assigned_facilities(0.5), 0);
        assert_eq!(assigned_facilities(1.5), 2);
        assert_eq!(assigned_facilities(2.5), 2);
        assert_eq!(assigned_facilities(3.5), 4);
        assert_eq!(assigned_facilities(2.49), 2);
        assert_eq!(assigned_facilities(2.51), 3);
    }

    #[test]
    fn needed_is_ceiling() {
        assert_eq!(needed_facilities(25000.0, 20000.0), 2);
        assert_eq!(needed_facilities(40000.0, 20000.0), 2);
        assert_eq!(needed_facilities(0.0, 20000.0), 0);
    }

    #[test]
    fn exact_multiple_needs_no_correction() {
        let zones = vec![
            zone(0, vec![0, 1], 40000.0),
            zone(1, vec![2], 20000.0),
            zone(2, vec![3, 4], 60000.0),
        ];
        let plan = reconcile(zones, 120000.0, 20000.0);
        assert_eq!(plan.needed, 6);
        assert_eq!(plan.total_assigned, 6);
        assert!(plan.tasks.iter().all(|t| !t.remainder));
        assert_eq!(plan.planned(), 6);
    }

    #[test]
    fn shortfall_pools_rounded_down_zones() {
        // 1.25 + 1.25 + 0.4 → 3 needed; rounding gives 1 + 1 + 0 = 2
        let zones = vec![
            zone(0, vec![0, 1], 25000.0),
            zone(1, vec![2, 3], 25000.0),
            zone(2, vec![4], 8000.0),
        ];
        let plan = reconcile(zones, 58000.0, 20000.0);
        assert_eq!(plan.needed, 3);
        assert_eq!(plan.total_assigned, 2);
        let rem = plan.tasks.iter().find(|t| t.remainder).unwrap();
        assert_eq!(rem.count, 1);
        assert_eq!(rem.zone.members, vec![0, 1, 2, 3, 4]);
        assert_eq!(rem.zone.id, 3);
        // zone 2 got zero facilities of its own
        assert_eq!(plan.tasks.iter().filter(|t| !t.remainder).count(), 2);
        assert_eq!(plan.planned(), 3);
    }

    #[test]
    fn over_allocation_is_left_alone() {
        // 0.6 + 0.6 + 0.6 → needed 2, assigned 3
        let zones = vec![
            zone(0, vec![0], 12000.0),
            zone(1, vec![1], 12000.0),
            zone(2, vec![2], 12000.0),
        ];
        let plan = reconcile(zones, 36000.0, 20000.0);
        assert_eq!(plan.needed, 2);
        assert_eq!(plan.total_assigned, 3);
        assert_eq!(plan.planned(), 3);
    }

    #[test]
    fn half_even_changes_which_zone_is_short() {
        // 0.5 rounds to 0 (zone 0 short), 1.5 rounds to 2
        let zones = vec![zone(0, vec![0], 10000.0), zone(1, vec![1, 2], 30000.0)];
        let plan = reconcile(zones, 40000.0, 20000.0);
        assert_eq!(plan.needed, 2);
        assert_eq!(plan.total_assigned, 2);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].zone.id, 1);
    }

    proptest! {
        #[test]
        fn integer_multiples_assign_exactly(counts in prop::collection::vec(0usize..6, 1..6)) {
            let capacity = 20000.0;
            let zones: Vec<Zone> = counts
                .iter()
                .enumerate()
                .map(|(id, &c)| zone(id, vec![id], c as f64 * capacity))
                .collect();
            let k: usize = counts.iter().sum();
            let plan = reconcile(zones, k as f64 * capacity, capacity);
            prop_assert_eq!(plan.needed, k);
            prop_assert_eq!(plan.total_assigned, k);
            prop_assert_eq!(plan.planned(), k);
        }
    }
}
