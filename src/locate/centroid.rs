//! Center of gravity siting.
//!
//! The demand-weighted centroid of a group is snapped to the nearest member
//! so a facility always lands on an existing site.

use crate::distance::haversine_km;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

/// Demand-weighted mean `(lat, lon)` of the group.
pub fn weighted_centroid(points: &[WeightedPoint]) -> Result<(f64, f64)> {
    let total: f64 = points.iter().map(|p| p.weight).sum();
    if points.is_empty() || !(total > 0.0) {
        return Err(Error::EmptyGroup);
    }
    let lat = points.iter().map(|p| p.lat * p.weight).sum::<f64>() / total;
    let lon = points.iter().map(|p| p.lon * p.weight).sum::<f64>() / total;
    Ok((lat, lon))
}

/// Position of the candidate closest to `target`; the first minimum wins.
pub fn snap<'a, I>(target: (f64, f64), candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a WeightedPoint>,
{
    let mut best: Option<(usize, f64)> = None;
    for (pos, p) in candidates.into_iter().enumerate() {
        let d = haversine_km(target.0, target.1, p.lat, p.lon);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((pos, d));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Site a single facility for the group: returns the index within `points`
/// of the member nearest the weighted centroid.
pub fn locate(points: &[WeightedPoint]) -> Result<usize> {
    let target = weighted_centroid(points)?;
    snap(target, points).ok_or(Error::EmptyGroup)
}
