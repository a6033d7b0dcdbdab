//! Seeded k-means partitioning of points by coordinate proximity.
//!
//! Points are `(lon, lat)` pairs clustered in plain degree space. Each restart
//! runs on its own `ChaCha8Rng` derived from the base seed, so the labelling
//! is a pure function of `(points, k, params)`.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansParams {
    pub seed: u64,
    /// Lloyd iterations per restart.
    pub max_iter: usize,
    /// Restarts; `None` uses `k` restarts.
    pub n_init: Option<usize>,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iter: 300,
            n_init: None,
        }
    }
}

/// Partition `points` into at most `k` groups.
///
/// Returns one label per point in `0..k'` where `k' = min(k, points.len())`.
/// Every label in that range is used, and labels are numbered in order of
/// first appearance.
pub fn partition(points: &[(f64, f64)], k: usize, params: &KMeansParams) -> Result<Vec<usize>> {
    let n = points.len();
    if n == 0 {
        return Err(Error::Precondition("cannot partition an empty point set".into()));
    }
    if k == 0 {
        return Err(Error::Precondition("cannot partition into zero groups".into()));
    }
    if k > n {
        tracing::warn!(requested = k, points = n, "more groups requested than points, clamping");
    }
    let k = k.min(n);
    if k == 1 {
        return Ok(vec![0; n]);
    }

    let n_init = params.n_init.unwrap_or(k).max(1);
    let mut best: Option<(f64, Vec<usize>)> = None;

    for run in 0..n_init {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(run as u64));
        let (inertia, labels) = lloyd(points, k, params.max_iter, &mut rng);
        if best.as_ref().map_or(true, |(b, _)| inertia < *b) {
            best = Some((inertia, labels));
        }
    }

    let (_, mut labels) = best.ok_or_else(|| Error::Precondition("no k-means restart ran".into()))?;
    fill_empty_clusters(points, k, &mut labels);
    Ok(relabel_by_first_appearance(&labels))
}

fn lloyd(points: &[(f64, f64)], k: usize, max_iter: usize, rng: &mut ChaCha8Rng) -> (f64, Vec<usize>) {
    let n = points.len();
    let mut centroids = kmeans_plusplus_init(points, k, rng);
    let mut labels = vec![usize::MAX; n];
    let mut iter = 0;

    loop {
        let mut changed = false;
        for (i, p) in points.iter().enumerate() {
            let best_cluster = nearest(p, &centroids);
            if labels[i] != best_cluster {
                labels[i] = best_cluster;
                changed = true;
            }
        }

        iter += 1;
        if !changed || iter >= max_iter {
            break;
        }

        centroids = update_centroids(points, &labels, &centroids);
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &c)| sq_dist(p, &centroids[c]))
        .sum();
    (inertia, labels)
}

/// Recompute means; an empty cluster takes the point farthest from its own
/// centroid.
fn update_centroids(points: &[(f64, f64)], labels: &[usize], previous: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let k = previous.len();
    let mut sums = vec![(0.0, 0.0); k];
    let mut counts = vec![0usize; k];

    for (p, &c) in points.iter().zip(labels) {
        sums[c].0 += p.0;
        sums[c].1 += p.1;
        counts[c] += 1;
    }

    let mut centroids: Vec<(f64, f64)> = sums
        .iter()
        .zip(&counts)
        .zip(previous)
        .map(|((s, &cnt), prev)| {
            if cnt > 0 {
                (s.0 / cnt as f64, s.1 / cnt as f64)
            } else {
                *prev
            }
        })
        .collect();

    for c in 0..k {
        if counts[c] == 0 {
            let far = points
                .iter()
                .zip(labels)
                .enumerate()
                .max_by(|(_, (a, &ca)), (_, (b, &cb))| {
                    sq_dist(a, &centroids[ca]).total_cmp(&sq_dist(b, &centroids[cb]))
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            centroids[c] = points[far];
        }
    }

    centroids
}

/// K-means++ initialization
fn kmeans_plusplus_init(points: &[(f64, f64)], k: usize, rng: &mut ChaCha8Rng) -> Vec<(f64, f64)> {
    let n = points.len();
    let mut centroids: Vec<(f64, f64)> = Vec::with_capacity(k);

    centroids.push(points[rng.gen_range(0..n)]);

    // Remaining centroids: weighted by squared distance to nearest centroid
    for _ in 1..k {
        let sq_distances: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| sq_dist(p, c))
                    .fold(f64::MAX, f64::min)
            })
            .collect();
        let total: f64 = sq_distances.iter().sum();

        if total < 1e-12 {
            centroids.push(points[rng.gen_range(0..n)]);
            continue;
        }

        let threshold = rng.gen::<f64>() * total;
        let mut cumsum = 0.0;
        let mut selected = n - 1;
        for (i, &d) in sq_distances.iter().enumerate() {
            cumsum += d;
            if cumsum >= threshold && d > 0.0 {
                selected = i;
                break;
            }
        }
        centroids.push(points[selected]);
    }

    centroids
}

/// Move points into clusters left empty after the final assignment.
///
/// Coincident points can leave a cluster without members. Each empty label
/// takes the point farthest from its centroid among clusters that can spare
/// one.
fn fill_empty_clusters(points: &[(f64, f64)], k: usize, labels: &mut [usize]) {
    loop {
        let mut counts = vec![0usize; k];
        for &c in labels.iter() {
            counts[c] += 1;
        }
        let Some(empty) = counts.iter().position(|&c| c == 0) else {
            return;
        };

        let centroids = means(points, labels, k);
        let donor = labels
            .iter()
            .enumerate()
            .filter(|(_, &c)| counts[c] > 1)
            .max_by(|(a, &ca), (b, &cb)| {
                sq_dist(&points[*a], &centroids[ca]).total_cmp(&sq_dist(&points[*b], &centroids[cb]))
            })
            .map(|(i, _)| i);

        match donor {
            Some(i) => labels[i] = empty,
            // k <= n guarantees a donor exists
            None => return,
        }
    }
}

fn means(points: &[(f64, f64)], labels: &[usize], k: usize) -> Vec<(f64, f64)> {
    let mut sums = vec![(0.0, 0.0, 0usize); k];
    for (p, &c) in points.iter().zip(labels) {
        sums[c].0 += p.0;
        sums[c].1 += p.1;
        sums[c].2 += 1;
    }
    sums.into_iter()
        .map(|(x, y, cnt)| if cnt > 0 { (x / cnt as f64, y / cnt as f64) } else { (0.0, 0.0) })
        .collect()
}

fn relabel_by_first_appearance(labels: &[usize]) -> Vec<usize> {
    let mut mapping: Vec<Option<usize>> = vec![None; labels.iter().max().map_or(0, |m| m + 1)];
    let mut next = 0;
    labels
        .iter()
        .map(|&l| {
            *mapping[l].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

#[inline]
fn nearest(p: &(f64, f64), centroids: &[(f64, f64)]) -> usize {
    let mut best_cluster = 0;
    let mut best_dist = f64::MAX;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = sq_dist(p, centroid);
        if d < best_dist {
            best_dist = d;
            best_cluster = c;
        }
    }
    best_cluster
}

#[inline]
fn sq_dist(a: &(f64, f64), b: &(f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<(f64, f64)> {
        vec![
            (71.0, 24.0),
            (71.1, 24.1),
            (71.05, 24.05),
            (75.0, 20.0),
            (75.1, 20.1),
            (75.05, 20.05),
        ]
    }

    #[test]
    fn single_group_puts_everything_together() {
        let labels = partition(&two_blobs(), 1, &KMeansParams::default()).unwrap();
        assert_eq!(labels, vec![0; 6]);
    }

    #[test]
    fn separates_distant_blobs() {
        let labels = partition(&two_blobs(), 2, &KMeansParams::default()).unwrap();
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn same_seed_same_partition() {
        let pts: Vec<(f64, f64)> = (0..40)
            .map(|i| ((i % 7) as f64 * 0.3, (i / 7) as f64 * 0.2))
            .collect();
        let params = KMeansParams::default();
        let a = partition(&pts, 4, &params).unwrap();
        let b = partition(&pts, 4, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_group_is_used_even_with_coincident_points() {
        let pts = vec![(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (2.0, 2.0)];
        let labels = partition(&pts, 3, &KMeansParams::default()).unwrap();
        for g in 0..3 {
            assert!(labels.contains(&g), "group {g} empty in {labels:?}");
        }
    }

    #[test]
    fn more_groups_than_points_is_clamped() {
        let pts = vec![(0.0, 0.0), (1.0, 1.0)];
        let mut labels = partition(&pts, 5, &KMeansParams::default()).unwrap();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn empty_input_or_zero_groups_fail() {
        assert!(partition(&[], 2, &KMeansParams::default()).is_err());
        assert!(partition(&[(0.0, 0.0)], 0, &KMeansParams::default()).is_err());
    }

    #[test]
    fn relabel_orders_by_first_appearance() {
        assert_eq!(relabel_by_first_appearance(&[2, 2, 0, 1, 0]), vec![0, 0, 1, 2, 1]);
    }
}
