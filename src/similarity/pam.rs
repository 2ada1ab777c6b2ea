//! Partitioning Around Medoids over a precomputed dissimilarity matrix.

use super::{DissimilarityMatrix, SimilarityError};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_SWAP_ROUNDS: usize = 1000;
const IMPROVEMENT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Medoid document positions in ascending order. Cluster `c` is the
    /// cluster of `medoids[c]`.
    pub medoids: Vec<usize>,
    /// Cluster index of every document.
    pub assignments: Vec<usize>,
    /// Sum of the dissimilarities of every document to its medoid.
    pub cost: f64,
}

impl Clustering {
    pub fn cluster_count(&self) -> usize {
        self.medoids.len()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.medoids.len()];
        for cluster in self.assignments.iter() {
            sizes[*cluster] += 1;
        }
        sizes
    }
}

/// Distance to the nearest and second nearest medoid of every document.
struct NearestMedoids {
    nearest: Vec<usize>,
    nearest_distance: Vec<f64>,
    second_distance: Vec<f64>,
}

impl NearestMedoids {
    fn compute(dissimilarity: &DissimilarityMatrix, medoids: &[usize]) -> Self {
        let size = dissimilarity.size();
        let mut nearest = vec![0; size];
        let mut nearest_distance = vec![f64::INFINITY; size];
        let mut second_distance = vec![f64::INFINITY; size];
        for document in 0..size {
            for (slot, medoid) in medoids.iter().enumerate() {
                let d = dissimilarity.get(document, *medoid);
                if d < nearest_distance[document] {
                    second_distance[document] = nearest_distance[document];
                    nearest_distance[document] = d;
                    nearest[document] = slot;
                } else if d < second_distance[document] {
                    second_distance[document] = d;
                }
            }
        }
        Self {
            nearest,
            nearest_distance,
            second_distance,
        }
    }

    fn cost(&self) -> f64 {
        self.nearest_distance.iter().sum()
    }
}

/// Change in total cost if the medoid in `slot` is replaced by `candidate`.
fn swap_delta(
    dissimilarity: &DissimilarityMatrix,
    nearest: &NearestMedoids,
    slot: usize,
    candidate: usize,
) -> f64 {
    let mut delta = 0.0;
    for document in 0..dissimilarity.size() {
        let to_candidate = dissimilarity.get(document, candidate);
        let current = nearest.nearest_distance[document];
        let replacement = if nearest.nearest[document] == slot {
            to_candidate.min(nearest.second_distance[document])
        } else {
            to_candidate.min(current)
        };
        delta += replacement - current;
    }
    delta
}

/// SWAP phase: applies the best improving swap until none is left.
fn swap_phase(dissimilarity: &DissimilarityMatrix, medoids: &mut [usize]) {
    let size = dissimilarity.size();
    for round in 0..MAX_SWAP_ROUNDS {
        let nearest = NearestMedoids::compute(dissimilarity, medoids);
        let mut best: Option<(usize, usize, f64)> = None;
        for slot in 0..medoids.len() {
            for candidate in (0..size).filter(|c| !medoids.contains(c)) {
                let delta = swap_delta(dissimilarity, &nearest, slot, candidate);
                if delta < -IMPROVEMENT_EPSILON && best.map_or(true, |(_, _, b)| delta < b) {
                    best = Some((slot, candidate, delta));
                }
            }
        }
        match best {
            Some((slot, candidate, delta)) => {
                debug!(
                    "PAM round {}: cost {:.6}, medoid {} -> {} ({:+.6})",
                    round,
                    nearest.cost(),
                    medoids[slot],
                    candidate,
                    delta
                );
                medoids[slot] = candidate;
            }
            None => return,
        }
    }
}

/// Final assignment: medoids sorted by position, each medoid forced into
/// its own cluster, every other document to its nearest medoid (the lower
/// cluster index on ties).
fn assign(dissimilarity: &DissimilarityMatrix, mut medoids: Vec<usize>) -> Clustering {
    medoids.sort_unstable();
    let nearest = NearestMedoids::compute(dissimilarity, &medoids);
    let mut assignments = nearest.nearest;
    for (cluster, medoid) in medoids.iter().enumerate() {
        assignments[*medoid] = cluster;
    }
    let cost = assignments
        .iter()
        .enumerate()
        .map(|(document, cluster)| dissimilarity.get(document, medoids[*cluster]))
        .sum();
    Clustering {
        medoids,
        assignments,
        cost,
    }
}

/// Runs PAM `restarts` times from random medoids drawn from `rng` and keeps
/// the lowest-cost partition, the earliest restart on ties.
pub fn pam(
    dissimilarity: &DissimilarityMatrix,
    cluster_count: usize,
    restarts: usize,
    rng: &mut StdRng,
) -> Result<Clustering, SimilarityError> {
    let size = dissimilarity.size();
    if cluster_count < 2 || cluster_count >= size {
        return Err(SimilarityError::InvalidClusterCount {
            clusters: cluster_count,
            documents: size,
        });
    }

    let mut best: Option<Clustering> = None;
    for restart in 0..restarts.max(1) {
        let mut medoids = sample(rng, size, cluster_count).into_vec();
        swap_phase(dissimilarity, &mut medoids);
        let clustering = assign(dissimilarity, medoids);
        debug!(
            "PAM K'={} restart {}: cost {:.6}",
            cluster_count, restart, clustering.cost
        );
        if best
            .as_ref()
            .map_or(true, |b| clustering.cost < b.cost - IMPROVEMENT_EPSILON)
        {
            best = Some(clustering);
        }
    }
    best.ok_or(SimilarityError::InvalidClusterCount {
        clusters: cluster_count,
        documents: size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// Two tight groups on a line: {0, 1, 2} near 0 and {3, 4} near 10.
    fn make_dissimilarity() -> DissimilarityMatrix {
        let points: [f64; 5] = [0.0, 0.5, 1.0, 10.0, 10.4];
        DissimilarityMatrix::from_fn(points.len(), |i, j| {
            (points[i] - points[j]).abs() / 10.4
        })
    }

    #[test]
    fn test_pam_finds_groups() {
        let dissimilarity = make_dissimilarity();
        let mut rng = StdRng::seed_from_u64(1);
        let clustering = pam(&dissimilarity, 2, 3, &mut rng).unwrap();
        assert_eq!(clustering.medoids[0], 1);
        assert!(clustering.medoids[1] == 3 || clustering.medoids[1] == 4);
        assert_eq!(clustering.assignments, vec![0, 0, 0, 1, 1]);
        assert_eq!(clustering.cluster_sizes(), vec![3, 2]);
    }

    #[test]
    fn test_pam_is_reproducible() {
        let dissimilarity = make_dissimilarity();
        let first = pam(&dissimilarity, 3, 2, &mut StdRng::seed_from_u64(5)).unwrap();
        let second = pam(&dissimilarity, 3, 2, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_cluster_non_empty() {
        let dissimilarity = make_dissimilarity();
        for k in 2..=4 {
            let clustering = pam(&dissimilarity, k, 2, &mut StdRng::seed_from_u64(9)).unwrap();
            assert_eq!(clustering.cluster_count(), k);
            assert!(clustering.cluster_sizes().iter().all(|s| *s > 0));
            assert!(clustering.assignments.iter().all(|c| *c < k));
            for (cluster, medoid) in clustering.medoids.iter().enumerate() {
                assert_eq!(clustering.assignments[*medoid], cluster);
            }
        }
    }

    #[test]
    fn test_medoids_forced_into_own_cluster() {
        // All documents identical: nearest-medoid ties everywhere.
        let dissimilarity = DissimilarityMatrix::from_fn(4, |_, _| 0.0);
        let clustering = pam(&dissimilarity, 3, 1, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(clustering.cluster_sizes().iter().sum::<usize>(), 4);
        assert!(clustering.cluster_sizes().iter().all(|s| *s > 0));
    }

    #[test]
    fn test_invalid_cluster_count() {
        let dissimilarity = make_dissimilarity();
        for k in [0, 1, 5, 6] {
            assert!(
                matches!(
                    pam(&dissimilarity, k, 1, &mut StdRng::seed_from_u64(1)),
                    Err(SimilarityError::InvalidClusterCount { clusters, documents: 5 })
                        if clusters == k
                ),
                "K'={} was accepted",
                k
            );
        }
    }
}
