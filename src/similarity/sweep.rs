//! Chooses the cluster count by average silhouette width.

use super::pam::{pam, Clustering};
use super::silhouette::{silhouette, Silhouette};
use super::{Degeneracy, DissimilarityMatrix, SimilarityError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Silhouette differences below this are ties.
const TIE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterCount {
    Fixed(usize),
    Sweep { min: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub count: ClusterCount,
    /// Random medoid initializations per cluster count.
    pub restarts: usize,
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            count: ClusterCount::Sweep { min: 2, max: 10 },
            restarts: 5,
            seed: 1234,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterCandidate {
    pub clusters: usize,
    pub average_silhouette: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSelection {
    pub chosen: usize,
    pub clustering: Clustering,
    pub silhouette: Silhouette,
    /// Every swept candidate in ascending order, empty for a fixed count.
    pub candidates: Vec<ClusterCandidate>,
}

/// Each candidate gets a generator seeded from the run seed, so the sweep
/// matches a sequential run whatever the thread count.
fn run_candidate(
    dissimilarity: &DissimilarityMatrix,
    clusters: usize,
    config: &ClusteringConfig,
) -> Result<(Clustering, Silhouette), SimilarityError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let clustering = pam(dissimilarity, clusters, config.restarts, &mut rng)?;
    let widths = silhouette(dissimilarity, &clustering.assignments, clusters);
    Ok((clustering, widths))
}

/// Index of the best candidate, the smallest cluster count on ties.
fn best_candidate(candidates: &[ClusterCandidate]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            Some(current)
                if candidate.average_silhouette
                    <= candidates[current].average_silhouette + TIE_EPSILON => {}
            _ => best = Some(index),
        }
    }
    best
}

pub fn select_clusters(
    dissimilarity: &DissimilarityMatrix,
    config: &ClusteringConfig,
) -> Result<ClusterSelection, SimilarityError> {
    let size = dissimilarity.size();
    let (min, max) = match config.count {
        ClusterCount::Fixed(clusters) => {
            if clusters < 2 || clusters >= size {
                return Err(SimilarityError::InvalidClusterCount {
                    clusters,
                    documents: size,
                });
            }
            let (clustering, silhouette) = run_candidate(dissimilarity, clusters, config)?;
            info!(
                "Clustered {} documents into {} clusters (silhouette {:.4})",
                size, clusters, silhouette.average
            );
            return Ok(ClusterSelection {
                chosen: clusters,
                clustering,
                silhouette,
                candidates: vec![],
            });
        }
        ClusterCount::Sweep { min, max } => (min, max),
    };

    let lower = min.max(2);
    let upper = max.min(size.saturating_sub(1));
    if lower > upper {
        return Err(SimilarityError::Degenerate(Degeneracy::NoViableCandidate {
            min,
            max,
            documents: size,
        }));
    }
    if lower == upper {
        return Err(SimilarityError::Degenerate(
            Degeneracy::SingleViableCandidate { clusters: lower },
        ));
    }

    let mut results: Vec<(Clustering, Silhouette)> = (lower..=upper)
        .into_par_iter()
        .map(|clusters| run_candidate(dissimilarity, clusters, config))
        .collect::<Result<_, _>>()?;
    let candidates: Vec<ClusterCandidate> = results
        .iter()
        .map(|(clustering, silhouette)| ClusterCandidate {
            clusters: clustering.cluster_count(),
            average_silhouette: silhouette.average,
            cost: clustering.cost,
        })
        .collect();
    for candidate in candidates.iter() {
        info!(
            "- K'={}: silhouette {:.4}, cost {:.4}",
            candidate.clusters, candidate.average_silhouette, candidate.cost
        );
    }

    let first = candidates[0].average_silhouette;
    if candidates
        .iter()
        .all(|c| (c.average_silhouette - first).abs() <= TIE_EPSILON)
    {
        return Err(SimilarityError::Degenerate(Degeneracy::AllScoresEqual {
            score: first,
        }));
    }

    let best = best_candidate(&candidates).unwrap_or(0);
    let (clustering, silhouette) = results.swap_remove(best);
    info!(
        "Selected {} clusters (silhouette {:.4})",
        clustering.cluster_count(),
        silhouette.average
    );
    Ok(ClusterSelection {
        chosen: clustering.cluster_count(),
        clustering,
        silhouette,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_groups() -> DissimilarityMatrix {
        // Three tight groups far apart.
        let points: [f64; 8] = [0.0, 0.1, 0.2, 5.0, 5.1, 10.0, 10.1, 10.2];
        DissimilarityMatrix::from_fn(points.len(), |i, j| {
            (points[i] - points[j]).abs() / 10.2
        })
    }

    fn make_config(count: ClusterCount) -> ClusteringConfig {
        ClusteringConfig {
            count,
            restarts: 3,
            seed: 42,
        }
    }

    #[test]
    fn test_sweep_picks_natural_count() {
        let selection = select_clusters(
            &make_groups(),
            &make_config(ClusterCount::Sweep { min: 2, max: 6 }),
        )
        .unwrap();
        assert_eq!(selection.chosen, 3);
        assert_eq!(selection.candidates.len(), 5);
        assert_eq!(selection.clustering.assignments, vec![0, 0, 0, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_sweep_range_capped_at_documents() {
        let selection = select_clusters(
            &make_groups(),
            &make_config(ClusterCount::Sweep { min: 1, max: 50 }),
        )
        .unwrap();
        let counts: Vec<usize> = selection.candidates.iter().map(|c| c.clusters).collect();
        assert_eq!(counts, (2..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_fixed_count_skips_sweep() {
        let selection =
            select_clusters(&make_groups(), &make_config(ClusterCount::Fixed(2))).unwrap();
        assert_eq!(selection.chosen, 2);
        assert!(selection.candidates.is_empty());
        assert_eq!(selection.clustering.assignments.len(), 8);
    }

    #[test]
    fn test_fixed_count_out_of_range() {
        for clusters in [1, 8, 9] {
            assert_eq!(
                select_clusters(&make_groups(), &make_config(ClusterCount::Fixed(clusters)))
                    .unwrap_err(),
                SimilarityError::InvalidClusterCount {
                    clusters,
                    documents: 8
                }
            );
        }
        let selection =
            select_clusters(&make_groups(), &make_config(ClusterCount::Fixed(7))).unwrap();
        assert_eq!(selection.chosen, 7);
    }

    #[test]
    fn test_ties_prefer_smallest_count() {
        let candidates = vec![
            ClusterCandidate {
                clusters: 2,
                average_silhouette: 0.3,
                cost: 1.0,
            },
            ClusterCandidate {
                clusters: 3,
                average_silhouette: 0.6,
                cost: 1.0,
            },
            ClusterCandidate {
                clusters: 4,
                average_silhouette: 0.6,
                cost: 1.0,
            },
        ];
        assert_eq!(best_candidate(&candidates), Some(1));
    }

    #[test]
    fn test_degenerate_conditions() {
        let small = DissimilarityMatrix::from_fn(3, |i, j| (i + j) as f64 / 3.0);
        assert_eq!(
            select_clusters(&small, &make_config(ClusterCount::Sweep { min: 2, max: 10 }))
                .unwrap_err(),
            SimilarityError::Degenerate(Degeneracy::SingleViableCandidate { clusters: 2 })
        );
        assert_eq!(
            select_clusters(&small, &make_config(ClusterCount::Sweep { min: 4, max: 10 }))
                .unwrap_err(),
            SimilarityError::Degenerate(Degeneracy::NoViableCandidate {
                min: 4,
                max: 10,
                documents: 3
            })
        );

        let identical = DissimilarityMatrix::from_fn(5, |_, _| 0.0);
        assert_eq!(
            select_clusters(&identical, &make_config(ClusterCount::Sweep { min: 2, max: 4 }))
                .unwrap_err(),
            SimilarityError::Degenerate(Degeneracy::AllScoresEqual { score: 0.0 })
        );
    }

    #[test]
    fn test_sweep_is_reproducible() {
        let config = make_config(ClusterCount::Sweep { min: 2, max: 5 });
        let first = select_clusters(&make_groups(), &config).unwrap();
        let second = select_clusters(&make_groups(), &config).unwrap();
        assert_eq!(first, second);
    }
}
