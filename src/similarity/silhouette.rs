use super::DissimilarityMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silhouette {
    /// Mean silhouette width over every document.
    pub average: f64,
    pub widths: Vec<f64>,
}

/// Silhouette widths of a partition into `cluster_count` clusters.
/// Documents alone in their cluster get width 0.
pub fn silhouette(
    dissimilarity: &DissimilarityMatrix,
    assignments: &[usize],
    cluster_count: usize,
) -> Silhouette {
    let size = assignments.len();
    let mut cluster_sizes = vec![0usize; cluster_count];
    for cluster in assignments.iter() {
        cluster_sizes[*cluster] += 1;
    }

    let mut widths = Vec::with_capacity(size);
    let mut sums = vec![0.0; cluster_count];
    for (i, own) in assignments.iter().enumerate() {
        if cluster_sizes[*own] <= 1 || cluster_count < 2 {
            widths.push(0.0);
            continue;
        }
        sums.iter_mut().for_each(|s| *s = 0.0);
        for (j, cluster) in assignments.iter().enumerate() {
            if i != j {
                sums[*cluster] += dissimilarity.get(i, j);
            }
        }

        let a = sums[*own] / (cluster_sizes[*own] - 1) as f64;
        let b = (0..cluster_count)
            .filter(|c| c != own && cluster_sizes[*c] > 0)
            .map(|c| sums[c] / cluster_sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let width = if b.is_finite() && a.max(b) > 0.0 {
            (b - a) / a.max(b)
        } else {
            0.0
        };
        widths.push(width);
    }

    let average = if widths.is_empty() {
        0.0
    } else {
        widths.iter().sum::<f64>() / widths.len() as f64
    };
    Silhouette { average, widths }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_line(points: &[f64]) -> DissimilarityMatrix {
        let points = points.to_vec();
        DissimilarityMatrix::from_fn(points.len(), move |i, j| (points[i] - points[j]).abs())
    }

    #[test]
    fn test_well_separated_clusters() {
        let dissimilarity = make_line(&[0.0, 1.0, 10.0, 11.0]);
        let result = silhouette(&dissimilarity, &[0, 0, 1, 1], 2);
        // a = 1, b = (10 + 11) / 2 = 10.5 for document 0
        assert!((result.widths[0] - (9.5 / 10.5)).abs() < 1e-12);
        assert!(result.average > 0.8);
    }

    #[test]
    fn test_bad_partition_is_negative() {
        let dissimilarity = make_line(&[0.0, 1.0, 10.0, 11.0]);
        let result = silhouette(&dissimilarity, &[0, 1, 0, 1], 2);
        assert!(result.average < 0.0);
    }

    #[test]
    fn test_singleton_cluster_scores_zero() {
        let dissimilarity = make_line(&[0.0, 1.0, 10.0]);
        let result = silhouette(&dissimilarity, &[0, 0, 1], 2);
        assert_eq!(result.widths[2], 0.0);
        assert_eq!(result.widths.len(), 3);
    }
}
