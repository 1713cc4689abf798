//! Brute-force Hamming k-nearest-neighbour matching.

use super::{hamming, Feature, FeatureSet};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A query/train correspondence with its descriptor distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DMatch {
    /// Index into the query set.
    pub query: usize,
    /// Index into the train set.
    pub train: usize,
    pub distance: u32,
}

/// For every active query feature, the `k` closest active train features.
///
/// Outer entries follow query index order; inner lists are sorted by
/// distance, then train index. Lists are shorter than `k` when the train set
/// has fewer active features.
pub fn knn_match(query: &FeatureSet, train: &FeatureSet, k: usize) -> Vec<Vec<DMatch>> {
    let queries: Vec<(usize, &Feature)> = query.active().collect();
    let candidates: Vec<(usize, &Feature)> = train.active().collect();
    let nearest = |&(qi, qf): &(usize, &Feature)| nearest_k(qi, qf, &candidates, k);

    #[cfg(feature = "rayon")]
    {
        queries.par_iter().map(nearest).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        queries.iter().map(nearest).collect()
    }
}

fn nearest_k(qi: usize, qf: &Feature, candidates: &[(usize, &Feature)], k: usize) -> Vec<DMatch> {
    let mut best: Vec<DMatch> = Vec::with_capacity(k + 1);
    if k == 0 {
        return best;
    }
    for &(ti, tf) in candidates {
        let distance = hamming(&qf.descriptor, &tf.descriptor);
        if best.len() == k && best.last().is_some_and(|worst| distance >= worst.distance) {
            continue;
        }
        let pos = best.partition_point(|m| m.distance <= distance);
        best.insert(
            pos,
            DMatch {
                query: qi,
                train: ti,
                distance,
            },
        );
        best.truncate(k);
    }
    best
}

/// Keeps the best neighbour of each query when it is clearly closer than the
/// runner-up: `best < ratio * second`. Queries with fewer than two
/// neighbours are dropped.
pub fn ratio_test(matches: &[Vec<DMatch>], ratio: f32) -> Vec<DMatch> {
    matches
        .iter()
        .filter_map(|m| match m.as_slice() {
            [best, second, ..] if (best.distance as f32) < ratio * second.distance as f32 => {
                Some(*best)
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{knn_match, ratio_test, DMatch};
    use crate::features::{Feature, FeatureSet, Keypoint};

    fn set(descs: &[[u8; 32]]) -> FeatureSet {
        descs
            .iter()
            .map(|&descriptor| Feature {
                keypoint: Keypoint {
                    x: 0.0,
                    y: 0.0,
                    angle: 0.0,
                    response: 0.0,
                    octave: 0,
                },
                descriptor,
            })
            .collect()
    }

    fn desc(ones: usize) -> [u8; 32] {
        let mut d = [0u8; 32];
        for bit in 0..ones {
            d[bit / 8] |= 1 << (bit % 8);
        }
        d
    }

    #[test]
    fn knn_returns_sorted_neighbours() {
        let query = set(&[desc(0)]);
        let train = set(&[desc(40), desc(3), desc(10)]);
        let m = knn_match(&query, &train, 2);
        assert_eq!(m.len(), 1);
        assert_eq!(
            m[0],
            vec![
                DMatch {
                    query: 0,
                    train: 1,
                    distance: 3
                },
                DMatch {
                    query: 0,
                    train: 2,
                    distance: 10
                }
            ]
        );
    }

    #[test]
    fn knn_skips_removed_features() {
        let mut query = set(&[desc(0), desc(5)]);
        let mut train = set(&[desc(0), desc(8), desc(30)]);
        query.remove(0);
        train.remove(0);
        let m = knn_match(&query, &train, 2);
        assert_eq!(m.len(), 1);
        assert_eq!(m[0][0].query, 1);
        assert_eq!(m[0][0].train, 1);
        assert_eq!(m[0][1].train, 2);
    }

    #[test]
    fn ratio_test_filters_ambiguous_and_short_lists() {
        let mk = |train, distance| DMatch {
            query: 0,
            train,
            distance,
        };
        let lists = vec![
            vec![mk(0, 2), mk(1, 10)],
            vec![mk(2, 8), mk(3, 10)],
            vec![mk(4, 1)],
            vec![mk(5, 0), mk(6, 0)],
        ];
        let kept = ratio_test(&lists, 0.7);
        assert_eq!(kept, vec![mk(0, 2)]);
    }
}
