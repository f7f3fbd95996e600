//! Brute-force k-nearest-neighbour matching under Hamming distance.

use super::Descriptor;

/// One candidate neighbour of a query descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    /// Index into the train set.
    pub index: usize,
    pub distance: u32,
}

/// Number of differing bits.
#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// For every query, its `k` nearest train descriptors ordered by ascending
/// distance, then ascending train index. Lists are shorter than `k` when the
/// train set is.
pub fn knn_match(query: &[Descriptor], train: &[Descriptor], k: usize) -> Vec<Vec<Neighbor>> {
    query
        .iter()
        .map(|q| {
            let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
            if k == 0 {
                return best;
            }
            for (index, t) in train.iter().enumerate() {
                let distance = hamming(q, t);
                // Train order is ascending, so equal distances keep index order.
                let pos = best.partition_point(|n| n.distance <= distance);
                if pos < k {
                    best.insert(pos, Neighbor { index, distance });
                    best.truncate(k);
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{hamming, knn_match, Neighbor};

    fn desc(fill: u8) -> [u8; 32] {
        [fill; 32]
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming(&desc(0), &desc(0)), 0);
        assert_eq!(hamming(&desc(0), &desc(0xFF)), 256);
        assert_eq!(hamming(&desc(0b1010), &desc(0b0110)), 64);
    }

    #[test]
    fn neighbours_sorted_by_distance_then_index() {
        let train = [desc(0xFF), desc(0x01), desc(0x00), desc(0x01)];
        let out = knn_match(&[desc(0x00)], &train, 3);
        assert_eq!(
            out[0],
            vec![
                Neighbor { index: 2, distance: 0 },
                Neighbor { index: 1, distance: 32 },
                Neighbor { index: 3, distance: 32 },
            ]
        );
    }

    #[test]
    fn short_train_set_gives_short_lists() {
        let out = knn_match(&[desc(1), desc(2)], &[desc(3)], 2);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|n| n.len() == 1));
        assert!(knn_match(&[desc(1)], &[], 2)[0].is_empty());
        assert!(knn_match(&[desc(1)], &[desc(1)], 0)[0].is_empty());
    }
}
