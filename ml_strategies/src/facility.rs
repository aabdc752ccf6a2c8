//! Greedy facility-location maximization.

use std::{cmp::Ordering, collections::BinaryHeap};

use ml_core::GreedyMode;
use ndarray::{Array2, ArrayView2, Axis};

/// Pairwise similarities `max(D) - D` where `D` holds the Euclidean distances between rows.
///
/// Every entry is non-negative and the diagonal holds the largest value of its row.
pub fn similarity(embeddings: ArrayView2<f32>) -> Array2<f32> {
    let norms = embeddings.map_axis(Axis(1), |row| row.dot(&row));
    let gram = embeddings.dot(&embeddings.t());

    let mut dist = gram;
    for ((i, j), d) in dist.indexed_iter_mut() {
        *d = (norms[i] + norms[j] - 2. * *d).max(0.).sqrt();
    }
    dist.diag_mut().fill(0.);

    let max = dist.fold(0f32, |acc, &d| acc.max(d));
    dist.mapv_inplace(|d| max - d);
    dist
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    gain: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Larger gains first, lower indices break ties.
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then(other.index.cmp(&self.index))
    }
}

fn gain(sim: &ArrayView2<f32>, best: &[f32], j: usize) -> f32 {
    sim.column(j)
        .iter()
        .zip(best)
        .map(|(&s, &b)| (s - b).max(0.))
        .sum()
}

fn cover(sim: &ArrayView2<f32>, best: &mut [f32], j: usize) {
    for (b, &s) in best.iter_mut().zip(sim.column(j)) {
        *b = b.max(s);
    }
}

/// Picks `k` columns of `sim` maximizing `Σ_i max_{j ∈ S} sim[i][j]`, in pick order.
///
/// `Exact` re-evaluates every remaining candidate at every step. `Lazy` keeps a max-heap of
/// stale gains and only re-evaluates the top, which submodularity makes equivalent.
pub fn greedy(sim: ArrayView2<f32>, k: usize, mode: GreedyMode) -> Vec<usize> {
    let n = sim.ncols();
    let k = k.min(n);
    let mut best = vec![0f32; sim.nrows()];
    let mut selected = Vec::with_capacity(k);

    match mode {
        GreedyMode::Exact => {
            let mut taken = vec![false; n];

            while selected.len() < k {
                let Some(top) = (0..n)
                    .filter(|&j| !taken[j])
                    .map(|j| Candidate {
                        gain: gain(&sim, &best, j),
                        index: j,
                    })
                    .max()
                else {
                    break;
                };

                taken[top.index] = true;
                cover(&sim, &mut best, top.index);
                selected.push(top.index);
            }
        }
        GreedyMode::Lazy => {
            let mut heap: BinaryHeap<_> = (0..n)
                .map(|j| Candidate {
                    gain: gain(&sim, &best, j),
                    index: j,
                })
                .collect();

            while selected.len() < k {
                let Some(stale) = heap.pop() else {
                    break;
                };

                let fresh = Candidate {
                    gain: gain(&sim, &best, stale.index),
                    index: stale.index,
                };

                match heap.peek() {
                    Some(next) if fresh < *next => heap.push(fresh),
                    _ => {
                        cover(&sim, &mut best, fresh.index);
                        selected.push(fresh.index);
                    }
                }
            }
        }
    }

    selected
}

/// Counts, for every selected column, how many rows it is the most similar selected column of.
///
/// A row that is itself selected always counts towards itself, so every weight is at least 1.
/// Other ties go to the earliest pick.
pub fn cluster_weights(sim: ArrayView2<f32>, selected: &[usize]) -> Vec<f32> {
    let mut weights = vec![0f32; selected.len()];
    let position: std::collections::HashMap<usize, usize> = selected
        .iter()
        .enumerate()
        .map(|(pos, &j)| (j, pos))
        .collect();

    for (i, row) in sim.axis_iter(Axis(0)).enumerate() {
        let owner = match position.get(&i) {
            Some(&pos) => Some(pos),
            None => selected
                .iter()
                .enumerate()
                .fold(None, |acc: Option<(usize, f32)>, (pos, &j)| match acc {
                    Some((_, s)) if s >= row[j] => acc,
                    _ => Some((pos, row[j])),
                })
                .map(|(pos, _)| pos),
        };

        if let Some(pos) = owner {
            weights[pos] += 1.;
        }
    }

    weights
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[test]
    fn similarity_is_shifted_distance() {
        let emb = array![[0., 0.], [3., 4.], [0., 1.]];
        let sim = similarity(emb.view());

        assert_eq!(sim[[0, 0]], 5.);
        assert_eq!(sim[[0, 1]], 0.);
        assert!((sim[[0, 2]] - 4.).abs() < 1e-5);
        assert_eq!(sim, sim.t());
    }

    #[test]
    fn picks_the_medoid_first() {
        let emb = array![[0.], [1.], [2.], [10.]];
        let sim = similarity(emb.view());

        assert_eq!(greedy(sim.view(), 1, GreedyMode::Exact), [1]);
        assert_eq!(greedy(sim.view(), 1, GreedyMode::Lazy), [1]);
    }

    #[test]
    fn exact_and_lazy_agree() {
        let mut rng = StdRng::seed_from_u64(9);
        let emb = Array2::from_shape_fn((60, 3), |_| rng.random_range(-1.0..1.0));
        let sim = similarity(emb.view());

        let exact = greedy(sim.view(), 12, GreedyMode::Exact);
        let lazy = greedy(sim.view(), 12, GreedyMode::Lazy);

        assert_eq!(exact.len(), 12);
        assert_eq!(exact, lazy);
    }

    #[test]
    fn weights_count_closest_members() {
        let emb = array![[0.], [0.1], [0.2], [5.], [5.1]];
        let sim = similarity(emb.view());

        let weights = cluster_weights(sim.view(), &[1, 3]);
        assert_eq!(weights, [3., 2.]);
        assert_eq!(weights.iter().sum::<f32>(), 5.);
    }

    #[test]
    fn duplicates_keep_their_own_weight() {
        let emb = array![[1.], [1.], [1.]];
        let sim = similarity(emb.view());

        assert_eq!(cluster_weights(sim.view(), &[0, 2]), [2., 1.]);
    }
}
