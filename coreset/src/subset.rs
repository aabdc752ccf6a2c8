use std::hash::{DefaultHasher, Hash, Hasher};

use ml_core::Selection;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

/// The weights of a subset view, looked up through the batch ordering.
#[derive(Debug, Clone, PartialEq)]
struct WeightMap {
    /// `positions[k]` is where the weight of the `k`-th example in batch order sits in `gammas`.
    positions: Vec<usize>,
    gammas: Vec<f32>,
}

/// One mini-batch of a `TrainingView`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewBatch<'a> {
    pub indices: &'a [usize],
    /// `None` for unweighted (full-data) batches.
    pub weights: Option<Vec<f32>>,
}

/// A batch-ordered list of dataset indices, optionally carrying one weight per example.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingView {
    order: Vec<usize>,
    weights: Option<WeightMap>,
    batch_size: usize,
}

impl TrainingView {
    /// The unweighted view over `0..len`, in order.
    pub fn full(len: usize, batch_size: usize) -> Self {
        Self {
            order: (0..len).collect(),
            weights: None,
            batch_size: batch_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// The dataset indices in batch order.
    pub fn indices(&self) -> &[usize] {
        &self.order
    }

    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    /// Iterates over the mini-batches of this view; the last one may be short.
    pub fn batches(&self) -> impl Iterator<Item = ViewBatch<'_>> {
        self.order
            .chunks(self.batch_size)
            .enumerate()
            .map(move |(b, indices)| {
                let weights = self.weights.as_ref().map(|map| {
                    let start = b * self.batch_size;
                    map.positions[start..start + indices.len()]
                        .iter()
                        .map(|&p| map.gammas[p])
                        .collect()
                });

                ViewBatch { indices, weights }
            })
    }

    /// A hash of the batch order, the indices and the exact weight bits.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.batch_size.hash(&mut hasher);
        self.order.hash(&mut hasher);

        if let Some(map) = &self.weights {
            map.positions.hash(&mut hasher);
            for gamma in &map.gammas {
                gamma.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }
}

/// Turns selections into weighted training views.
///
/// With `shuffle` on, the batch order is permuted once per `build`, so a view never changes
/// between two selections.
#[derive(Debug, Clone)]
pub struct SubsetBuilder {
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl SubsetBuilder {
    pub fn new(batch_size: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn build(&mut self, selection: &Selection) -> TrainingView {
        let mut positions: Vec<usize> = (0..selection.len()).collect();
        if self.shuffle {
            positions.shuffle(&mut self.rng);
        }

        let indices = selection.indices();
        let order = positions.iter().map(|&p| indices[p]).collect();

        TrainingView {
            order,
            weights: Some(WeightMap {
                positions,
                gammas: selection.gammas().to_vec(),
            }),
            batch_size: self.batch_size,
        }
    }
}
