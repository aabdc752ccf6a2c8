use ndarray::{ArrayView1, ArrayView2, Axis};

/// Statistics produced by a single training batch.
///
/// This type keeps fields private to allow evolving the internal counters
/// without breaking the public API.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchStats {
    loss: f32,
    correct: usize,
    samples: usize,
}

impl BatchStats {
    /// Creates a new `BatchStats`.
    ///
    /// # Args
    /// * `loss` - The reduced loss that was minimized for the batch.
    /// * `correct` - Number of correct predictions in the batch.
    /// * `samples` - Number of samples in the batch.
    pub fn new(loss: f32, correct: usize, samples: usize) -> Self {
        Self {
            loss,
            correct,
            samples,
        }
    }

    /// Returns the reduced loss of the batch.
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Returns the number of correct predictions.
    pub fn correct(&self) -> usize {
        self.correct
    }

    /// Returns the number of samples processed.
    pub fn samples(&self) -> usize {
        self.samples
    }
}

/// Counts rows where the largest prediction sits at the same column as the
/// largest target.
///
/// Single-output (regression) targets have no meaningful class, so they count
/// as zero correct predictions.
pub fn argmax_matches(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> usize {
    if y.ncols() < 2 {
        return 0;
    }

    y_pred
        .axis_iter(Axis(0))
        .zip(y.axis_iter(Axis(0)))
        .filter(|(p, t)| argmax(*p) == argmax(*t))
        .count()
}

fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;

    for (i, &v) in row.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }

    best
}
