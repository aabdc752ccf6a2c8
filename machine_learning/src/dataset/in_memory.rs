use ml_core::{Batch, DataError, Dataset};
use ndarray::{Array2, ArrayView1, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{
    Result,
    error::{MlError, ensure_len},
};

/// A dataset fully held in memory as two row-aligned matrices.
///
/// Multi-column targets are treated as one-hot (or soft) class encodings: the class of a sample
/// is the column of its largest target. Single-column targets are regression targets and all
/// share class 0.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryDataset {
    x: Array2<f32>,
    y: Array2<f32>,
    classes: Vec<usize>,
    num_classes: usize,
}

/// The result of carving validation and test samples out of a dataset.
#[derive(Debug, Clone)]
pub struct Splits {
    pub train: InMemoryDataset,
    pub valid: Option<InMemoryDataset>,
    pub test: Option<InMemoryDataset>,
}

fn class_of_row(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v { (i, v) } else { (best, best_v) }
        })
        .0
}

impl InMemoryDataset {
    /// Creates a new `InMemoryDataset`.
    ///
    /// # Arguments
    /// * `x` - The inputs, one row per sample.
    /// * `y` - The targets, one row per sample.
    ///
    /// # Returns
    /// An error if the amount of rows differ.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        ensure_len("dataset targets", y.nrows(), x.nrows())?;

        let (classes, num_classes) = if y.ncols() > 1 {
            let classes = y.axis_iter(Axis(0)).map(class_of_row).collect();
            (classes, y.ncols())
        } else {
            (vec![0; y.nrows()], 1)
        };

        Ok(Self {
            x,
            y,
            classes,
            num_classes,
        })
    }

    /// Creates a new `InMemoryDataset` one-hot encoding the given labels.
    ///
    /// # Returns
    /// An error if a label is not below `num_classes` or the sizes differ.
    pub fn from_labels(x: Array2<f32>, labels: &[usize], num_classes: usize) -> Result<Self> {
        ensure_len("dataset labels", labels.len(), x.nrows())?;

        if labels.iter().any(|&label| label >= num_classes) {
            return Err(MlError::InvalidInput("label is not below the amount of classes"));
        }

        let mut y = Array2::zeros((labels.len(), num_classes));
        for (row, &label) in labels.iter().enumerate() {
            y[[row, label]] = 1.;
        }

        Self::new(x, y)
    }

    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    /// Copies the given rows into a new dataset, in order.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn rows(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
            classes: indices.iter().map(|&i| self.classes[i]).collect(),
            num_classes: self.num_classes,
        }
    }

    /// Randomly carves a validation and a test split out of this dataset.
    ///
    /// Each split gets `floor(fraction * len)` samples, a zero-sized split is `None`. The samples
    /// of every split keep their original relative order.
    ///
    /// # Returns
    /// An error if the fractions are not in `[0, 1)` or leave no training samples.
    pub fn split<R: Rng + ?Sized>(
        self,
        valid_fraction: f64,
        test_fraction: f64,
        rng: &mut R,
    ) -> Result<Splits> {
        let valid_range = 0.0..1.0;
        if !valid_range.contains(&valid_fraction) || !valid_range.contains(&test_fraction) {
            return Err(MlError::InvalidInput("split fractions must be in [0, 1)"));
        }

        let len = self.x.nrows();
        let n_valid = (valid_fraction * len as f64).floor() as usize;
        let n_test = (test_fraction * len as f64).floor() as usize;

        if n_valid + n_test >= len {
            return Err(MlError::InvalidInput("splits leave no training samples"));
        }

        let mut order: Vec<_> = (0..len).collect();
        order.shuffle(rng);

        let (valid, rest) = order.split_at_mut(n_valid);
        let (test, train) = rest.split_at_mut(n_test);

        let part = |indices: &mut [usize]| {
            indices.sort_unstable();
            let indices = &*indices;
            (!indices.is_empty()).then(|| self.rows(indices))
        };

        let valid = part(valid);
        let test = part(test);
        let train = part(train).ok_or(MlError::InvalidInput("splits leave no training samples"))?;

        Ok(Splits { train, valid, test })
    }
}

impl Dataset for InMemoryDataset {
    fn len(&self) -> usize {
        self.x.nrows()
    }

    fn x_size(&self) -> usize {
        self.x.ncols()
    }

    fn y_size(&self) -> usize {
        self.y.ncols()
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn gather(&self, indices: &[usize]) -> std::result::Result<Batch, DataError> {
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(DataError::OutOfBounds { index, len });
        }

        Ok(Batch {
            x: self.x.select(Axis(0), indices),
            y: self.y.select(Axis(0), indices),
        })
    }

    fn class_of(&self, index: usize) -> std::result::Result<usize, DataError> {
        self.classes
            .get(index)
            .copied()
            .ok_or(DataError::OutOfBounds {
                index,
                len: self.classes.len(),
            })
    }
}
