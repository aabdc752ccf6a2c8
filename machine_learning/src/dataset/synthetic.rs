use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::{Normal, Uniform};

use super::InMemoryDataset;
use crate::{Result, error::MlError};

const CENTER_BOX: f32 = 10.;

/// Generates isotropic gaussian blobs, one per class, with balanced class sizes.
///
/// # Arguments
/// * `samples` - The total amount of samples.
/// * `features` - The width of every input row.
/// * `classes` - The amount of blobs.
/// * `spread` - The standard deviation of every blob.
/// * `rng` - The source of randomness.
///
/// # Returns
/// An error if a size is zero or `spread` is not a valid standard deviation.
pub fn blobs<R: Rng>(
    samples: usize,
    features: usize,
    classes: usize,
    spread: f32,
    rng: &mut R,
) -> Result<InMemoryDataset> {
    if samples == 0 || features == 0 || classes == 0 {
        return Err(MlError::InvalidInput("blobs sizes must be positive"));
    }

    if !(spread > 0.) || !spread.is_finite() {
        return Err(MlError::InvalidInput("blob spread must be positive and finite"));
    }

    let centers_dist = Uniform::new(-CENTER_BOX, CENTER_BOX)
        .map_err(|_| MlError::InvalidInput("blob center range"))?;
    let noise_dist =
        Normal::new(0., spread).map_err(|_| MlError::InvalidInput("blob spread"))?;

    let centers = Array2::random_using((classes, features), centers_dist, rng);
    let mut x = Array2::random_using((samples, features), noise_dist, rng);

    let labels: Vec<_> = (0..samples).map(|i| i % classes).collect();
    for (mut row, &label) in x.rows_mut().into_iter().zip(&labels) {
        row += &centers.row(label);
    }

    InMemoryDataset::from_labels(x, &labels, classes)
}
