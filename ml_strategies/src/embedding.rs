use ml_core::{Checkpoint, Dataset, LossFn, MlError, Model, SelectionError};
use ndarray::{s, Array1, Array2, Axis};

/// A private model copy used to score examples.
///
/// The embedding of an example is the derivative of its own loss with respect to the network
/// output, which is exactly the gradient of the last layer's biases for that example.
#[derive(Debug, Clone)]
pub struct Embedder<M, L> {
    model: M,
    loss: L,
    batch_size: usize,
}

impl<M, L> Embedder<M, L>
where
    M: Model + Checkpoint,
    L: LossFn,
{
    /// Creates a new `Embedder`.
    ///
    /// # Arguments
    /// * `model` - A copy of the model, its parameters get overwritten on every `load`.
    /// * `loss` - The training loss.
    /// * `batch_size` - The amount of examples per forward pass.
    pub fn new(model: M, loss: L, batch_size: usize) -> Self {
        Self {
            model,
            loss,
            batch_size: batch_size.max(1),
        }
    }

    /// Loads a snapshot into the private model copy.
    pub fn load(&mut self, state: &M::State) -> Result<(), SelectionError> {
        self.model.restore(state)?;
        Ok(())
    }

    pub fn loss(&self) -> &L {
        &self.loss
    }

    /// Runs the private model over `indices` in mini-batches.
    ///
    /// # Returns
    /// The predictions and the targets, one row per index, in order.
    pub fn outputs<D: Dataset + ?Sized>(
        &mut self,
        data: &D,
        indices: &[usize],
    ) -> Result<(Array2<f32>, Array2<f32>), SelectionError> {
        let y_size = data.y_size();
        let mut y_pred = Array2::zeros((indices.len(), y_size));
        let mut y = Array2::zeros((indices.len(), y_size));

        for (i, chunk) in indices.chunks(self.batch_size).enumerate() {
            let batch = data.gather(chunk)?;
            let out = self.model.forward(batch.x.view())?;

            if out.ncols() != y_size {
                return Err(MlError::ShapeMismatch {
                    what: "model output",
                    got: out.ncols(),
                    expected: y_size,
                }
                .into());
            }

            let start = i * self.batch_size;
            let end = start + chunk.len();
            y_pred.slice_mut(s![start..end, ..]).assign(&out);
            y.slice_mut(s![start..end, ..]).assign(&batch.y);
        }

        Ok((y_pred, y))
    }

    /// Per-example gradient embeddings for `indices`, one row each.
    pub fn embeddings<D: Dataset + ?Sized>(
        &mut self,
        data: &D,
        indices: &[usize],
    ) -> Result<Array2<f32>, SelectionError> {
        let (y_pred, y) = self.outputs(data, indices)?;
        let embeddings = self.loss.loss_prime(y_pred.view(), y.view());

        if embeddings.iter().any(|v| !v.is_finite()) {
            return Err(MlError::NonFinite {
                what: "gradient embeddings",
            }
            .into());
        }

        Ok(embeddings)
    }
}

/// Averages the embeddings of every range of rows.
pub fn batch_means(embeddings: &Array2<f32>, batches: &[std::ops::Range<usize>]) -> Array2<f32> {
    let mut means = Array2::zeros((batches.len(), embeddings.ncols()));

    for (mut mean, range) in means.axis_iter_mut(Axis(0)).zip(batches) {
        let rows = embeddings.slice(s![range.clone(), ..]);
        if let Some(m) = rows.mean_axis(Axis(0)) {
            mean.assign(&m);
        }
    }

    means
}

/// Averages all rows.
pub fn mean_row(rows: &Array2<f32>) -> Array1<f32> {
    rows.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(rows.ncols()))
}
