use ndarray::prelude::*;

use crate::{
    Result,
    arch::activations::ActFn,
    error::{MlError, ensure_len},
};

/// A fully connected layer computing `act_fn(x · W + b)`.
///
/// The layer owns no parameters. On every call it views the slice of the model's flat arena it
/// is handed: the `(inputs, outputs)` weight matrix in row-major order followed by the biases.
///
/// Optimizations:
///   1. Find a way to not copy `x` in each `Dense::forward` call.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Option<Array2<f32>>,
    z: Option<Array2<f32>>,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - An optional activation function, `None` leaves the layer linear.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: None,
            z: None,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Makes a forward pass through the layer, remembering its input and pre-activation.
    ///
    /// # Arguments
    /// * `params` - This layer's parameter slice.
    /// * `x` - The input, one row per example.
    ///
    /// # Returns
    /// The activations or an error if the shapes don't agree.
    pub fn forward(&mut self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        ensure_len("dense input", x.ncols(), self.dim.0)?;
        let (w, b) = self.view_params(params)?;

        let mut z = x.dot(&w);
        z += &b;

        let a = match &self.act_fn {
            Some(act_fn) => z.mapv(|v| act_fn.f(v)),
            None => z.clone(),
        };

        self.x = Some(x.to_owned());
        self.z = Some(z);
        Ok(a)
    }

    /// Backpropagates `d`, the derivative with respect to this layer's output, **adding** the
    /// resulting weight and bias derivatives into `grad`.
    ///
    /// # Returns
    /// The derivative with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayView2<f32>,
    ) -> Result<Array2<f32>> {
        let (Some(x), Some(z)) = (&self.x, &self.z) else {
            return Err(MlError::InvalidInput("dense backward called before forward"));
        };

        ensure_len("dense delta rows", d.nrows(), z.nrows())?;
        ensure_len("dense delta cols", d.ncols(), self.dim.1)?;

        let mut d = d.to_owned();
        if let Some(act_fn) = &self.act_fn {
            d.zip_mut_with(z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw += &x.t().dot(&d);
        db += &d.sum_axis(Axis(0));

        let (w, _) = self.view_params(params)?;
        Ok(d.dot(&w.t()))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        ensure_len("dense gradient", grad.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)
            .map_err(|_| MlError::InvalidInput("dense gradient shape"))?;
        let db = ArrayViewMut1::from(db_raw);
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        ensure_len("dense params", params.len(), self.size)?;

        let w_size = self.size - self.dim.1;
        let (w_raw, b_raw) = params.split_at(w_size);
        let weights = ArrayView2::from_shape(self.dim, w_raw)
            .map_err(|_| MlError::InvalidInput("dense params shape"))?;
        let biases = ArrayView1::from(b_raw);
        Ok((weights, biases))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_affine_without_activation() {
        // w = [[1, 2], [3, 4]], b = [0.5, -1]
        let params = [1., 2., 3., 4., 0.5, -1.];
        let mut layer = Dense::new((2, 2), None);

        let x = array![[1., 1.], [0., 2.]];
        let a = layer.forward(&params, x.view()).unwrap();

        assert_eq!(a, array![[4.5, 5.], [6.5, 7.]]);
    }

    #[test]
    fn backward_accumulates() {
        let params = [0.1, -0.2, 0.3];
        let mut layer = Dense::new((2, 1), Some(ActFn::tanh()));
        let x = array![[1., 2.]];

        let mut grad = [0.; 3];
        layer.forward(&params, x.view()).unwrap();
        layer
            .backward(&params, &mut grad, array![[1.]].view())
            .unwrap();
        let once = grad;

        layer
            .backward(&params, &mut grad, array![[1.]].view())
            .unwrap();

        for (twice, once) in grad.iter().zip(once) {
            assert!((twice - 2. * once).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_wrong_input_width() {
        let params = [0.; 6];
        let mut layer = Dense::new((2, 2), None);
        let x = array![[1., 2., 3.]];

        assert!(matches!(
            layer.forward(&params, x.view()),
            Err(MlError::ShapeMismatch { got: 3, expected: 2, .. })
        ));
    }

    #[test]
    fn backward_before_forward_fails() {
        let params = [0.; 3];
        let mut grad = [0.; 3];
        let mut layer = Dense::new((2, 1), None);

        assert!(
            layer
                .backward(&params, &mut grad, array![[1.]].view())
                .is_err()
        );
    }
}
