use std::hash::{Hash, Hasher};

use ml_core::{Checkpoint, Model};
use ndarray::{Array2, ArrayView2};

use super::{ParameterLayout, layers::Layer};
use crate::{
    Result,
    error::{MlError, ensure_len},
    initialization::ParamGen,
};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// All trainable parameters live in one flat arena, each layer reading the slice its
/// `ParameterLayout` range points at. The gradient arena mirrors it one to one.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
    layout: ParameterLayout,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<_> = layers.into_iter().collect();
        let layout = ParameterLayout::from_sizes(layers.iter().map(Layer::size));
        let size = layout.total();

        Self {
            layers,
            layout,
            params: vec![0.; size],
            grad: vec![0.; size],
        }
    }

    /// Creates a new `Sequential` over the given parameters.
    ///
    /// # Returns
    /// An error if `params` doesn't hold exactly one value per parameter.
    pub fn with_params<I>(layers: I, params: Vec<f32>) -> Result<Self>
    where
        I: IntoIterator<Item = Layer>,
    {
        let mut model = Self::new(layers);
        model.layout.validate(params.len())?;
        model.params = params;
        Ok(model)
    }

    /// Overwrites every parameter with values drawn from `param_gen`.
    ///
    /// # Returns
    /// An error if the generator runs dry before covering the whole arena.
    pub fn initialize<G: ParamGen + ?Sized>(&mut self, param_gen: &mut G) -> Result<()> {
        let expected = self.params.len();
        let sample = param_gen.sample(expected).unwrap_or_default();
        ensure_len("initial parameters", sample.len(), expected)?;
        self.params = sample;
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    /// The width of the inputs this model takes, `None` if it has no layers.
    pub fn input_size(&self) -> Option<usize> {
        self.layers.first().map(|layer| layer.dim().0)
    }

    /// The width of the outputs this model produces, `None` if it has no layers.
    pub fn output_size(&self) -> Option<usize> {
        self.layers.last().map(|layer| layer.dim().1)
    }
}

impl Model for Sequential {
    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if self.layers.is_empty() {
            return Err(MlError::InvalidInput("sequential model has no layers"));
        }

        let mut a = x.to_owned();

        for (layer, range) in self.layers.iter_mut().zip(self.layout.ranges()) {
            a = layer.forward(&self.params[range.clone()], a.view())?;
        }

        Ok(a)
    }

    fn backward(&mut self, d: ArrayView2<f32>) -> Result<()> {
        let mut d = d.to_owned();

        for (layer, range) in self.layers.iter_mut().zip(self.layout.ranges()).rev() {
            d = layer.backward(
                &self.params[range.clone()],
                &mut self.grad[range.clone()],
                d.view(),
            )?;
        }

        Ok(())
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_and_grad(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.params, &self.grad)
    }
}

/// A private copy of a `Sequential`'s parameter arena.
///
/// Equality and hashing compare raw bit patterns, so two snapshots are equal only when every
/// parameter is bit-identical (`NaN`s included).
#[derive(Debug, Clone)]
pub struct ParamSnapshot {
    params: Box<[f32]>,
}

impl ParamSnapshot {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl PartialEq for ParamSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for ParamSnapshot {}

impl Hash for ParamSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.params.len().hash(state);
        for p in self.params.iter() {
            p.to_bits().hash(state);
        }
    }
}

impl Checkpoint for Sequential {
    type State = ParamSnapshot;

    fn snapshot(&self) -> Self::State {
        ParamSnapshot {
            params: self.params.clone().into_boxed_slice(),
        }
    }

    fn restore(&mut self, state: &Self::State) -> Result<()> {
        ensure_len("snapshot", state.params.len(), self.params.len())?;
        self.params.copy_from_slice(&state.params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{arch::activations::ActFn, initialization::ConstParamGen};

    fn model() -> Sequential {
        Sequential::new([
            Layer::dense((2, 3), Some(ActFn::tanh())),
            Layer::dense((3, 1), None),
        ])
    }

    #[test]
    fn layout_covers_every_layer() {
        let model = model();
        assert_eq!(model.num_params(), 9 + 4);
        assert_eq!(model.layout().range(1), Some(9..13));
        assert_eq!(model.input_size(), Some(2));
        assert_eq!(model.output_size(), Some(1));
    }

    #[test]
    fn snapshot_is_independent_of_the_model() {
        let mut model = model();
        model.initialize(&mut ConstParamGen::new(0.5, 13)).unwrap();

        let before = model.snapshot();
        model.params_and_grad().0[0] = 7.;
        assert_ne!(model.snapshot(), before);

        model.restore(&before).unwrap();
        assert_eq!(model.snapshot(), before);
    }

    #[test]
    fn restore_rejects_foreign_snapshot() {
        let other = Sequential::new([Layer::dense((1, 1), None)]);
        let mut model = model();

        assert!(matches!(
            model.restore(&other.snapshot()),
            Err(MlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn initialize_requires_a_full_arena() {
        let mut model = model();
        let res = model.initialize(&mut ConstParamGen::new(1., 5));
        assert!(res.is_err());
    }

    #[test]
    fn forward_chains_layers() {
        let mut model = Sequential::with_params(
            [Layer::dense((1, 1), None), Layer::dense((1, 1), None)],
            vec![2., 1., 3., -1.],
        )
        .unwrap();

        let out = model.forward(array![[1.], [2.]].view()).unwrap();
        // ((x * 2 + 1) * 3) - 1
        assert_eq!(out, array![[8.], [14.]]);
    }
}
