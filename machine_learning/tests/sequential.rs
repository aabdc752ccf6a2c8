use std::{cell::RefCell, rc::Rc};

use machine_learning::{
    arch::{
        Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{CrossEntropy, Mse},
    },
    dataset,
    initialization::RandParamGen,
    optimization::GradientDescent,
};
use ml_core::{Dataset, LossFn, Model, Optimizer};
use ndarray::{Array2, array};
use rand::{SeedableRng, rngs::StdRng};

fn seeded_model(layers: Vec<Layer>, seed: u64) -> Sequential {
    let mut model = Sequential::new(layers);
    let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(seed)));
    let mut param_gen = RandParamGen::normal(rng, model.num_params(), 0., 0.5).unwrap();
    model.initialize(&mut param_gen).unwrap();
    model
}

fn mean_loss<L: LossFn>(model: &mut Sequential, loss: &L, x: &Array2<f32>, y: &Array2<f32>) -> f32 {
    let y_pred = model.forward(x.view()).unwrap();
    loss.losses(y_pred.view(), y.view()).mean().unwrap()
}

fn check_gradient<L: LossFn>(layers: Vec<Layer>, loss: L, x: Array2<f32>, y: Array2<f32>) {
    const H: f32 = 1e-2;

    let mut model = seeded_model(layers, 3);
    let n = x.nrows() as f32;

    model.zero_grad();
    let y_pred = model.forward(x.view()).unwrap();
    let d = loss.loss_prime(y_pred.view(), y.view()) / n;
    model.backward(d.view()).unwrap();
    let analytic = model.params_and_grad().1.to_vec();

    for i in 0..model.num_params() {
        let original = model.params()[i];

        model.params_and_grad().0[i] = original + H;
        let plus = mean_loss(&mut model, &loss, &x, &y);
        model.params_and_grad().0[i] = original - H;
        let minus = mean_loss(&mut model, &loss, &x, &y);
        model.params_and_grad().0[i] = original;

        let numeric = (plus - minus) / (2. * H);
        let tolerance = 1e-2 * numeric.abs().max(1.);
        assert!(
            (numeric - analytic[i]).abs() < tolerance,
            "param {i}: numeric {numeric} vs analytic {}",
            analytic[i]
        );
    }
}

#[test]
fn dense_gradients_match_finite_differences_with_mse() {
    let layers = vec![
        Layer::dense((3, 4), Some(ActFn::sigmoid(1.))),
        Layer::dense((4, 2), None),
    ];
    let x = array![[0.1, -0.4, 0.8], [1.0, 0.2, -0.3], [-0.5, 0.5, 0.0]];
    let y = array![[1.0, 0.0], [0.5, -0.5], [0.0, 2.0]];

    check_gradient(layers, Mse, x, y);
}

#[test]
fn dense_gradients_match_finite_differences_with_cross_entropy() {
    let layers = vec![
        Layer::dense((2, 5), Some(ActFn::tanh())),
        Layer::dense((5, 3), None),
    ];
    let x = array![[0.3, -1.2], [0.7, 0.1], [-0.2, 0.9], [1.1, 1.0]];
    let y = array![[1., 0., 0.], [0., 1., 0.], [0., 0., 1.], [0., 1., 0.]];

    check_gradient(layers, CrossEntropy, x, y);
}

#[test]
fn gradient_descent_fits_separable_blobs() {
    let mut rng = StdRng::seed_from_u64(11);
    let data = dataset::blobs(120, 2, 3, 0.5, &mut rng).unwrap();
    let all: Vec<_> = (0..data.len()).collect();
    let batch = data.gather(&all).unwrap();

    let mut model = seeded_model(
        vec![
            Layer::dense((2, 8), Some(ActFn::relu())),
            Layer::dense((8, 3), None),
        ],
        5,
    );
    let mut optimizer = GradientDescent::new(0.01);
    let loss = CrossEntropy;

    let before = mean_loss(&mut model, &loss, &batch.x, &batch.y);

    for _ in 0..300 {
        model.zero_grad();
        let y_pred = model.forward(batch.x.view()).unwrap();
        let d = loss.loss_prime(y_pred.view(), batch.y.view()) / batch.len() as f32;
        model.backward(d.view()).unwrap();

        let (params, grad) = model.params_and_grad();
        optimizer.update_params(grad, params).unwrap();
    }

    let after = mean_loss(&mut model, &loss, &batch.x, &batch.y);
    assert!(after < before * 0.5, "loss went from {before} to {after}");
}
