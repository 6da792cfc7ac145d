use rand::distributions::Uniform;
use rand::Rng;
use rand_distr::{Normal, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::linear_algebra::{Shape, Tensor, Value};

use super::{Layer, Parameters};

pub const WEIGHTS: &str = "w";
pub const BIASES: &str = "b";

/// How a [`Linear`] layer's parameters are drawn.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Weights and biases from N(0, 1).
    #[default]
    StandardNormal,
    /// He initialization of the weights, for layers feeding a ReLU. Biases start at zero.
    He,
    /// Glorot (Xavier) uniform initialization of the weights. Biases start at zero.
    Glorot,
    Zeros,
}

impl Initializer {
    fn parameters<R>(
        self,
        input_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Result<(Tensor, Tensor)>
    where
        R: Rng + ?Sized,
    {
        let weight_shape = (input_size, output_size);

        let parameters = match self {
            Self::StandardNormal => (
                Tensor::random(weight_shape, &StandardNormal, rng),
                Tensor::random(output_size, &StandardNormal, rng),
            ),
            Self::He => {
                let std_dev = (2.0 / input_size as Value).sqrt();
                let normal_distribution = Normal::new(0.0, std_dev)
                    .map_err(|err| Error::InvalidConfig(err.to_string()))?;
                (
                    Tensor::random(weight_shape, &normal_distribution, rng),
                    Tensor::zeros(output_size),
                )
            }
            Self::Glorot => {
                let range = 6.0f64.sqrt() / (input_size as Value + output_size as Value).sqrt();
                let uniform_distribution = Uniform::new(-range, range);
                (
                    Tensor::random(weight_shape, &uniform_distribution, rng),
                    Tensor::zeros(output_size),
                )
            }
            Self::Zeros => (Tensor::zeros(weight_shape), Tensor::zeros(output_size)),
        };

        Ok(parameters)
    }
}

/// A fully connected layer: `outputs = inputs @ w + b`.
///
/// Inputs are `(batch, input_size)`, outputs are `(batch, output_size)`. `w` is
/// `(input_size, output_size)` and `b`, broadcast over the batch, is `(output_size,)`.
#[derive(Clone, Debug)]
pub struct Linear {
    input_size: usize,
    output_size: usize,
    parameters: Parameters,
    inputs: Option<Tensor>,
}

impl Linear {
    /// Creates a layer with weights and biases drawn from a standard normal distribution.
    pub fn new<R>(input_size: usize, output_size: usize, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        Self::with_initializer(input_size, output_size, Initializer::StandardNormal, rng)
    }

    pub fn with_initializer<R>(
        input_size: usize,
        output_size: usize,
        initializer: Initializer,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if input_size == 0 || output_size == 0 {
            return Err(Error::InvalidSize {
                input_size,
                output_size,
            });
        }

        let (weights, biases) = initializer.parameters(input_size, output_size, rng)?;
        Self::from_parameters(weights, biases)
    }

    /// Creates a layer from explicit parameters. The sizes are taken from the shape of
    /// `weights`, and `biases` must match its second dimension.
    pub fn from_parameters(weights: Tensor, biases: Tensor) -> Result<Self> {
        weights.require_rank(2)?;
        let (input_size, output_size) = (weights.shape()[0], weights.shape()[1]);
        if input_size == 0 || output_size == 0 {
            return Err(Error::InvalidSize {
                input_size,
                output_size,
            });
        }
        biases.require_shape(&Shape::from(output_size))?;

        let mut parameters = Parameters::new();
        parameters.insert(WEIGHTS, weights);
        parameters.insert(BIASES, biases);

        Ok(Self {
            input_size,
            output_size,
            parameters,
            inputs: None,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn weights(&self) -> Result<&Tensor> {
        let weights = self.parameters.require(WEIGHTS)?;
        weights.require_shape(&Shape::from((self.input_size, self.output_size)))?;
        Ok(weights)
    }

    pub fn biases(&self) -> Result<&Tensor> {
        let biases = self.parameters.require(BIASES)?;
        biases.require_shape(&Shape::from(self.output_size))?;
        Ok(biases)
    }
}

impl Layer for Linear {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        inputs.require_rank(2)?;
        let batch_size = inputs.shape()[0];
        inputs.require_shape(&Shape::from((batch_size, self.input_size)))?;

        let outputs = inputs.matmul(self.weights()?)? + self.biases()?;

        trace!(inputs = %inputs.shape(), outputs = %outputs.shape(), "Linear forward");

        self.inputs = Some(inputs.clone());
        Ok(outputs)
    }

    // For y = x @ w + b:
    //   dL/db = column sums of dL/dy, since every row shares b
    //   dL/dw = x.T @ dL/dy
    //   dL/dx = dL/dy @ w.T
    fn backward(&mut self, output_gradients: &Tensor) -> Result<Tensor> {
        let inputs = self
            .inputs
            .as_ref()
            .ok_or(Error::BackwardBeforeForward { layer: "linear" })?;

        let batch_size = inputs.shape()[0];
        output_gradients.require_shape(&Shape::from((batch_size, self.output_size)))?;

        let bias_gradients = output_gradients.sum_rows()?;
        let weight_gradients = inputs.transpose()?.matmul(output_gradients)?;
        let input_gradients = output_gradients.matmul(&self.weights()?.transpose()?)?;

        trace!(gradients = %output_gradients.shape(), "Linear backward");

        self.parameters.set_gradient(WEIGHTS, weight_gradients)?;
        self.parameters.set_gradient(BIASES, bias_gradients)?;

        Ok(input_gradients)
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    use crate::layer::testing::{assert_close, numeric_gradient};

    fn example_layer() -> Linear {
        Linear::from_parameters([[1.0], [2.0]].into(), [0.0].into()).unwrap()
    }

    #[test]
    fn forward_example() {
        let mut layer = example_layer();
        let outputs = layer.forward(&[[1.0, 1.0]].into()).unwrap();
        assert_eq!(outputs, Tensor::from([[3.0]]));
    }

    #[test]
    fn backward_example() {
        let mut layer = example_layer();
        layer.forward(&[[1.0, 1.0]].into()).unwrap();
        let input_gradients = layer.backward(&[[1.0]].into()).unwrap();

        let parameters = layer.parameters();
        assert_eq!(parameters.gradient(BIASES), Some(&Tensor::from([1.0])));
        assert_eq!(parameters.gradient(WEIGHTS), Some(&Tensor::from([[1.0], [1.0]])));
        assert_eq!(input_gradients, Tensor::from([[1.0, 2.0]]));
    }

    #[test]
    fn forward_is_affine() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut layer = Linear::new(4, 3, &mut rng).unwrap();
        let inputs = Tensor::random((5, 4), &StandardNormal, &mut rng);

        let outputs = layer.forward(&inputs).unwrap();
        assert_eq!(outputs.shape(), &Shape::from((5, 3)));

        let expected = inputs.matmul(layer.weights().unwrap()).unwrap() + layer.biases().unwrap();
        assert_close(&outputs, &expected, 1e-12);

        // Same input, same parameters, same output.
        assert_eq!(layer.forward(&inputs).unwrap(), outputs);
    }

    #[test]
    fn passes_leave_parameters_unchanged() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut layer = Linear::new(3, 2, &mut rng).unwrap();
        let inputs = Tensor::random((4, 3), &StandardNormal, &mut rng);
        let gradients = Tensor::random((4, 2), &StandardNormal, &mut rng);

        let before = layer.parameters().clone();
        for _ in 0..2 {
            layer.forward(&inputs).unwrap();
            layer.backward(&gradients).unwrap();
        }

        let values = |parameters: &Parameters| {
            parameters
                .values()
                .map(|(name, value)| (name.to_owned(), value.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(values(layer.parameters()), values(&before));
        assert_eq!(values(&before).len(), 2);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(42);

        let weights = Tensor::random((3, 2), &StandardNormal, &mut rng);
        let biases = Tensor::random(2, &StandardNormal, &mut rng);
        let inputs = Tensor::random((4, 3), &StandardNormal, &mut rng);
        // The loss is sum(outputs * r), so dL/doutputs = r.
        let r = Tensor::random((4, 2), &StandardNormal, &mut rng);

        let loss = |weights: &Tensor, biases: &Tensor, inputs: &Tensor| {
            let mut layer = Linear::from_parameters(weights.clone(), biases.clone()).unwrap();
            (layer.forward(inputs).unwrap() * &r).sum()
        };

        let mut layer = Linear::from_parameters(weights.clone(), biases.clone()).unwrap();
        layer.forward(&inputs).unwrap();
        let input_gradients = layer.backward(&r).unwrap();

        let numeric_weights = numeric_gradient(&weights, |w| loss(w, &biases, &inputs));
        let numeric_biases = numeric_gradient(&biases, |b| loss(&weights, b, &inputs));
        let numeric_inputs = numeric_gradient(&inputs, |x| loss(&weights, &biases, x));

        let parameters = layer.parameters();
        assert_close(parameters.gradient(WEIGHTS).unwrap(), &numeric_weights, 1e-6);
        assert_close(parameters.gradient(BIASES).unwrap(), &numeric_biases, 1e-6);
        assert_close(&input_gradients, &numeric_inputs, 1e-6);
    }

    #[test]
    fn backward_matches_input_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Linear::new(6, 2, &mut rng).unwrap();

        for batch_size in [1, 3, 8] {
            let inputs = Tensor::random((batch_size, 6), &StandardNormal, &mut rng);
            layer.forward(&inputs).unwrap();
            let input_gradients = layer.backward(&Tensor::ones((batch_size, 2))).unwrap();
            assert_eq!(input_gradients.shape(), inputs.shape());
        }
    }

    #[test]
    fn gradients_are_overwritten() {
        let mut layer = example_layer();
        let inputs: Tensor = [[1.0, 1.0]].into();

        layer.forward(&inputs).unwrap();
        layer.backward(&[[1.0]].into()).unwrap();
        layer.forward(&inputs).unwrap();
        layer.backward(&[[1.0]].into()).unwrap();

        assert_eq!(layer.parameters().gradient(BIASES), Some(&Tensor::from([1.0])));
    }

    #[test]
    fn backward_before_forward() {
        let mut layer = example_layer();
        assert!(matches!(
            layer.backward(&[[1.0]].into()),
            Err(Error::BackwardBeforeForward { layer: "linear" })
        ));
    }

    #[test]
    fn shape_mismatches() {
        let mut layer = example_layer();

        assert!(matches!(
            layer.forward(&[[1.0, 1.0, 1.0]].into()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            layer.forward(&[1.0, 1.0].into()),
            Err(Error::RankMismatch {
                expected: 2,
                got: 1
            })
        ));

        layer.forward(&[[1.0, 1.0]].into()).unwrap();
        assert!(matches!(
            layer.backward(&[[1.0, 1.0]].into()),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            layer.backward(&[[1.0], [1.0]].into()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn construction() {
        let mut rng = StdRng::seed_from_u64(0);

        for initializer in [
            Initializer::StandardNormal,
            Initializer::He,
            Initializer::Glorot,
            Initializer::Zeros,
        ] {
            let layer = Linear::with_initializer(5, 3, initializer, &mut rng).unwrap();
            assert_eq!((layer.input_size(), layer.output_size()), (5, 3));
            assert_eq!(layer.weights().unwrap().shape(), &Shape::from((5, 3)));
            assert_eq!(layer.biases().unwrap().shape(), &Shape::from(3));
            assert_eq!(layer.parameters().names().collect::<Vec<_>>(), vec!["b", "w"]);
        }

        assert!(matches!(
            Linear::new(0, 3, &mut rng),
            Err(Error::InvalidSize { .. })
        ));
        assert!(matches!(
            Linear::from_parameters(Tensor::zeros((2, 3)), Tensor::zeros(2)),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn seeded_construction_is_reproducible() {
        let a = Linear::new(3, 2, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = Linear::new(3, 2, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a.weights().unwrap(), b.weights().unwrap());
        assert_eq!(a.biases().unwrap(), b.biases().unwrap());
    }
}
