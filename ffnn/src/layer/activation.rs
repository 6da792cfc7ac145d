use tracing::trace;

use crate::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::linear_algebra::Tensor;

use super::{Layer, Parameters};

/// Applies an [`ActivationFunction`] elementwise. Has no parameters.
#[derive(Clone, Debug)]
pub struct Activation {
    function: ActivationFunction,
    parameters: Parameters,
    inputs: Option<Tensor>,
}

impl Activation {
    pub fn new(function: ActivationFunction) -> Self {
        Self {
            function,
            parameters: Parameters::new(),
            inputs: None,
        }
    }

    pub fn tanh() -> Self {
        Self::new(ActivationFunction::Tanh)
    }

    pub fn sigmoid() -> Self {
        Self::new(ActivationFunction::Sigmoid)
    }

    pub fn relu() -> Self {
        Self::new(ActivationFunction::Relu)
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }
}

impl Layer for Activation {
    fn name(&self) -> &'static str {
        self.function.name()
    }

    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor> {
        let function = self.function;
        let outputs = inputs.map(|x| function.apply(x));

        trace!(function = function.name(), shape = %inputs.shape(), "Activation forward");

        self.inputs = Some(inputs.clone());
        Ok(outputs)
    }

    // For y = f(x), dL/dx = f'(x) * dL/dy.
    fn backward(&mut self, output_gradients: &Tensor) -> Result<Tensor> {
        let function = self.function;
        let inputs = self
            .inputs
            .as_ref()
            .ok_or(Error::BackwardBeforeForward {
                layer: function.name(),
            })?;

        trace!(
            function = function.name(),
            shape = %output_gradients.shape(),
            "Activation backward"
        );

        inputs.zip_map(output_gradients, |x, gradient| {
            function.derivative(x) * gradient
        })
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
    use rand_distr::StandardNormal;

    use super::*;

    use crate::layer::testing::{assert_close, numeric_gradient};
    use crate::linear_algebra::Shape;

    #[test]
    fn sigmoid_example() {
        let mut sigmoid = Activation::sigmoid();
        assert_eq!(sigmoid.forward(&[0.0].into()).unwrap(), Tensor::from([0.5]));
        assert_eq!(sigmoid.backward(&[1.0].into()).unwrap(), Tensor::from([0.25]));
    }

    #[test]
    fn tanh_example() {
        let mut tanh = Activation::tanh();
        assert_eq!(tanh.forward(&[0.0].into()).unwrap(), Tensor::from([0.0]));
        assert_eq!(tanh.backward(&[1.0].into()).unwrap(), Tensor::from([1.0]));
    }

    #[test]
    fn backward_is_derivative_times_gradient() {
        let mut rng = StdRng::seed_from_u64(5);

        for mut layer in [Activation::tanh(), Activation::sigmoid(), Activation::relu()] {
            let function = layer.function();
            let inputs = Tensor::random((3, 4), &StandardNormal, &mut rng);
            let gradients = Tensor::random((3, 4), &StandardNormal, &mut rng);

            let outputs = layer.forward(&inputs).unwrap();
            assert_eq!(outputs, inputs.map(|x| function.apply(x)));

            let input_gradients = layer.backward(&gradients).unwrap();
            assert_eq!(input_gradients.shape(), inputs.shape());
            assert_eq!(
                input_gradients,
                inputs.map(|x| function.derivative(x)) * &gradients
            );
        }
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(9);
        let inputs = Tensor::random((2, 5), &StandardNormal, &mut rng);
        let r = Tensor::random((2, 5), &StandardNormal, &mut rng);

        for mut layer in [Activation::tanh(), Activation::sigmoid()] {
            let function = layer.function();
            let numeric = numeric_gradient(&inputs, |x| (x.map(|v| function.apply(v)) * &r).sum());

            layer.forward(&inputs).unwrap();
            let input_gradients = layer.backward(&r).unwrap();
            assert_close(&input_gradients, &numeric, 1e-6);
        }
    }

    #[test]
    fn works_for_any_shape() {
        let mut layer = Activation::tanh();
        let inputs = Tensor::zeros([2, 3, 4]);
        assert_eq!(layer.forward(&inputs).unwrap().shape(), &Shape::from([2, 3, 4]));
        assert_eq!(
            layer.backward(&Tensor::ones([2, 3, 4])).unwrap(),
            Tensor::ones([2, 3, 4])
        );
    }

    #[test]
    fn stable_at_extremes() {
        let mut sigmoid = Activation::sigmoid();
        let outputs = sigmoid.forward(&[-1000.0, 1000.0].into()).unwrap();
        assert_eq!(outputs, Tensor::from([0.0, 1.0]));
        let gradients = sigmoid.backward(&[1.0, 1.0].into()).unwrap();
        assert!(gradients.values().all(|x| x.is_finite()));
    }

    #[test]
    fn no_parameters() {
        let mut layer = Activation::sigmoid();
        layer.forward(&[1.0, 2.0].into()).unwrap();
        layer.backward(&[1.0, 1.0].into()).unwrap();
        assert!(layer.parameters().is_empty());
        assert_eq!(layer.parameters().gradients().count(), 0);
    }

    #[test]
    fn errors() {
        let mut layer = Activation::tanh();
        assert!(matches!(
            layer.backward(&[1.0].into()),
            Err(Error::BackwardBeforeForward { layer: "tanh" })
        ));

        layer.forward(&[[1.0, 2.0]].into()).unwrap();
        assert!(matches!(
            layer.backward(&[1.0, 2.0].into()),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
