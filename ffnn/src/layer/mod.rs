pub use self::activation::Activation;
pub use self::linear::{Initializer, Linear, BIASES, WEIGHTS};
pub use self::parameters::Parameters;

use crate::error::Result;
use crate::linear_algebra::Tensor;

mod activation;
mod linear;
mod parameters;

/// One differentiable stage of a network.
///
/// `forward` remembers its input so that the following `backward` can compute gradients from
/// it. Calling `backward` before any `forward` is an error.
pub trait Layer: Send {
    fn name(&self) -> &'static str;

    /// Produces the outputs for a batch of inputs. Parameters are left untouched.
    fn forward(&mut self, inputs: &Tensor) -> Result<Tensor>;

    /// Takes the gradient of the loss with respect to this layer's outputs, stores the
    /// gradient with respect to every parameter, and returns the gradient with respect to the
    /// layer's inputs.
    fn backward(&mut self, output_gradients: &Tensor) -> Result<Tensor>;

    fn parameters(&self) -> &Parameters;

    fn parameters_mut(&mut self) -> &mut Parameters;
}
