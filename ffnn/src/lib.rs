pub use error::{Error, Result};

pub mod activation;
pub mod data;
pub mod gradient_descent;
pub mod layer;
pub mod linear_algebra;
pub mod loss;
pub mod network;
pub mod train;

mod error;
