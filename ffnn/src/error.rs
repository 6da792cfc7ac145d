use crate::linear_algebra::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the library reports. All of them are caller bugs: wrong shapes, wrong call
/// order, or invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },

    #[error("rank mismatch: expected rank {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("matmul shape mismatch: {left} @ {right}, inner dimensions must match")]
    MatmulShapeMismatch { left: Shape, right: Shape },

    #[error("element count mismatch: shape {shape} requires {expected} values, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    #[error("shape {shape} holds more values than can be addressed")]
    ShapeOverflow { shape: Shape },

    #[error("backward called on {layer} layer before forward")]
    BackwardBeforeForward { layer: &'static str },

    #[error("invalid layer size: {input_size} inputs, {output_size} outputs")]
    InvalidSize {
        input_size: usize,
        output_size: usize,
    },

    #[error("no parameter named {0:?}")]
    UnknownParameter(String),

    #[error("layer is missing its {0:?} parameter")]
    MissingParameter(String),

    #[error("inputs have {inputs} rows but targets have {targets}")]
    BatchSizeMismatch { inputs: usize, targets: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
