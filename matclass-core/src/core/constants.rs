//! Constants shared across the classification pipeline.

/// Default number of pixels classified per inference call.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Tolerance used when checking that a probability vector sums to one.
pub const PROBABILITY_TOLERANCE: f32 = 1e-5;

/// Label written for pixels that no source image covers.
pub const NODATA_LABEL: u8 = u8::MAX;

/// Largest class count representable in a `u8` label map next to [`NODATA_LABEL`].
pub const MAX_CLASSES: usize = NODATA_LABEL as usize;

/// Default session pool size for ONNX Runtime inference.
pub const DEFAULT_SESSION_POOL_SIZE: usize = 1;

/// Default ONNX input tensor name.
pub const DEFAULT_INPUT_NAME: &str = "input";

/// Upper bound on a single batch tensor, in elements.
pub const MAX_TENSOR_SIZE: usize = 1 << 28;
