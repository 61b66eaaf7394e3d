//! ONNX Runtime inference.
//!
//! [`OrtInfer`] owns a pool of sessions for one model file and turns a
//! feature tensor into a `[batch, classes]` output matrix. Sessions are handed
//! out round-robin, so concurrent batch workers contend on at most one lock
//! each.

mod ort_infer;

pub use ort_infer::OrtInfer;
