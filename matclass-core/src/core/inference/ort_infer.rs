//! Pooled ONNX Runtime inference engine.

use crate::core::batch::{Tensor2D, TensorD};
use crate::core::errors::{MaterialError, MaterialResult};
use ort::session::Session;
use ort::value::ValueType;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_config.rs"]
mod ort_infer_config;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;

pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: AtomicUsize,
    pub(super) input_name: String,
    pub(super) output_name: Option<String>,
    pub(super) model_path: PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }

    /// Declared shape of the output tensor this engine extracts.
    pub fn output_shape(&self) -> Option<Vec<i64>> {
        let session = self.sessions.first()?.lock().ok()?;
        let output = match &self.output_name {
            Some(name) => session.outputs().iter().find(|o| o.name() == name)?,
            None => session.outputs().first()?,
        };
        match output.dtype() {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Class count implied by the declared output shape, if static.
    ///
    /// The output is `[batch, ..., classes]`; the trailing dimensions after
    /// the batch axis are multiplied together.
    pub fn declared_classes(&self) -> Option<usize> {
        let shape = self.output_shape()?;
        let trailing = shape.get(1..)?;
        if trailing.is_empty() || trailing.iter().any(|&d| d <= 0) {
            return None;
        }
        Some(trailing.iter().product::<i64>() as usize)
    }

    /// Runs the model on `x` and returns a `[batch, classes]` matrix.
    ///
    /// `batch_index` only tags errors with the pixel batch being classified.
    pub fn infer(&self, x: &TensorD, batch_index: usize) -> MaterialResult<Tensor2D> {
        let batch_size = x.shape().first().copied().unwrap_or(0);
        if batch_size == 0 {
            return Err(MaterialError::invalid_input(format!(
                "model '{}' received an empty input tensor {:?}",
                self.model_name,
                x.shape()
            )));
        }
        self.run_inference_with_processor(x, batch_index, |output_shape, output_data| {
            self.to_matrix(batch_size, x.shape(), batch_index, output_shape, output_data)
        })
    }
}
