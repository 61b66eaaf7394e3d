use super::*;
use crate::core::errors::SimpleError;
use ndarray::ArrayView2;
use ort::value::TensorRef;
use std::sync::atomic::Ordering;

impl OrtInfer {
    /// Returns the configured or discovered output tensor name.
    fn get_output_name(&self) -> MaterialResult<String> {
        if let Some(ref name) = self.output_name {
            return Ok(name.clone());
        }
        let session = self.sessions[0]
            .lock()
            .map_err(|_| MaterialError::invalid_input("Failed to acquire session lock"))?;
        session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| {
                MaterialError::invalid_input(
                    "No outputs available in session - model may be invalid or corrupted",
                )
            })
    }

    pub(super) fn run_inference_with_processor<T>(
        &self,
        x: &TensorD,
        batch_index: usize,
        processor: impl FnOnce(&[i64], &[f32]) -> MaterialResult<T>,
    ) -> MaterialResult<T> {
        let input_shape = x.shape().to_vec();

        let output_name = self.get_output_name().map_err(|e| {
            MaterialError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to get output name for model at '{}'",
                    self.model_path.display()
                ),
                e,
            )
        })?;

        let dims: Vec<i64> = input_shape.iter().map(|&d| d as i64).collect();
        let contiguous = x.as_standard_layout();
        let data = contiguous.as_slice().ok_or_else(|| {
            MaterialError::invalid_input(format!(
                "input tensor {input_shape:?} is not contiguous in memory"
            ))
        })?;
        let input_tensor = TensorRef::from_array_view((dims, data)).map_err(|e| {
            MaterialError::model_inference_error(
                &self.model_name,
                "tensor_conversion",
                batch_index,
                &input_shape,
                &format!("Failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            MaterialError::inference_error(
                &self.model_name,
                &format!(
                    "Failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("Session lock acquisition failed"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            MaterialError::model_inference_error(
                &self.model_name,
                "forward_pass",
                batch_index,
                &input_shape,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    self.input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                MaterialError::model_inference_error(
                    &self.model_name,
                    "output_extraction",
                    batch_index,
                    &input_shape,
                    &format!("Failed to extract output tensor '{output_name}' as f32"),
                    e,
                )
            })?;

        processor(output_shape, output_data)
    }

    /// Flattens a `[batch, ...]` output into `[batch, classes]`.
    pub(super) fn to_matrix(
        &self,
        batch_size: usize,
        input_shape: &[usize],
        batch_index: usize,
        output_shape: &[i64],
        output_data: &[f32],
    ) -> MaterialResult<Tensor2D> {
        let leading = output_shape.first().copied().unwrap_or(0);
        if output_shape.len() < 2 || leading as usize != batch_size {
            return Err(MaterialError::model_inference_error(
                &self.model_name,
                "output_validation",
                batch_index,
                input_shape,
                &format!(
                    "expected a [{batch_size}, classes] output, got shape {output_shape:?}"
                ),
                SimpleError::new("Invalid output tensor dimensions"),
            ));
        }
        let num_classes = output_data.len() / batch_size;
        if num_classes == 0 || num_classes * batch_size != output_data.len() {
            return Err(MaterialError::model_inference_error(
                &self.model_name,
                "output_data_validation",
                batch_index,
                input_shape,
                &format!(
                    "output holds {} values, not a multiple of batch size {batch_size}",
                    output_data.len()
                ),
                SimpleError::new("Output tensor data size mismatch"),
            ));
        }
        let view = ArrayView2::from_shape((batch_size, num_classes), output_data)?;
        Ok(view.to_owned())
    }
}
