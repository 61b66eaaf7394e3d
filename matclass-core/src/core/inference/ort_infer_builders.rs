use super::*;
use crate::core::config::ClassifierConfig;

impl OrtInfer {
    /// Creates an engine from a classifier configuration, applying its ORT
    /// session settings and building a session pool for concurrent batches.
    pub fn from_config(config: &ClassifierConfig) -> MaterialResult<Self> {
        let path = config.model_path.as_path();
        if !path.is_file() {
            return Err(MaterialError::model_load_error(
                path,
                "model file does not exist",
                Some("pass the path of an ONNX model with --model-path"),
                None::<std::io::Error>,
            ));
        }

        let session_config = config.effective_session_config();
        let pool_size = config.session_pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Self::apply_ort_config(Session::builder()?, &session_config)
                .map_err(|e| {
                    MaterialError::model_load_error(
                        path,
                        "failed to configure execution providers",
                        Some("build with the `cuda` feature or run without --cuda"),
                        Some(e),
                    )
                })?;
            let session = builder.commit_from_file(path).map_err(|e| {
                MaterialError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check device/EP configuration and model file"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        Ok(OrtInfer {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name: config.input_name().to_string(),
            output_name: config.output_name.clone(),
            model_path: path.to_path_buf(),
            model_name: config.resolved_model_name(),
        })
    }
}
