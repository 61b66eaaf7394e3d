use super::*;
use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

impl OrtInfer {
    /// Applies threading, optimisation and execution provider settings.
    pub(super) fn apply_ort_config(
        builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        let mut builder = builder.with_log_level(LogLevel::Error)?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(level) = cfg.optimization_level {
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
                OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
                OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
                OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        if let Some(enable) = cfg.enable_mem_pattern {
            builder = builder.with_memory_pattern(enable)?;
        }
        if let Some(eps) = &cfg.execution_providers {
            let providers = Self::build_execution_providers(eps)?;
            if !providers.is_empty() {
                builder = builder.with_execution_providers(providers)?;
            }
        }
        Ok(builder)
    }

    /// Builds execution providers from configuration.
    ///
    /// Accelerator providers are registered with `error_on_failure`, so a
    /// model that cannot be placed on the requested device fails to load
    /// instead of silently falling back to the CPU.
    fn build_execution_providers(
        eps: &[OrtExecutionProvider],
    ) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
        let mut providers = Vec::with_capacity(eps.len());
        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers
                        .push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA {
                    device_id,
                    gpu_mem_limit,
                } => {
                    let mut cuda = ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda = cuda.with_device_id(*id);
                    }
                    if let Some(limit) = gpu_mem_limit {
                        cuda = cuda.with_memory_limit(*limit);
                    }
                    providers.push(cuda.build().error_on_failure());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    return Err(ort::Error::new(
                        "CUDA execution provider requested but cuda feature is not enabled",
                    ));
                }
            }
        }
        Ok(providers)
    }
}
