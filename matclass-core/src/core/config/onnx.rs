//! ONNX Runtime session configuration.

use serde::{Deserialize, Serialize};

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Execution providers for ONNX Runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available).
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider.
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
        /// Memory limit in bytes (optional)
        gpu_mem_limit: Option<usize>,
    },
}

impl OrtExecutionProvider {
    /// CUDA provider on the given device with default memory settings.
    pub fn cuda(device_id: i32) -> Self {
        Self::CUDA {
            device_id: Some(device_id),
            gpu_mem_limit: None,
        }
    }

    /// Whether this provider places the model on an accelerator.
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, Self::CPU)
    }
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Enable parallel execution mode
    pub parallel_execution: Option<bool>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Execution providers in order of preference
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
    /// Enable memory pattern optimization
    pub enable_mem_pattern: Option<bool>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session configuration for the accelerator flag of the CLI: CUDA on
    /// `device_id` when `use_accelerator` is set, CPU otherwise.
    pub fn for_device(use_accelerator: bool, device_id: i32) -> Self {
        let providers = if use_accelerator {
            vec![OrtExecutionProvider::cuda(device_id)]
        } else {
            vec![OrtExecutionProvider::CPU]
        };
        Self::new().with_execution_providers(providers)
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallel_execution(mut self, enabled: bool) -> Self {
        self.parallel_execution = Some(enabled);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Sets the execution providers.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }

    /// Enables or disables memory pattern optimization.
    pub fn with_memory_pattern(mut self, enable: bool) -> Self {
        self.enable_mem_pattern = Some(enable);
        self
    }

    /// Gets the execution providers, defaulting to CPU.
    pub fn get_execution_providers(&self) -> Vec<OrtExecutionProvider> {
        self.execution_providers
            .clone()
            .unwrap_or_else(|| vec![OrtExecutionProvider::CPU])
    }

    /// Whether any configured provider is an accelerator.
    pub fn requests_accelerator(&self) -> bool {
        self.execution_providers
            .as_ref()
            .is_some_and(|eps| eps.iter().any(OrtExecutionProvider::is_accelerator))
    }
}
