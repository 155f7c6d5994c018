//! Backend abstraction for classifier inference
//!
//! Disease classification runs on the CPU through the NdArray backend.
//! Inference only, so no autodiff wrapper is needed.

use burn::tensor::backend::Backend;

/// Backend used to run the disease classifier
pub type InferenceBackend = burn_ndarray::NdArray<f32>;

/// Get the default inference device
pub fn default_device() -> <InferenceBackend as Backend>::Device {
    <InferenceBackend as Backend>::Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    "NdArray (CPU)"
}
