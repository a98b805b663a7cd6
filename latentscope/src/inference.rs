// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use latentscope_dataset::Tensor;
use thiserror::Error;

/// Errors reported by a model or raised while checking its output.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The runtime failed to evaluate the model.
    #[error("inference failed: {0}")]
    Runtime(String),
    /// The model produced the wrong number of values.
    #[error("model produced {actual} values, expected {expected}")]
    OutputShape {
        /// Number of values the caller can use.
        expected: usize,
        /// Number of values produced.
        actual: usize,
    },
}

/// A loaded model that maps one tensor to another.
///
/// The encoder maps `[N, width × height]` samples to `[N, 2]` latent
/// positions; the decoder maps a `[1, 2]` position back to an image.
/// Closures implement this trait, which is convenient for tests and for
/// wrapping a runtime handle.
pub trait InferenceSession {
    /// Evaluates the model on `input`.
    fn run(&mut self, input: &Tensor) -> Result<Tensor, InferenceError>;
}

impl<F> InferenceSession for F
where
    F: FnMut(&Tensor) -> Result<Tensor, InferenceError>,
{
    fn run(&mut self, input: &Tensor) -> Result<Tensor, InferenceError> {
        self(input)
    }
}
