// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use latentscope_dataset::LoadError;
use latentscope_view::DegenerateTransform;
use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that abort setting up a session with
/// [`LatentSpaceController::start`](crate::LatentSpaceController::start) or its
/// stepwise counterparts.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A dataset document could not be loaded.
    #[error("failed to load dataset")]
    Load(#[from] LoadError),
    /// The encoder failed or produced the wrong shape.
    #[error("failed to encode dataset")]
    Inference(#[from] InferenceError),
    /// The latent surface cannot map pointer positions back to latent space.
    #[error("latent surface transform is not invertible")]
    Degenerate(#[from] DegenerateTransform),
    /// The label document does not have one label per sample.
    #[error("{samples} samples but {labels} labels")]
    LabelCount {
        /// Number of samples.
        samples: usize,
        /// Number of labels.
        labels: usize,
    },
    /// The setup step belongs to a session that was restarted or destroyed.
    #[error("session was superseded before setup finished")]
    Superseded,
}
