// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=latentscope --heading-base-level=0

//! Latentscope: explore the latent space of an image autoencoder.
//!
//! A [`LatentSpaceController`] ties three drawing surfaces to a pair of models:
//!
//! - The **latent** surface shows every dataset sample as a faint point at the
//!   position the encoder assigns it.
//! - Moving the pointer over the latent surface decodes the latent position
//!   under it onto the **output** surface.
//! - The sample nearest the pointer is highlighted and drawn onto the
//!   **reference** surface for comparison.
//!
//! Model evaluation, dataset retrieval, and pointer listeners are supplied by
//! the host through [`InferenceSession`], [`DatasetSource`], and
//! [`PointerBinding`]. Frames of the latent scene are delivered through a
//! [`FrameScheduler`](latentscope_scene::FrameScheduler).
//!
//! Logging goes through [`tracing`]; install a subscriber in the host to see it.

mod config;
mod controller;
mod error;
mod inference;
mod source;

pub use config::{PointColoring, SessionConfig};
pub use controller::{
    DecodeRequest, EncodeSetup, LatentPoint, LatentSpaceController, PendingSetup, PointerBinding,
    PointerInput, SessionParts, SessionState,
};
pub use error::SetupError;
pub use inference::{InferenceError, InferenceSession};
pub use latentscope_dataset::{LoadError, Tensor};
pub use source::{DatasetSource, DirSource, MemorySource};
