// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=latentscope_dataset --heading-base-level=0

//! Latentscope Dataset: nested JSON arrays as flat `f32` tensors.
//!
//! Datasets are stored as JSON documents of nested numeric arrays, one level
//! per dimension. [`flatten`] walks the leaves depth-first in row-major order,
//! and [`shape`] infers the dimensions by following the first element at every
//! level. [`Tensor`] combines the two and checks that they agree.
//!
//! ```rust
//! use latentscope_dataset::Tensor;
//!
//! let t = Tensor::from_json_str("[[1, 2], [3, 4], [5, 6]]").unwrap();
//! assert_eq!(t.dims(), [3, 2]);
//! assert_eq!(t.at(&[2, 1]), Some(6.0));
//! assert_eq!(t.row(1), Some(&[3.0, 4.0][..]));
//! ```

mod error;
mod json;
mod tensor;

pub use error::LoadError;
pub use json::{Flatten, flatten, shape};
pub use tensor::Tensor;
