// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;

/// Errors raised while fetching or decoding a dataset tensor.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dataset document could not be retrieved.
    #[error("failed to fetch {path}: {message}")]
    Fetch {
        /// Path that was requested.
        path: String,
        /// Reason reported by the source.
        message: String,
    },
    /// The document is not valid JSON.
    #[error("invalid dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// A leaf of the nested arrays is not a number.
    #[error("leaf {index} is not a number")]
    NonNumeric {
        /// Position of the leaf in row-major order.
        index: usize,
    },
    /// The number of leaves disagrees with the inferred shape.
    #[error("shape {dims:?} requires {expected} values, found {actual}")]
    ShapeMismatch {
        /// Inferred dimensions.
        dims: Vec<usize>,
        /// Product of the dimensions.
        expected: usize,
        /// Number of values present.
        actual: usize,
    },
    /// The document contains no values.
    #[error("dataset contains no values")]
    Empty,
}
