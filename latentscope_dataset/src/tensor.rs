// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde_json::Value;

use crate::error::LoadError;
use crate::json::{flatten, shape};

/// Dense row-major `f32` tensor.
///
/// The number of values always equals the product of the dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    dims: Vec<usize>,
}

impl Tensor {
    /// Creates a tensor from a flat buffer and its dimensions.
    pub fn new(data: Vec<f32>, dims: Vec<usize>) -> Result<Self, LoadError> {
        let expected = dims.iter().product();
        if data.len() != expected {
            return Err(LoadError::ShapeMismatch {
                dims,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, dims })
    }

    /// Creates a `[1, n]` tensor holding a single row.
    pub fn row_vector(data: Vec<f32>) -> Self {
        let dims = vec![1, data.len()];
        Self { data, dims }
    }

    /// Builds a tensor from nested JSON arrays.
    ///
    /// The shape is inferred with [`shape`], so jagged input surfaces as
    /// [`LoadError::ShapeMismatch`].
    pub fn from_json(value: &Value) -> Result<Self, LoadError> {
        let data = flatten(value)
            .enumerate()
            .map(|(index, leaf)| leaf.as_f64().map(narrow).ok_or(LoadError::NonNumeric { index }))
            .collect::<Result<Vec<_>, _>>()?;
        if data.is_empty() {
            return Err(LoadError::Empty);
        }
        Self::new(data, shape(value))
    }

    /// Parses a JSON document and builds a tensor from it.
    pub fn from_json_str(text: &str) -> Result<Self, LoadError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Returns the flat row-major buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the dimensions.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the tensor holds no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length of the outermost dimension, or 1 for a scalar.
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Returns the value at a full multi-index, or `None` when out of range.
    pub fn at(&self, indices: &[usize]) -> Option<f32> {
        if indices.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in indices.iter().zip(&self.dims) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.data.get(offset).copied()
    }

    /// Returns the values of the `i`th entry along the outermost dimension.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.rows() {
            return None;
        }
        let stride = self.dims.iter().skip(1).product::<usize>();
        self.data.get(i * stride..(i + 1) * stride)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Dataset values are stored as f32."
)]
fn narrow(value: f64) -> f32 {
    value as f32
}
