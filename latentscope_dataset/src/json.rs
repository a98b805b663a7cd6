// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::iter::FusedIterator;
use core::slice;

use serde_json::Value;

/// Returns a depth-first iterator over the leaves of nested JSON arrays.
///
/// Leaves are yielded in row-major order without copying. A value that is not
/// an array is its own single leaf. The iterator makes one pass; call
/// `flatten` again for another.
pub fn flatten(value: &Value) -> Flatten<'_> {
    match value {
        Value::Array(items) => Flatten {
            stack: vec![items.iter()],
            scalar: None,
        },
        other => Flatten {
            stack: Vec::new(),
            scalar: Some(other),
        },
    }
}

/// Iterator returned by [`flatten`].
#[derive(Clone, Debug)]
pub struct Flatten<'a> {
    stack: Vec<slice::Iter<'a, Value>>,
    scalar: Option<&'a Value>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(leaf) = self.scalar.take() {
            return Some(leaf);
        }
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Value::Array(items)) => self.stack.push(items.iter()),
                Some(leaf) => return Some(leaf),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl FusedIterator for Flatten<'_> {}

/// Infers the dimensions of nested JSON arrays.
///
/// Each level contributes its length, descending through the first element
/// only. Jagged input is not detected here; compare the leaf count against
/// the product of the result to catch it.
pub fn shape(value: &Value) -> Vec<usize> {
    let mut dims = Vec::new();
    let mut current = value;
    while let Value::Array(items) = current {
        dims.push(items.len());
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }
    dims
}
