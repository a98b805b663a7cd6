// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Latentscope Imaging Reference Surface.
//!
//! This crate provides a small, stateful implementation of [`Surface`] for
//! **op recording and state tracing**.
//!
//! It is intentionally *not* a rasterizer:
//! - It does **not** produce pixels.
//! - It is intended for tests and debugging that want to assert on emitted
//!   ops and on the drawing state in effect when each op was applied.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;

use latentscope_imaging::{Affine, Color, DrawOp, ImageData, ImagingOp, StateOp, Surface};
use peniko::kurbo::Size;

/// Snapshot of the current drawing state inside the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot {
    /// Current transform.
    pub transform: Affine,
    /// Current fill color.
    pub fill: Color,
    /// Number of entries on the save/restore stack.
    pub save_depth: usize,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            fill: Color::BLACK,
            save_depth: 0,
        }
    }
}

/// Event recorded by the reference surface.
#[derive(Clone, Debug)]
pub enum Event {
    /// State operation and the resulting state snapshot.
    State {
        /// State operation that was applied.
        op: StateOp,
        /// Snapshot after applying the state operation.
        state: StateSnapshot,
    },
    /// Draw operation and the state snapshot used for drawing.
    Draw {
        /// Draw operation that was applied.
        op: DrawOp,
        /// Snapshot at the time of drawing.
        state: StateSnapshot,
    },
}

/// Reference implementation of a drawing surface.
///
/// This surface:
/// - Tracks the current transform and fill with a canvas-style save/restore stack,
/// - Records [`Event`]s as state and draw operations are applied,
/// - Remembers the last image written with [`DrawOp::PutImage`].
#[derive(Debug)]
pub struct RefSurface {
    size: Size,
    /// Log of events in the order they were applied.
    events: Vec<Event>,
    /// Underlying ops, without state snapshots.
    ops: Vec<ImagingOp>,
    state: StateSnapshot,
    saved: Vec<(Affine, Color)>,
}

impl RefSurface {
    /// Creates a surface with the given backing size in device pixels.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            events: Vec::new(),
            ops: Vec::new(),
            state: StateSnapshot::default(),
            saved: Vec::new(),
        }
    }

    /// Changes the backing size, as a resized canvas would.
    ///
    /// Like a canvas, resizing resets the drawing state.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.state = StateSnapshot::default();
        self.saved.clear();
    }

    /// Returns a slice of recorded events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Returns a slice of raw ops.
    pub fn ops(&self) -> &[ImagingOp] {
        &self.ops
    }

    /// Returns the current drawing state.
    pub fn current_state(&self) -> &StateSnapshot {
        &self.state
    }

    /// Iterates over draw operations together with the state they were drawn with.
    pub fn draws(&self) -> impl DoubleEndedIterator<Item = (&DrawOp, &StateSnapshot)> + '_ {
        self.events.iter().filter_map(|event| match event {
            Event::Draw { op, state } => Some((op, state)),
            Event::State { .. } => None,
        })
    }

    /// Returns the most recent image written to the surface, if any.
    pub fn last_image(&self) -> Option<&ImageData> {
        self.draws().rev().find_map(|(op, _)| match op {
            DrawOp::PutImage { image, .. } => Some(image),
            _ => None,
        })
    }

    /// Clears all recorded events and ops but keeps the drawing state.
    pub fn clear_events(&mut self) {
        self.events.clear();
        self.ops.clear();
    }
}

impl Surface for RefSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn transform(&self) -> Affine {
        self.state.transform
    }

    fn state(&mut self, op: StateOp) {
        match &op {
            StateOp::Save => {
                self.saved.push((self.state.transform, self.state.fill));
            }
            StateOp::Restore => {
                if let Some((transform, fill)) = self.saved.pop() {
                    self.state.transform = transform;
                    self.state.fill = fill;
                }
            }
            StateOp::SetTransform(tx) => self.state.transform = *tx,
            StateOp::SetFill(color) => self.state.fill = *color,
        }
        self.state.save_depth = self.saved.len();

        self.ops.push(ImagingOp::State(op.clone()));
        self.events.push(Event::State {
            op,
            state: self.state.clone(),
        });
    }

    fn draw(&mut self, op: DrawOp) {
        self.ops.push(ImagingOp::Draw(op.clone()));
        self.events.push(Event::Draw {
            op,
            state: self.state.clone(),
        });
    }
}
