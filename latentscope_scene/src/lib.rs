// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=latentscope_scene --heading-base-level=0

//! Latentscope Scene: ordered drawables and a host-driven render loop.
//!
//! A [`Scene`] owns one drawing [`Surface`](latentscope_imaging::Surface) and
//! an ordered list of [`Element`]s. Insertion order is paint order, so later
//! elements paint over earlier ones. Each frame the scene clears the whole
//! surface in device space, draws every element, and then advances every
//! element that animates.
//!
//! Frames are not driven by the scene itself. A [`FrameScheduler`] asks the
//! host for a callback (for example `requestAnimationFrame`) and the host
//! calls [`Scene::on_frame`] with the handle it was given. This keeps the
//! scene deterministic under test: [`ManualFrames`] hands out handles that a
//! test fires explicitly.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Size};
//! use latentscope_imaging::Color;
//! use latentscope_imaging_ref::RefSurface;
//! use latentscope_scene::{ManualFrames, PointMarker, Scene};
//!
//! let surface = RefSurface::new(Size::new(200.0, 200.0));
//! let mut scene = Scene::new(surface, ManualFrames::default(), Some(0.25));
//! scene.add_element(PointMarker::new(Point::new(1.0, -1.0), 3.0, Color::BLACK));
//!
//! for handle in scene.scheduler_mut().take_due() {
//!     scene.on_frame(handle);
//! }
//! assert_eq!(scene.frames_rendered(), 1);
//!
//! scene.destroy();
//! assert!(scene.scheduler_mut().take_due().is_empty());
//! ```
//!
//! This crate is `no_std`.

#![no_std]

extern crate alloc;

mod element;
mod frame;
mod scene;

pub use element::{DEFAULT_ROTATION_STEP, Drawable, Element, ElementId, PointMarker, RotatingRect};
#[cfg(target_arch = "wasm32")]
pub use frame::AnimationFrames;
pub use frame::{FrameHandle, FrameScheduler, ManualFrames};
pub use scene::Scene;
