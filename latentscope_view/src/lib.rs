// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Latentscope View: 2D coordinate primitives for drawing surfaces.
//!
//! This crate provides the small amount of geometry the rest of Latentscope
//! needs on top of [`kurbo`]:
//! - Checked inversion of affine transforms ([`try_invert`]), failing with
//!   [`DegenerateTransform`] instead of producing non-finite coefficients.
//! - Euclidean distance and nearest-point search over point sets.
//! - [`SurfaceView`], which owns the device-pixel transform of a drawing
//!   surface and maps pointer positions back into the surface's normalized
//!   (logical) coordinate space.
//!
//! Positions are plain [`kurbo::Point`] values and differences are
//! [`kurbo::Vec2`]; both are `Copy` and every operation returns a new value.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Point, Rect, Size};
//! use latentscope_view::SurfaceView;
//!
//! // 280x280 backing store shown at 140x140 CSS pixels.
//! let view = SurfaceView::normalized(Size::new(280.0, 280.0), 0.5);
//! let css_rect = Rect::new(0.0, 0.0, 140.0, 140.0);
//!
//! let logical = view
//!     .client_to_logical(Point::new(0.0, 0.0), css_rect, view.device_transform())
//!     .unwrap();
//! assert!((logical.x + 2.0).abs() < 1e-9);
//! assert!((logical.y + 2.0).abs() < 1e-9);
//! ```
//!
//! This crate is `no_std`.

#![no_std]

mod geom;
mod surface;

pub use geom::{DegenerateTransform, distance, nearest_point, try_invert};
pub use surface::SurfaceView;
