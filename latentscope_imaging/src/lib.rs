// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Latentscope Imaging: surface-agnostic drawing IR and surface traits.
//!
//! This crate defines the small immediate-mode drawing vocabulary used by
//! Latentscope scenes, modeled on a 2D canvas context:
//!
//! - [`StateOp`] mutates drawing state (save/restore, transform, fill color).
//! - [`DrawOp`] produces pixels given the current state.
//! - [`Surface`] is implemented by concrete targets (a browser canvas, the
//!   recording reference surface used in tests, …) and exposes the current
//!   transform and backing size so drawing code can reason about device pixels.
//! - [`SurfaceExt`] adds convenience helpers such as [`SurfaceExt::with_saved`].
//! - [`ImageData`] is a straight-alpha RGBA8 pixel buffer written to a surface
//!   in device space with [`DrawOp::PutImage`].
//!
//! # Example
//!
//! ```ignore
//! # use latentscope_imaging::*;
//! # use kurbo::{Circle, Point};
//! # let mut surface: Box<dyn Surface> = todo!();
//! surface.with_saved(|s| {
//!     s.set_fill(Color::BLACK);
//!     s.fill_circle(Circle::new(Point::new(10.0, 10.0), 3.0));
//! });
//! ```

#![no_std]

extern crate alloc;

use alloc::{sync::Arc, vec::Vec};
use core::fmt;

use kurbo::{Circle, Point, Rect, Size};
use peniko::color::{AlphaColor, Hsl, Srgb};

pub use kurbo::Affine;
pub use peniko::Color;

/// State operations that mutate the current drawing state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateOp {
    /// Push a copy of the current state (transform and fill) onto the state stack.
    Save,
    /// Pop the most recently saved state, making it current.
    ///
    /// A `Restore` without a matching [`StateOp::Save`] is ignored.
    Restore,
    /// Replace the current transform matrix.
    SetTransform(Affine),
    /// Set the color used by fill operations.
    SetFill(Color),
}

/// Draw operations that produce pixels given the current state.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Reset the given rectangle (in current coordinates) to transparent.
    ClearRect(Rect),
    /// Fill a disc with the current fill color.
    FillCircle(Circle),
    /// Fill an axis-aligned rectangle (in current coordinates) with the current fill color.
    FillRect(Rect),
    /// Write pixels directly to the surface.
    ///
    /// Like `putImageData`, this ignores the current transform and fill: the
    /// image's top-left corner lands at `origin` in device pixels.
    PutImage {
        /// Pixels to write.
        image: ImageData,
        /// Destination of the image's top-left pixel, in device pixels.
        origin: Point,
    },
}

/// Unified drawing operation, as recorded by reference surfaces.
#[derive(Clone, Debug, PartialEq)]
pub enum ImagingOp {
    /// State-changing operation.
    State(StateOp),
    /// Drawing operation.
    Draw(DrawOp),
}

/// A drawing target.
///
/// Implementations apply operations immediately. They must track the
/// current transform so that callers can map logical coordinates into device
/// pixels, for example to draw markers whose on-screen size does not depend
/// on the logical zoom.
pub trait Surface {
    /// Backing-store size in device pixels.
    fn size(&self) -> Size;

    /// Currently installed transform.
    fn transform(&self) -> Affine;

    /// Apply a state operation.
    fn state(&mut self, op: StateOp);

    /// Apply a draw operation.
    fn draw(&mut self, op: DrawOp);
}

/// Convenience helpers available on every [`Surface`].
pub trait SurfaceExt: Surface {
    /// Runs `f` between a matching save and restore.
    fn with_saved<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.state(StateOp::Save);
        let result = f(self);
        self.state(StateOp::Restore);
        result
    }

    /// Replaces the current transform.
    #[inline]
    fn set_transform(&mut self, transform: Affine) {
        self.state(StateOp::SetTransform(transform));
    }

    /// Post-multiplies the current transform by `transform`.
    ///
    /// This matches the canvas `translate`/`rotate`/`scale` calls: subsequent
    /// coordinates are transformed by `transform` first.
    #[inline]
    fn concat_transform(&mut self, transform: Affine) {
        let current = self.transform();
        self.state(StateOp::SetTransform(current * transform));
    }

    /// Sets the fill color.
    #[inline]
    fn set_fill(&mut self, color: Color) {
        self.state(StateOp::SetFill(color));
    }

    /// Fills a disc with the current fill color.
    #[inline]
    fn fill_circle(&mut self, circle: Circle) {
        self.draw(DrawOp::FillCircle(circle));
    }

    /// Fills a rectangle with the current fill color.
    #[inline]
    fn fill_rect(&mut self, rect: Rect) {
        self.draw(DrawOp::FillRect(rect));
    }

    /// Clears the whole backing store, ignoring the current transform.
    fn clear_all(&mut self) {
        let size = self.size();
        self.with_saved(|s| {
            s.set_transform(Affine::IDENTITY);
            s.draw(DrawOp::ClearRect(size.to_rect()));
        });
    }

    /// Writes `image` with its top-left pixel at `origin` (device pixels).
    #[inline]
    fn put_image(&mut self, image: ImageData, origin: Point) {
        self.draw(DrawOp::PutImage { image, origin });
    }
}

impl<S: Surface + ?Sized> SurfaceExt for S {}

/// Builds a color from CSS-style `hsla()` components.
///
/// `hue` is in degrees, `saturation` and `lightness` are percentages
/// (`0..=100`), and `alpha` is in `0..=1`.
#[must_use]
pub fn hsla(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Color {
    AlphaColor::<Hsl>::new([hue, saturation, lightness, alpha]).convert::<Srgb>()
}

/// Error returned when a pixel buffer does not match its stated dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSizeError {
    /// Number of values implied by the dimensions.
    pub expected: usize,
    /// Number of values supplied.
    pub actual: usize,
}

impl fmt::Display for ImageSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pixel buffer holds {} values, expected {}",
            self.actual, self.expected
        )
    }
}

impl core::error::Error for ImageSizeError {}

/// Straight-alpha RGBA8 pixel buffer.
///
/// Pixels are tightly packed in row-major order. The buffer is shared, so
/// cloning an `ImageData` is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ImageData {
    /// Wraps an RGBA8 buffer of `width × height × 4` bytes.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Result<Self, ImageSizeError> {
        let pixels = pixels.into();
        let expected = pixel_count(width, height) * 4;
        if pixels.len() != expected {
            return Err(ImageSizeError {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds an opaque grayscale image from one intensity per pixel.
    ///
    /// Each value is multiplied by `gain` and clamped into `0..=255`; use a
    /// gain of `255.0` for unit-range data and `1.0` for data that is already
    /// in byte range. NaN intensities become black.
    pub fn from_gray(
        width: u32,
        height: u32,
        values: &[f32],
        gain: f32,
    ) -> Result<Self, ImageSizeError> {
        let expected = pixel_count(width, height);
        if values.len() != expected {
            return Err(ImageSizeError {
                expected,
                actual: values.len(),
            });
        }
        let mut pixels = Vec::with_capacity(expected * 4);
        for &v in values {
            let g = to_byte(v * gain);
            pixels.extend_from_slice(&[g, g, g, 255]);
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Builds an image from RGBA channel values given as floats in byte range.
    ///
    /// Values are clamped into `0..=255`, as a canvas `Uint8ClampedArray` does.
    pub fn from_rgba_f32(width: u32, height: u32, values: &[f32]) -> Result<Self, ImageSizeError> {
        let pixels: Vec<u8> = values.iter().map(|&v| to_byte(v)).collect();
        Self::from_rgba8(width, height, pixels)
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the RGBA value at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.pixels.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Value is rounded and clamped into byte range before the cast."
)]
#[allow(clippy::cast_sign_loss, reason = "Value is clamped to be non-negative.")]
fn to_byte(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    // `as` saturates, but round first so 254.6 lands on 255 like a clamped array.
    (v + 0.5).clamp(0.0, 255.0) as u8
}
