// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web Canvas (2D) surface for the Latentscope drawing IR.
//!
//! This crate provides a [`Surface`] implementation backed by
//! `web_sys::CanvasRenderingContext2d` when targeting `wasm32`.
//!
//! ```no_run
//! #[cfg(target_arch = "wasm32")]
//! fn make_surface(
//!     canvas: web_sys::HtmlCanvasElement,
//! ) -> Result<latentscope_imaging_web_canvas::WebCanvasSurface, wasm_bindgen::JsValue> {
//!     latentscope_imaging_web_canvas::WebCanvasSurface::new(canvas)
//! }
//! ```
//!
//! Notes:
//! - The surface mirrors the canvas transform on the Rust side so that
//!   [`Surface::transform`] never has to call back into JavaScript.
//! - [`WebCanvasSurface::css_rect`] reports the element's bounding client
//!   rect, which pointer mapping needs to undo CSS scaling.

#![no_std]

extern crate alloc;

#[cfg(target_arch = "wasm32")]
use alloc::{string::String, string::ToString, vec::Vec};
#[cfg(target_arch = "wasm32")]
use core::fmt;
#[cfg(target_arch = "wasm32")]
use kurbo::{Affine, Rect, Size};
#[cfg(target_arch = "wasm32")]
use latentscope_imaging::{Color, DrawOp, ImageData, StateOp};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{Clamped, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub use latentscope_imaging::Surface;

#[cfg(target_arch = "wasm32")]
fn color_to_css(color: Color) -> String {
    // `Rgba8` formats as a CSS `rgb(...)`/`rgba(...)` string.
    color.to_rgba8().to_string()
}

/// Canvas-backed surface (only available on `wasm32`).
#[cfg(target_arch = "wasm32")]
pub struct WebCanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    transform: Affine,
    saved: Vec<Affine>,
}

#[cfg(target_arch = "wasm32")]
impl fmt::Debug for WebCanvasSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebCanvasSurface")
            .field("transform", &self.transform)
            .field("save_depth", &self.saved.len())
            .finish_non_exhaustive()
    }
}

#[cfg(target_arch = "wasm32")]
impl WebCanvasSurface {
    /// Create a surface for a DOM canvas element.
    ///
    /// The canvas transform is reset to identity so that it matches the
    /// transform tracked on the Rust side.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("missing 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        ctx.reset_transform()?;
        Ok(Self {
            canvas,
            ctx,
            transform: Affine::IDENTITY,
            saved: Vec::new(),
        })
    }

    /// The underlying canvas element.
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Bounding rectangle of the canvas in client (CSS) coordinates.
    pub fn css_rect(&self) -> Rect {
        let r = self.canvas.get_bounding_client_rect();
        Rect::new(r.left(), r.top(), r.right(), r.bottom())
    }

    fn apply_transform(&self) {
        let [a, b, c, d, e, f] = self.transform.as_coeffs();
        let _ = self.ctx.set_transform(a, b, c, d, e, f);
    }
}

#[cfg(target_arch = "wasm32")]
impl Surface for WebCanvasSurface {
    fn size(&self) -> Size {
        Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn state(&mut self, op: StateOp) {
        match op {
            StateOp::Save => {
                self.ctx.save();
                self.saved.push(self.transform);
            }
            StateOp::Restore => {
                // The canvas ignores unmatched restores; keep our mirror in step.
                if let Some(transform) = self.saved.pop() {
                    self.ctx.restore();
                    self.transform = transform;
                }
            }
            StateOp::SetTransform(transform) => {
                self.transform = transform;
                self.apply_transform();
            }
            StateOp::SetFill(color) => {
                self.ctx.set_fill_style_str(&color_to_css(color));
            }
        }
    }

    fn draw(&mut self, op: DrawOp) {
        match op {
            DrawOp::ClearRect(rect) => {
                self.ctx
                    .clear_rect(rect.x0, rect.y0, rect.width(), rect.height());
            }
            DrawOp::FillCircle(circle) => {
                self.ctx.begin_path();
                let _ = self.ctx.arc(
                    circle.center.x,
                    circle.center.y,
                    circle.radius,
                    0.0,
                    core::f64::consts::TAU,
                );
                self.ctx.fill();
            }
            DrawOp::FillRect(rect) => {
                self.ctx.begin_path();
                self.ctx.rect(rect.x0, rect.y0, rect.width(), rect.height());
                self.ctx.fill();
            }
            DrawOp::PutImage { image, origin } => {
                put_image(&self.ctx, &image, origin.x, origin.y);
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn put_image(ctx: &CanvasRenderingContext2d, image: &ImageData, x: f64, y: f64) {
    match web_sys::ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(image.pixels()),
        image.width(),
        image.height(),
    ) {
        Ok(data) => {
            let _ = ctx.put_image_data(&data, x, y);
        }
        Err(_) => {
            // Dimensions were validated when `image` was built; nothing useful to draw.
        }
    }
}
