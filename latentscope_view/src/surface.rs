// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Affine, Point, Rect, Size, Vec2};

use crate::geom::{DegenerateTransform, try_invert};

/// Device-pixel transform of a drawing surface.
///
/// `SurfaceView` tracks the backing-store size of a surface (in device
/// pixels) and an optional normalization scale. When normalization is
/// enabled, the logical origin sits at the center of the surface and one
/// logical unit spans `scale × size / 2` device pixels along each axis, so
/// drawing code can be authored in a fixed coordinate system independent of
/// the physical pixel dimensions.
///
/// The transform is rebuilt whenever the backing size or scale changes.
#[derive(Clone, Debug)]
pub struct SurfaceView {
    backing_size: Size,
    scale: Option<f64>,
    device_transform: Affine,
}

impl SurfaceView {
    /// Creates a view that draws directly in device pixels.
    #[must_use]
    pub fn identity(backing_size: Size) -> Self {
        Self::new(backing_size, None)
    }

    /// Creates a view whose logical origin is the surface center, scaled by `scale`.
    #[must_use]
    pub fn normalized(backing_size: Size, scale: f64) -> Self {
        Self::new(backing_size, Some(scale))
    }

    /// Creates a view with an optional normalization scale.
    #[must_use]
    pub fn new(backing_size: Size, scale: Option<f64>) -> Self {
        let mut view = Self {
            backing_size,
            scale,
            device_transform: Affine::IDENTITY,
        };
        view.rebuild_transform();
        view
    }

    /// Returns the backing-store size in device pixels.
    #[must_use]
    pub fn backing_size(&self) -> Size {
        self.backing_size
    }

    /// Sets the backing-store size, rebuilding the transform.
    pub fn set_backing_size(&mut self, size: Size) {
        if self.backing_size == size {
            return;
        }
        self.backing_size = size;
        self.rebuild_transform();
    }

    /// Returns the normalization scale, if normalization is enabled.
    #[must_use]
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    /// Sets the normalization scale, rebuilding the transform.
    pub fn set_scale(&mut self, scale: Option<f64>) {
        if self.scale == scale {
            return;
        }
        self.scale = scale;
        self.rebuild_transform();
    }

    /// Returns the transform from logical coordinates to device pixels.
    #[must_use]
    pub fn device_transform(&self) -> Affine {
        self.device_transform
    }

    /// Converts a client (CSS) position into device pixels.
    ///
    /// `css_rect` is the bounding rectangle of the surface in client
    /// coordinates. The offset from its origin is stretched by the ratio of the
    /// backing size to the CSS size, which accounts for high-DPI backing stores
    /// and CSS scaling. A zero-sized `css_rect` cannot be mapped.
    pub fn client_to_device(
        &self,
        client: Point,
        css_rect: Rect,
    ) -> Result<Point, DegenerateTransform> {
        let css_size = css_rect.size();
        let sx = self.backing_size.width / css_size.width;
        let sy = self.backing_size.height / css_size.height;
        if !sx.is_finite() || !sy.is_finite() {
            // Determinant of the CSS-to-backing scale, non-finite here.
            return Err(DegenerateTransform {
                determinant: sx * sy,
            });
        }
        let offset = client - css_rect.origin();
        Ok(Point::new(offset.x * sx, offset.y * sy))
    }

    /// Converts a client (CSS) position into logical coordinates.
    ///
    /// The device position is mapped through the inverse of `current`, the
    /// transform currently installed on the surface. Usually that is
    /// [`SurfaceView::device_transform`], but callers pass it explicitly so
    /// the mapping follows whatever the surface actually draws with.
    pub fn client_to_logical(
        &self,
        client: Point,
        css_rect: Rect,
        current: Affine,
    ) -> Result<Point, DegenerateTransform> {
        let device = self.client_to_device(client, css_rect)?;
        Ok(try_invert(current)? * device)
    }

    /// Converts a logical position into device pixels.
    #[must_use]
    pub fn logical_to_device(&self, pt: Point) -> Point {
        self.device_transform * pt
    }

    /// Returns the logical-space rectangle covered by the surface.
    pub fn visible_logical_rect(&self) -> Result<Rect, DegenerateTransform> {
        let inverse = try_invert(self.device_transform)?;
        let p0 = inverse * Point::ORIGIN;
        let p1 = inverse * Point::new(self.backing_size.width, self.backing_size.height);
        Ok(Rect::from_points(p0, p1))
    }

    fn rebuild_transform(&mut self) {
        self.device_transform = match self.scale {
            None => Affine::IDENTITY,
            Some(scale) => {
                let half = Vec2::new(self.backing_size.width, self.backing_size.height) / 2.0;
                // Origin to the surface center, then one logical unit per `scale` half-extent.
                Affine::translate(half) * Affine::scale_non_uniform(scale * half.x, scale * half.y)
            }
        };
    }
}
