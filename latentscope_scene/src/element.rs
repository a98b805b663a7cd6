// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{Affine, Circle, Point, Rect, Size};
use latentscope_imaging::{Color, Surface, SurfaceExt};

/// Rotation applied by [`RotatingRect::update`] unless configured otherwise, in radians.
pub const DEFAULT_ROTATION_STEP: f64 = 0.05;

/// Identifier for an element owned by a [`Scene`](crate::Scene).
///
/// Handles are never reused within one scene, so a stale handle simply stops
/// matching once its element has been removed.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementId(pub u32);

/// Something a scene can paint every frame.
pub trait Drawable {
    /// Paint onto `surface` using its current transform.
    ///
    /// Implementations must leave the surface state as they found it.
    fn draw(&self, surface: &mut dyn Surface);

    /// Advance any animation state by one frame.
    ///
    /// Called after every element of the frame has been drawn.
    fn update(&mut self) {}
}

/// Filled disc whose radius is measured in device pixels.
///
/// The position is logical: it is mapped through the surface transform, but
/// the disc itself is painted with the identity transform so that it keeps the
/// same on-screen size at any zoom level.
#[derive(Clone, Debug, PartialEq)]
pub struct PointMarker {
    /// Center in logical coordinates.
    pub position: Point,
    /// Radius in device pixels.
    pub radius: f64,
    /// Fill color.
    pub color: Color,
}

impl PointMarker {
    /// Creates a marker at `position`.
    pub fn new(position: Point, radius: f64, color: Color) -> Self {
        Self {
            position,
            radius,
            color,
        }
    }
}

impl Drawable for PointMarker {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.with_saved(|s| {
            s.set_fill(self.color);
            let t = s.transform();
            s.set_transform(Affine::IDENTITY);
            s.fill_circle(Circle::new(t * self.position, self.radius));
        });
    }
}

/// Filled rectangle spinning about its center, used as a loading indicator.
///
/// Unlike [`PointMarker`], the rectangle lives entirely in logical space, so
/// its on-screen size follows the surface transform.
#[derive(Clone, Debug, PartialEq)]
pub struct RotatingRect {
    /// Center in logical coordinates.
    pub position: Point,
    /// Width and height in logical units.
    pub size: Size,
    /// Fill color.
    pub color: Color,
    /// Current rotation in radians.
    pub rotation: f64,
    /// Rotation added per update, in radians.
    pub step: f64,
}

impl RotatingRect {
    /// Creates an unrotated rectangle that advances by [`DEFAULT_ROTATION_STEP`].
    pub fn new(position: Point, size: Size, color: Color) -> Self {
        Self {
            position,
            size,
            color,
            rotation: 0.0,
            step: DEFAULT_ROTATION_STEP,
        }
    }

    /// Sets the rotation applied per update.
    #[must_use]
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl Drawable for RotatingRect {
    fn draw(&self, surface: &mut dyn Surface) {
        surface.with_saved(|s| {
            s.set_fill(self.color);
            s.concat_transform(
                Affine::translate(self.position.to_vec2()) * Affine::rotate(self.rotation),
            );
            s.fill_rect(Rect::from_center_size(Point::ORIGIN, self.size));
        });
    }

    fn update(&mut self) {
        self.rotation += self.step;
    }
}

/// Element variants a scene can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Pixel-sized point marker.
    Point(PointMarker),
    /// Spinning rectangle.
    RotatingRect(RotatingRect),
}

impl Element {
    /// Returns the point marker, if this element is one.
    pub fn as_point_mut(&mut self) -> Option<&mut PointMarker> {
        match self {
            Self::Point(p) => Some(p),
            Self::RotatingRect(_) => None,
        }
    }
}

impl Drawable for Element {
    fn draw(&self, surface: &mut dyn Surface) {
        match self {
            Self::Point(p) => p.draw(surface),
            Self::RotatingRect(r) => r.draw(surface),
        }
    }

    fn update(&mut self) {
        match self {
            Self::Point(p) => p.update(),
            Self::RotatingRect(r) => r.update(),
        }
    }
}

impl From<PointMarker> for Element {
    fn from(value: PointMarker) -> Self {
        Self::Point(value)
    }
}

impl From<RotatingRect> for Element {
    fn from(value: RotatingRect) -> Self {
        Self::RotatingRect(value)
    }
}
