// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use kurbo::{Point, Rect};
use latentscope_imaging::{Surface, SurfaceExt};
use latentscope_view::{DegenerateTransform, SurfaceView};

use crate::element::{Drawable, Element, ElementId};
use crate::frame::{FrameHandle, FrameScheduler};

/// Ordered set of elements painted onto one surface every frame.
///
/// The scene keeps at most one frame request outstanding. Each delivered
/// frame renders and then requests the next, until [`Scene::destroy`] cancels
/// the outstanding request.
#[derive(Debug)]
pub struct Scene<S: Surface, F: FrameScheduler> {
    surface: S,
    scheduler: F,
    view: SurfaceView,
    elements: Vec<(ElementId, Element)>,
    next_id: u32,
    pending: Option<FrameHandle>,
    destroyed: bool,
    frames_rendered: u64,
}

impl<S: Surface, F: FrameScheduler> Scene<S, F> {
    /// Creates a scene and requests its first frame.
    ///
    /// With `normalize` set, the surface transform is replaced by the
    /// normalized device transform of [`SurfaceView`], so elements are
    /// positioned in logical units centered on the surface.
    pub fn new(surface: S, scheduler: F, normalize: Option<f64>) -> Self {
        let view = SurfaceView::new(surface.size(), normalize);
        let mut scene = Self {
            surface,
            scheduler,
            view,
            elements: Vec::new(),
            next_id: 0,
            pending: None,
            destroyed: false,
            frames_rendered: 0,
        };
        scene.install_transform();
        scene.pending = Some(scene.scheduler.schedule_next_frame());
        scene
    }

    /// Appends an element; it paints above every element added before it.
    pub fn add_element(&mut self, element: impl Into<Element>) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.push((id, element.into()));
        id
    }

    /// Removes the element with the given handle, if it is still present.
    pub fn remove_element(&mut self, id: ElementId) -> Option<Element> {
        let pos = self.elements.iter().position(|(eid, _)| *eid == id)?;
        Some(self.elements.remove(pos).1)
    }

    /// Returns the element with the given handle.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements
            .iter()
            .find_map(|(eid, e)| (*eid == id).then_some(e))
    }

    /// Returns the element with the given handle for in-place mutation.
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements
            .iter_mut()
            .find_map(|(eid, e)| (*eid == id).then_some(e))
    }

    /// Iterates over elements in paint order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    /// Number of elements in the scene.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the scene has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Clears the surface, paints every element, then advances every element.
    ///
    /// This renders immediately and does not touch frame scheduling.
    pub fn render_frame(&mut self) {
        self.surface.clear_all();
        for (_, element) in &self.elements {
            element.draw(&mut self.surface);
        }
        for (_, element) in &mut self.elements {
            element.update();
        }
        self.frames_rendered += 1;
    }

    /// Handles a frame callback from the host.
    ///
    /// Renders and requests the next frame when `handle` is the outstanding
    /// request. Stale handles and callbacks after [`Scene::destroy`] are
    /// ignored. Returns whether a frame was rendered.
    pub fn on_frame(&mut self, handle: FrameHandle) -> bool {
        if self.destroyed || self.pending != Some(handle) {
            return false;
        }
        self.pending = None;
        self.render_frame();
        self.pending = Some(self.scheduler.schedule_next_frame());
        true
    }

    /// Stops the frame loop. Calling this more than once has no further effect.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Returns `true` once [`Scene::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Returns `true` while a frame request is outstanding.
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Returns the surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Returns the surface mutably.
    ///
    /// If the backing size changes, call [`Scene::resize`] afterwards.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Returns the frame scheduler.
    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    /// Returns the frame scheduler mutably.
    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Returns the coordinate view of the surface.
    pub fn view(&self) -> &SurfaceView {
        &self.view
    }

    /// Re-reads the surface size and reinstalls the normalized transform.
    pub fn resize(&mut self) {
        self.view.set_backing_size(self.surface.size());
        self.install_transform();
    }

    /// Maps a client (CSS) position into the scene's logical coordinates.
    ///
    /// `css_rect` is the surface's bounding rectangle in client coordinates.
    pub fn pointer_to_logical(
        &self,
        client: Point,
        css_rect: Rect,
    ) -> Result<Point, DegenerateTransform> {
        self.view
            .client_to_logical(client, css_rect, self.surface.transform())
    }

    fn install_transform(&mut self) {
        if self.view.scale().is_some() {
            self.surface.set_transform(self.view.device_transform());
        }
    }
}
