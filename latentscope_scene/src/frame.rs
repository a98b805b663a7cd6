// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame scheduling seam between a scene and its host.

use alloc::vec::Vec;

/// Handle for one scheduled frame callback.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host service that delivers one frame callback per request.
///
/// When the host's frame fires it must call
/// [`Scene::on_frame`](crate::Scene::on_frame) with the handle returned by
/// [`FrameScheduler::schedule_next_frame`]. Callbacks are delivered on the
/// same thread, never concurrently with another frame.
pub trait FrameScheduler {
    /// Requests a callback for the next frame.
    fn schedule_next_frame(&mut self) -> FrameHandle;

    /// Cancels a previously requested callback.
    ///
    /// Cancelling a handle that already fired or was already cancelled is a no-op.
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Deterministic scheduler for tests and headless hosts.
///
/// Scheduled handles accumulate until [`ManualFrames::take_due`] hands them
/// to the caller, who fires them in order.
#[derive(Clone, Debug, Default)]
pub struct ManualFrames {
    next: u64,
    due: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
}

impl ManualFrames {
    /// Returns and forgets every handle that is scheduled and not cancelled.
    pub fn take_due(&mut self) -> Vec<FrameHandle> {
        core::mem::take(&mut self.due)
    }

    /// Handles that are scheduled and not cancelled.
    pub fn due(&self) -> &[FrameHandle] {
        &self.due
    }

    /// Handles that were cancelled before they fired.
    pub fn cancelled(&self) -> &[FrameHandle] {
        &self.cancelled
    }

    /// Total number of frames ever requested.
    pub fn scheduled_count(&self) -> u64 {
        self.next
    }
}

impl FrameScheduler for ManualFrames {
    fn schedule_next_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next);
        self.next += 1;
        self.due.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(pos) = self.due.iter().position(|h| *h == handle) {
            self.due.remove(pos);
            self.cancelled.push(handle);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use animation::AnimationFrames;

#[cfg(target_arch = "wasm32")]
mod animation {
    use alloc::rc::Rc;
    use core::fmt;

    use wasm_bindgen::{JsCast, closure::Closure};

    use super::{FrameHandle, FrameScheduler};

    /// `requestAnimationFrame` scheduler (only available on `wasm32`).
    ///
    /// Each fired frame invokes `on_frame` with its handle; the host routes
    /// that to [`Scene::on_frame`](crate::Scene::on_frame), typically through
    /// an `Rc<RefCell<_>>` holding the scene.
    pub struct AnimationFrames {
        window: web_sys::Window,
        on_frame: Rc<dyn Fn(FrameHandle)>,
        next: u64,
        pending: Option<(FrameHandle, i32)>,
    }

    impl fmt::Debug for AnimationFrames {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("AnimationFrames")
                .field("next", &self.next)
                .field("pending", &self.pending)
                .finish_non_exhaustive()
        }
    }

    impl AnimationFrames {
        /// Creates a scheduler for `window` that reports frames to `on_frame`.
        pub fn new(window: web_sys::Window, on_frame: Rc<dyn Fn(FrameHandle)>) -> Self {
            Self {
                window,
                on_frame,
                next: 0,
                pending: None,
            }
        }
    }

    impl FrameScheduler for AnimationFrames {
        fn schedule_next_frame(&mut self) -> FrameHandle {
            let handle = FrameHandle(self.next);
            self.next += 1;
            let on_frame = Rc::clone(&self.on_frame);
            let callback = Closure::once_into_js(move || on_frame(handle));
            // A scene keeps at most one frame in flight, so older ids have already fired.
            self.pending = self
                .window
                .request_animation_frame(callback.unchecked_ref::<js_sys::Function>())
                .ok()
                .map(|id| (handle, id));
            handle
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            if let Some((pending, id)) = self.pending
                && pending == handle
            {
                let _ = self.window.cancel_animation_frame(id);
                self.pending = None;
            }
        }
    }
}
