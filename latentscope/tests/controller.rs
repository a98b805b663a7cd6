// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests of the latent-space controller against recording surfaces.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kurbo::{Point, Rect, Size};
use latentscope::{
    DatasetSource, InferenceError, InferenceSession, LatentSpaceController, LoadError,
    MemorySource, PointColoring, PointerBinding, PointerInput, SessionConfig, SessionParts,
    SessionState, SetupError, Tensor,
};
use latentscope_imaging::DrawOp;
use latentscope_imaging_ref::RefSurface;
use latentscope_scene::{Element, FrameHandle, FrameScheduler, ManualFrames};

/// Client rectangle of the latent surface: half the backing resolution.
const CSS: Rect = Rect::new(0.0, 0.0, 140.0, 140.0);

type Controller = LatentSpaceController<RefSurface, SharedFrames>;

#[derive(Clone, Debug, Default)]
struct SharedFrames(Rc<RefCell<ManualFrames>>);

impl SharedFrames {
    fn fire(&self, controller: &mut Controller) -> usize {
        let due = self.0.borrow_mut().take_due();
        let Some(scene) = controller.scene_mut() else {
            return 0;
        };
        due.into_iter().filter(|h| scene.on_frame(*h)).count()
    }

    fn due(&self) -> Vec<FrameHandle> {
        self.0.borrow().due().to_vec()
    }

    fn cancelled(&self) -> Vec<FrameHandle> {
        self.0.borrow().cancelled().to_vec()
    }
}

impl FrameScheduler for SharedFrames {
    fn schedule_next_frame(&mut self) -> FrameHandle {
        self.0.borrow_mut().schedule_next_frame()
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.0.borrow_mut().cancel_frame(handle);
    }
}

#[derive(Clone, Debug, Default)]
struct Listeners {
    bound: Rc<Cell<i32>>,
    binds: Rc<Cell<u32>>,
}

impl PointerBinding for Listeners {
    fn bind(&mut self) {
        self.bound.set(self.bound.get() + 1);
        self.binds.set(self.binds.get() + 1);
    }

    fn unbind(&mut self) {
        self.bound.set(self.bound.get() - 1);
    }
}

#[derive(Clone, Debug, Default)]
struct DecoderProbe {
    inputs: Rc<RefCell<Vec<Vec<f32>>>>,
    fail: Rc<Cell<bool>>,
}

impl DecoderProbe {
    fn calls(&self) -> usize {
        self.inputs.borrow().len()
    }

    fn session(&self) -> Box<dyn InferenceSession> {
        let probe = self.clone();
        Box::new(move |input: &Tensor| {
            probe.inputs.borrow_mut().push(input.data().to_vec());
            if probe.fail.get() {
                return Err(InferenceError::Runtime("decoder crashed".into()));
            }
            Ok(Tensor::row_vector(vec![255.0, 0.0, 255.0, 0.0]))
        })
    }
}

/// Encoder that places sample `i` at `(points[2i], points[2i + 1])`.
fn encoder(points: Vec<f32>) -> Box<dyn InferenceSession> {
    Box::new(move |input: &Tensor| {
        Tensor::new(points.clone(), vec![input.rows(), 2])
            .map_err(|err| InferenceError::Runtime(err.to_string()))
    })
}

fn config() -> SessionConfig {
    SessionConfig {
        latent_scale: 0.5,
        image_width: 2,
        image_height: 2,
        ..SessionConfig::default()
    }
}

fn dataset() -> MemorySource {
    MemorySource::new()
        .with(
            "data/mnist_X.json",
            "[[0, 0, 0, 0], [1, 1, 1, 1], [0.5, 0.5, 0.5, 0.5]]",
        )
        .with("data/mnist_Y.json", "[0, 1, 2]")
}

struct Harness {
    controller: Controller,
    frames: SharedFrames,
    listeners: Listeners,
    decoder: DecoderProbe,
}

impl Harness {
    fn new() -> Self {
        Self {
            controller: Controller::new(config()),
            frames: SharedFrames::default(),
            listeners: Listeners::default(),
            decoder: DecoderProbe::default(),
        }
    }

    fn parts(&self, points: Vec<f32>) -> SessionParts<RefSurface, SharedFrames> {
        SessionParts {
            latent: RefSurface::new(Size::new(280.0, 280.0)),
            output: RefSurface::new(Size::new(2.0, 2.0)),
            reference: RefSurface::new(Size::new(2.0, 2.0)),
            frames: self.frames.clone(),
            encoder: encoder(points),
            decoder: self.decoder.session(),
            pointer: Box::new(self.listeners.clone()),
        }
    }

    fn start(&mut self, points: Vec<f32>, source: &MemorySource) -> Result<(), SetupError> {
        let parts = self.parts(points);
        self.controller.start(parts, source)
    }

    fn started() -> Self {
        let mut h = Self::new();
        h.start(vec![-1.0, -1.0, 1.0, 1.0, 0.0, 0.0], &dataset())
            .expect("setup succeeds");
        h
    }
}

fn mouse(x: f64, y: f64) -> PointerInput {
    PointerInput::Mouse {
        client: Point::new(x, y),
    }
}

#[test]
fn start_shows_one_point_per_sample() {
    let mut h = Harness::started();

    assert_eq!(h.controller.state(), SessionState::Ready);
    let points = h.controller.latent_points();
    assert_eq!(points.len(), 3);
    assert_eq!(points[1].position, Point::new(1.0, 1.0));
    assert_eq!(points[2].source_index, 2);
    assert_eq!(points[2].label, 2);
    assert_eq!(h.listeners.bound.get(), 1);

    // The loading indicator is gone once the points are in.
    let scene = h.controller.scene().expect("scene exists");
    assert_eq!(scene.len(), 3);
    assert!(scene.elements().all(|(_, e)| matches!(e, Element::Point(_))));

    assert_eq!(h.frames.fire(&mut h.controller), 1);
    let surface = h.controller.scene().expect("scene exists").surface();
    let circles = surface
        .draws()
        .filter(|(op, _)| matches!(op, DrawOp::FillCircle(_)))
        .count();
    assert_eq!(circles, 3);
}

#[test]
fn loading_indicator_spins_while_setup_is_suspended() {
    let mut h = Harness::new();
    let parts = h.parts(vec![-1.0, -1.0, 1.0, 1.0, 0.0, 0.0]);
    let pending = h.controller.begin_start(parts).expect("surface is invertible");

    assert_eq!(h.controller.state(), SessionState::LoadingDataset);
    assert!(!h.controller.on_pointer_move(&mouse(70.0, 70.0), CSS));
    assert_eq!(h.frames.fire(&mut h.controller), 1);
    assert_eq!(h.frames.fire(&mut h.controller), 1);

    let source = dataset();
    let samples = source.load_tensor("data/mnist_X.json");
    let labels = source.load_tensor("data/mnist_Y.json");
    let mut setup = h
        .controller
        .finish_loading(pending, samples, labels)
        .expect("dataset is consistent");
    assert_eq!(h.controller.state(), SessionState::EncodingDataset);
    assert_eq!(setup.samples().dims(), [3, 4]);
    assert_eq!(h.frames.fire(&mut h.controller), 1);
    assert_eq!(h.listeners.binds.get(), 0);

    let surface = h.controller.scene().expect("scene exists").surface();
    let rects: Vec<_> = surface
        .draws()
        .filter(|(op, _)| matches!(op, DrawOp::FillRect(_)))
        .map(|(_, state)| state.transform)
        .collect();
    assert_eq!(rects.len(), 3);
    assert_ne!(rects[0], rects[1]);
    assert_ne!(rects[1], rects[2]);

    let encoded = setup.encode();
    h.controller
        .finish_start(setup, encoded)
        .expect("encoding succeeds");
    assert_eq!(h.controller.state(), SessionState::Ready);
    assert_eq!(h.listeners.bound.get(), 1);

    h.controller
        .scene_mut()
        .expect("scene exists")
        .surface_mut()
        .clear_events();
    assert_eq!(h.frames.fire(&mut h.controller), 1);
    let surface = h.controller.scene().expect("scene exists").surface();
    assert!(
        !surface
            .draws()
            .any(|(op, _)| matches!(op, DrawOp::FillRect(_)))
    );
    assert!(h.controller.on_pointer_move(&mouse(70.0, 70.0), CSS));
}

#[test]
fn setup_steps_after_destroy_are_discarded() {
    let mut h = Harness::new();
    let parts = h.parts(vec![0.0; 6]);
    let pending = h.controller.begin_start(parts).expect("surface is invertible");

    h.controller.destroy();
    assert_eq!(h.frames.cancelled().len(), 1);

    let source = dataset();
    let err = h
        .controller
        .finish_loading(
            pending,
            source.load_tensor("data/mnist_X.json"),
            source.load_tensor("data/mnist_Y.json"),
        )
        .unwrap_err();
    assert!(matches!(err, SetupError::Superseded));
    assert_eq!(h.controller.state(), SessionState::Destroyed);
    assert_eq!(h.listeners.binds.get(), 0);
    assert_eq!(h.listeners.bound.get(), 0);
}

#[test]
fn restart_during_encoding_discards_the_old_setup() {
    let mut h = Harness::new();
    let parts = h.parts(vec![0.0; 6]);
    let pending = h.controller.begin_start(parts).expect("surface is invertible");
    let source = dataset();
    let mut stale = h
        .controller
        .finish_loading(
            pending,
            source.load_tensor("data/mnist_X.json"),
            source.load_tensor("data/mnist_Y.json"),
        )
        .expect("dataset is consistent");

    h.start(vec![-1.0, -1.0, 1.0, 1.0, 0.0, 0.0], &source)
        .expect("restart succeeds");

    let encoded = stale.encode();
    let err = h.controller.finish_start(stale, encoded).unwrap_err();
    assert!(matches!(err, SetupError::Superseded));
    assert_eq!(h.controller.state(), SessionState::Ready);
    assert_eq!(h.controller.latent_points()[0].position, Point::new(-1.0, -1.0));
    assert_eq!(h.listeners.bound.get(), 1);
}

#[test]
fn label_coloring_gives_each_class_its_own_fill() {
    let mut h = Harness::new();
    h.controller = Controller::new(SessionConfig {
        coloring: PointColoring::ByLabel,
        ..config()
    });
    h.start(vec![-1.0, -1.0, 1.0, 1.0, 0.0, 0.0], &dataset())
        .expect("setup succeeds");

    assert_eq!(h.frames.fire(&mut h.controller), 1);
    let surface = h.controller.scene().expect("scene exists").surface();
    let fills: Vec<_> = surface
        .draws()
        .filter(|(op, _)| matches!(op, DrawOp::FillCircle(_)))
        .map(|(_, state)| state.fill)
        .collect();

    assert_eq!(fills.len(), 3);
    assert_ne!(fills[0], fills[1]);
    assert_ne!(fills[1], fills[2]);
    assert_ne!(fills[0], fills[2]);
    for (fill, label) in fills.into_iter().zip([0, 1, 2]) {
        assert_eq!(fill, PointColoring::ByLabel.color(label));
    }
}

#[test]
fn pointer_decodes_mapped_position() {
    let mut h = Harness::started();

    assert!(h.controller.on_pointer_move(&mouse(0.0, 0.0), CSS));

    // Backing 280 on CSS 140 at scale 1/2: the top-left corner is (-2, -2).
    assert_eq!(*h.decoder.inputs.borrow(), [vec![-2.0, -2.0]]);
    let output = h
        .controller
        .output_surface()
        .and_then(RefSurface::last_image)
        .expect("reconstruction painted");
    assert_eq!(output.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(output.pixel(1, 0), Some([0, 0, 0, 255]));

    let nearest = h.controller.highlighted_point().expect("highlighted");
    assert_eq!(nearest.source_index, 0);
    let reference = h
        .controller
        .reference_surface()
        .and_then(RefSurface::last_image)
        .expect("sample painted");
    assert_eq!(reference.pixel(1, 1), Some([0, 0, 0, 255]));
}

#[test]
fn two_events_before_decode_resolves_run_one_decode() {
    let mut h = Harness::started();

    let request = h
        .controller
        .begin_decode(&mouse(70.0, 70.0), CSS)
        .expect("first event accepted");
    assert_eq!(h.controller.state(), SessionState::Decoding);
    assert!(h.controller.begin_decode(&mouse(10.0, 10.0), CSS).is_none());
    assert!(!h.controller.on_pointer_move(&mouse(20.0, 20.0), CSS));

    let result = h.controller.run_decode(&request);
    h.controller.finish_decode(request, result);

    assert_eq!(h.decoder.calls(), 1);
    assert_eq!(h.controller.state(), SessionState::Ready);
    assert_eq!(
        h.controller.highlighted_point().map(|p| p.source_index),
        Some(2)
    );
    assert!(h.controller.on_pointer_move(&mouse(140.0, 140.0), CSS));
    assert_eq!(h.decoder.calls(), 2);
}

#[test]
fn failed_decode_resets_guard_and_still_highlights() {
    let mut h = Harness::started();
    h.decoder.fail.set(true);

    assert!(h.controller.on_pointer_move(&mouse(140.0, 140.0), CSS));

    assert!(!h.controller.is_decoding());
    assert_eq!(h.controller.state(), SessionState::Ready);
    assert!(
        h.controller
            .output_surface()
            .and_then(RefSurface::last_image)
            .is_none()
    );
    assert_eq!(
        h.controller.highlighted_point().map(|p| p.source_index),
        Some(1)
    );
    let reference = h
        .controller
        .reference_surface()
        .and_then(RefSurface::last_image)
        .expect("sample painted");
    assert_eq!(reference.pixel(0, 0), Some([255, 255, 255, 255]));

    h.decoder.fail.set(false);
    assert!(h.controller.on_pointer_move(&mouse(0.0, 0.0), CSS));
}

#[test]
fn dropping_a_request_releases_the_guard() {
    let mut h = Harness::started();

    let request = h.controller.begin_decode(&mouse(0.0, 0.0), CSS);
    assert!(h.controller.is_decoding());
    drop(request);

    assert!(!h.controller.is_decoding());
    assert!(h.controller.begin_decode(&mouse(0.0, 0.0), CSS).is_some());
}

#[test]
fn highlight_marker_moves_instead_of_duplicating() {
    let mut h = Harness::started();

    h.controller.on_pointer_move(&mouse(0.0, 0.0), CSS);
    h.controller.on_pointer_move(&mouse(140.0, 140.0), CSS);

    let scene = h.controller.scene().expect("scene exists");
    assert_eq!(scene.len(), 4);
    let (_, last) = scene.elements().last().expect("highlight is last");
    let Element::Point(marker) = last else {
        panic!("highlight is a point marker");
    };
    assert_eq!(marker.position, Point::new(1.0, 1.0));
    assert_eq!(marker.radius, 10.0);
}

#[test]
fn nearest_point_ties_go_to_lowest_index() {
    let mut h = Harness::new();
    h.start(vec![1.0, 1.0, 1.0, 1.0, -1.0, -1.0], &dataset())
        .expect("setup succeeds");

    // Samples 0 and 1 share a position.
    h.controller.on_pointer_move(&mouse(140.0, 140.0), CSS);
    assert_eq!(
        h.controller.highlighted_point().map(|p| p.source_index),
        Some(0)
    );
}

#[test]
fn empty_touch_is_ignored() {
    let mut h = Harness::started();
    let touch = PointerInput::Touch { touches: vec![] };
    assert!(!h.controller.on_pointer_move(&touch, CSS));
    assert_eq!(h.decoder.calls(), 0);

    let touch = PointerInput::Touch {
        touches: vec![Point::new(0.0, 0.0)],
    };
    assert!(h.controller.on_pointer_move(&touch, CSS));
}

#[test]
fn unmappable_pointer_is_ignored() {
    let mut h = Harness::started();
    let collapsed = Rect::new(0.0, 0.0, 0.0, 0.0);
    assert!(!h.controller.on_pointer_move(&mouse(0.0, 0.0), collapsed));
    assert!(!h.controller.is_decoding());
}

#[test]
fn load_failure_leaves_nothing_bound() {
    let mut h = Harness::new();
    let source = MemorySource::new().with("data/mnist_X.json", "[[0, 0, 0, 0]]");

    let err = h.start(vec![0.0, 0.0], &source).unwrap_err();

    assert!(matches!(err, SetupError::Load(LoadError::Fetch { .. })));
    assert_eq!(h.controller.state(), SessionState::Uninitialized);
    assert_eq!(h.listeners.binds.get(), 0);
    assert!(h.controller.scene().is_none());
    assert!(h.frames.due().is_empty());
    assert_eq!(h.frames.cancelled().len(), 1);
    assert!(!h.controller.on_pointer_move(&mouse(0.0, 0.0), CSS));
}

#[test]
fn encoder_shape_and_label_mismatches_fail_setup() {
    let mut h = Harness::new();
    let err = h.start(vec![0.0; 3], &dataset()).unwrap_err();
    assert!(matches!(err, SetupError::Inference(_)));

    let source = dataset().with("data/mnist_Y.json", "[0, 1]");
    let err = h.start(vec![0.0; 6], &source).unwrap_err();
    assert!(matches!(
        err,
        SetupError::LabelCount {
            samples: 3,
            labels: 2
        }
    ));

    let source = dataset().with("data/mnist_X.json", "[[0, 0, 0], [1, 1, 1], [0, 0, 0]]");
    let err = h.start(vec![0.0; 6], &source).unwrap_err();
    assert!(matches!(
        err,
        SetupError::Load(LoadError::ShapeMismatch { .. })
    ));

    assert_eq!(h.listeners.binds.get(), 0);
    assert_eq!(h.controller.state(), SessionState::Uninitialized);
}

#[test]
fn restart_tears_down_previous_session() {
    let mut h = Harness::started();
    let first_listeners = h.listeners.clone();
    let first_frames = h.frames.clone();
    let first_pending = first_frames.due();
    let stale = h.controller.begin_decode(&mouse(0.0, 0.0), CSS);

    h.listeners = Listeners::default();
    h.frames = SharedFrames::default();
    h.start(vec![0.0, 0.0, 2.0, 2.0, -2.0, -2.0], &dataset())
        .expect("restart succeeds");

    assert_eq!(first_listeners.bound.get(), 0);
    assert_eq!(first_frames.cancelled(), first_pending);
    assert_eq!(h.listeners.bound.get(), 1);
    assert_eq!(h.controller.latent_points()[1].position, Point::new(2.0, 2.0));

    // A decode begun in the old session does not touch the new one.
    assert!(!h.controller.is_decoding());
    let stale = stale.expect("accepted before restart");
    h.controller.finish_decode(stale, Ok(Tensor::row_vector(vec![0.0; 4])));
    assert!(h.controller.highlighted_point().is_none());
}

#[test]
fn destroy_is_idempotent() {
    let mut h = Harness::started();
    let pending = h.frames.due();

    h.controller.destroy();
    h.controller.destroy();

    assert_eq!(h.controller.state(), SessionState::Destroyed);
    assert_eq!(h.listeners.bound.get(), 0);
    assert_eq!(h.frames.cancelled(), pending);
    assert!(h.frames.due().is_empty());
    assert!(!h.controller.on_pointer_move(&mouse(0.0, 0.0), CSS));
    assert!(h.controller.latent_points().is_empty());
}

#[test]
fn dropping_the_controller_unbinds_listeners() {
    let h = Harness::started();
    let listeners = h.listeners.clone();
    drop(h);
    assert_eq!(listeners.bound.get(), 0);
}
