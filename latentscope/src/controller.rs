// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use kurbo::{Point, Rect, Size};
use latentscope_dataset::{LoadError, Tensor};
use latentscope_imaging::{Color, ImageData, Surface, SurfaceExt};
use latentscope_scene::{Element, ElementId, FrameScheduler, PointMarker, RotatingRect, Scene};
use latentscope_view::{nearest_point, try_invert};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::SetupError;
use crate::inference::{InferenceError, InferenceSession};
use crate::source::DatasetSource;

const LOADING_INDICATOR_COLOR: Color = Color::from_rgb8(0x22, 0x22, 0x33);
const HIGHLIGHT_COLOR: Color = Color::BLACK;

/// Lifecycle of a [`LatentSpaceController`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been started, or the last start failed.
    Uninitialized,
    /// Dataset documents are being fetched.
    LoadingDataset,
    /// The encoder is mapping samples into latent space.
    EncodingDataset,
    /// Points are shown and pointer input is accepted.
    Ready,
    /// A decode request is outstanding.
    Decoding,
    /// The session was torn down with [`LatentSpaceController::destroy`].
    Destroyed,
}

/// One encoded dataset sample.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatentPoint {
    /// Position in latent (logical) coordinates.
    pub position: Point,
    /// Row of the sample in the dataset.
    pub source_index: usize,
    /// Class label of the sample.
    pub label: i64,
}

/// Pointer event delivered to the latent surface, in client coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerInput {
    /// Mouse move.
    Mouse {
        /// Pointer position.
        client: Point,
    },
    /// Touch move; only the first touch is used.
    Touch {
        /// Active touch positions.
        touches: Vec<Point>,
    },
}

impl PointerInput {
    /// Returns the position that drives decoding, if there is one.
    pub fn client(&self) -> Option<Point> {
        match self {
            Self::Mouse { client } => Some(*client),
            Self::Touch { touches } => touches.first().copied(),
        }
    }
}

/// Host hook that attaches and detaches the pointer listeners of the latent surface.
pub trait PointerBinding {
    /// Starts delivering pointer events to the controller.
    fn bind(&mut self);
    /// Stops delivering pointer events.
    fn unbind(&mut self);
}

/// Everything a session needs from its host.
pub struct SessionParts<S, F> {
    /// Surface showing the latent points.
    pub latent: S,
    /// Surface receiving decoded reconstructions.
    pub output: S,
    /// Surface receiving the nearest dataset sample.
    pub reference: S,
    /// Frame scheduler driving the latent scene.
    pub frames: F,
    /// Model mapping samples to latent positions.
    pub encoder: Box<dyn InferenceSession>,
    /// Model mapping a latent position to an image.
    pub decoder: Box<dyn InferenceSession>,
    /// Pointer listeners of the latent surface.
    pub pointer: Box<dyn PointerBinding>,
}

impl<S: fmt::Debug, F: fmt::Debug> fmt::Debug for SessionParts<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParts")
            .field("latent", &self.latent)
            .field("output", &self.output)
            .field("reference", &self.reference)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
struct InFlight(Rc<Cell<bool>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// An accepted pointer event waiting for its decoder output.
///
/// While a request exists, further pointer events are dropped. Dropping the
/// request, whether through [`LatentSpaceController::finish_decode`] or
/// otherwise, accepts pointer events again.
#[derive(Debug)]
pub struct DecodeRequest {
    position: Point,
    input: Tensor,
    guard: InFlight,
}

impl DecodeRequest {
    /// Pointer position in latent coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    /// The `[1, 2]` decoder input.
    pub fn input(&self) -> &Tensor {
        &self.input
    }
}

/// A session whose dataset is still being fetched.
///
/// Returned by [`LatentSpaceController::begin_start`]. The loading indicator
/// spins on the latent surface until the setup is finished or abandoned.
/// Dropping it leaves the indicator in place; a later
/// [`start`](LatentSpaceController::start) or
/// [`destroy`](LatentSpaceController::destroy) clears it.
#[must_use = "the session stays in `LoadingDataset` until the setup is finished"]
pub struct PendingSetup {
    encoder: Box<dyn InferenceSession>,
    token: Rc<Cell<bool>>,
}

impl fmt::Debug for PendingSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingSetup").finish_non_exhaustive()
    }
}

/// A session whose dataset is loaded and waits for the encoder.
#[must_use = "the session stays in `EncodingDataset` until the setup is finished"]
pub struct EncodeSetup {
    encoder: Box<dyn InferenceSession>,
    samples: Tensor,
    labels: Tensor,
    token: Rc<Cell<bool>>,
}

impl EncodeSetup {
    /// The `[N, width × height]` samples to encode.
    pub fn samples(&self) -> &Tensor {
        &self.samples
    }

    /// Runs the session encoder on the samples.
    pub fn encode(&mut self) -> Result<Tensor, InferenceError> {
        self.encoder.run(&self.samples)
    }
}

impl fmt::Debug for EncodeSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeSetup")
            .field("samples", &self.samples.dims())
            .field("labels", &self.labels.dims())
            .finish_non_exhaustive()
    }
}

struct Session<S: Surface, F: FrameScheduler> {
    scene: Scene<S, F>,
    output: S,
    reference: S,
    decoder: Box<dyn InferenceSession>,
    pointer: Box<dyn PointerBinding>,
    bound: bool,
    loading: Option<ElementId>,
    samples: Option<Tensor>,
    points: Vec<LatentPoint>,
    highlight: Option<ElementId>,
    highlighted: Option<usize>,
    /// Set while a decode is outstanding; its identity also marks setup
    /// steps and requests of this session.
    in_flight: Rc<Cell<bool>>,
}

impl<S: Surface, F: FrameScheduler> Session<S, F> {
    fn teardown(mut self) {
        if self.bound {
            self.pointer.unbind();
        }
        self.scene.destroy();
    }

    fn highlight_nearest(&mut self, position: Point, config: &SessionConfig) {
        let Some((index, _)) = nearest_point(self.points.iter().map(|p| p.position), position)
        else {
            return;
        };
        let Some(point) = self.points.get(index).copied() else {
            return;
        };
        self.highlighted = Some(index);

        match self
            .highlight
            .and_then(|id| self.scene.element_mut(id))
            .and_then(Element::as_point_mut)
        {
            Some(marker) => marker.position = point.position,
            None => {
                let marker =
                    PointMarker::new(point.position, config.highlight_radius, HIGHLIGHT_COLOR);
                self.highlight = Some(self.scene.add_element(marker));
            }
        }

        let Some(sample) = self
            .samples
            .as_ref()
            .and_then(|samples| samples.row(point.source_index))
        else {
            return;
        };
        match ImageData::from_gray(config.image_width, config.image_height, sample, 255.0) {
            Ok(image) => self.reference.put_image(image, Point::ORIGIN),
            Err(err) => warn!(%err, index, "sample does not fit the reference surface"),
        }
    }
}

/// Drives one interactive latent-space session.
///
/// [`start`](Self::start) loads the dataset, encodes it, and shows one point
/// per sample on the latent surface. Hosts that fetch or encode
/// asynchronously run the same setup in steps with
/// [`begin_start`](Self::begin_start), [`finish_loading`](Self::finish_loading)
/// and [`finish_start`](Self::finish_start), delivering frames in between so
/// the loading indicator animates. Each accepted pointer move then decodes
/// the pointer's latent position onto the output surface, highlights the
/// nearest sample, and paints that sample onto the reference surface.
///
/// At most one decode is outstanding; pointer events that arrive meanwhile
/// are dropped rather than queued. Hosts whose inference is asynchronous use
/// [`begin_decode`](Self::begin_decode) and
/// [`finish_decode`](Self::finish_decode) around their own call; synchronous
/// hosts use [`on_pointer_move`](Self::on_pointer_move).
pub struct LatentSpaceController<S: Surface, F: FrameScheduler> {
    config: SessionConfig,
    state: SessionState,
    session: Option<Session<S, F>>,
}

impl<S: Surface, F: FrameScheduler> fmt::Debug for LatentSpaceController<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatentSpaceController")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("points", &self.latent_points().len())
            .finish_non_exhaustive()
    }
}

impl<S: Surface, F: FrameScheduler> Default for LatentSpaceController<S, F> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<S: Surface, F: FrameScheduler> LatentSpaceController<S, F> {
    /// Creates an idle controller.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Uninitialized,
            session: None,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Ready if self.is_decoding() => SessionState::Decoding,
            state => state,
        }
    }

    /// Returns `true` while a [`DecodeRequest`] is outstanding.
    pub fn is_decoding(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.in_flight.get())
    }

    /// Encoded samples of the current session.
    pub fn latent_points(&self) -> &[LatentPoint] {
        self.session
            .as_ref()
            .map(|s| s.points.as_slice())
            .unwrap_or_default()
    }

    /// The sample most recently highlighted as nearest to the pointer.
    pub fn highlighted_point(&self) -> Option<&LatentPoint> {
        let session = self.session.as_ref()?;
        session.points.get(session.highlighted?)
    }

    /// The latent scene of the current session.
    pub fn scene(&self) -> Option<&Scene<S, F>> {
        self.session.as_ref().map(|s| &s.scene)
    }

    /// The latent scene of the current session, for frame delivery and resizing.
    pub fn scene_mut(&mut self) -> Option<&mut Scene<S, F>> {
        self.session.as_mut().map(|s| &mut s.scene)
    }

    /// The surface receiving reconstructions.
    pub fn output_surface(&self) -> Option<&S> {
        self.session.as_ref().map(|s| &s.output)
    }

    /// The surface receiving the nearest dataset sample.
    pub fn reference_surface(&self) -> Option<&S> {
        self.session.as_ref().map(|s| &s.reference)
    }

    /// Starts a session, tearing down any previous one first.
    ///
    /// Runs every setup step in one call. On failure everything built so
    /// far is torn down, the pointer listeners are never bound, and the
    /// controller returns to [`SessionState::Uninitialized`].
    pub fn start(
        &mut self,
        parts: SessionParts<S, F>,
        source: &dyn DatasetSource,
    ) -> Result<(), SetupError> {
        let pending = self.begin_start(parts)?;
        let samples = source.load_tensor(&self.config.samples_path);
        let labels = source.load_tensor(&self.config.labels_path);
        let mut setup = self.finish_loading(pending, samples, labels)?;
        let encoded = setup.encode();
        self.finish_start(setup, encoded)
    }

    /// Builds the latent scene and shows the loading indicator.
    ///
    /// Any previous session is torn down first. The controller enters
    /// [`SessionState::LoadingDataset`]; frames delivered from here on animate
    /// the indicator. The host fetches the dataset documents and hands them
    /// to [`finish_loading`](Self::finish_loading).
    pub fn begin_start(&mut self, parts: SessionParts<S, F>) -> Result<PendingSetup, SetupError> {
        if let Some(previous) = self.session.take() {
            debug!("tearing down previous session");
            previous.teardown();
        }

        let SessionParts {
            latent,
            output,
            reference,
            frames,
            encoder,
            decoder,
            pointer,
        } = parts;

        let mut scene = Scene::new(latent, frames, Some(self.config.latent_scale));
        if let Err(err) = try_invert(scene.view().device_transform()) {
            scene.destroy();
            return Err(self.abort_setup(err.into()));
        }
        let indicator = scene.add_element(
            RotatingRect::new(
                Point::ORIGIN,
                Size::new(
                    self.config.loading_indicator_size,
                    self.config.loading_indicator_size,
                ),
                LOADING_INDICATOR_COLOR,
            )
            .with_step(self.config.loading_indicator_step),
        );

        let token = Rc::new(Cell::new(false));
        self.session = Some(Session {
            scene,
            output,
            reference,
            decoder,
            pointer,
            bound: false,
            loading: Some(indicator),
            samples: None,
            points: Vec::new(),
            highlight: None,
            highlighted: None,
            in_flight: Rc::clone(&token),
        });
        self.transition(SessionState::LoadingDataset);
        Ok(PendingSetup { encoder, token })
    }

    /// Accepts the fetched dataset and moves on to encoding.
    ///
    /// `samples` must hold `width × height` values per row and `labels` one
    /// label per sample. The controller enters
    /// [`SessionState::EncodingDataset`]; the host runs
    /// [`EncodeSetup::encode`] and hands the result to
    /// [`finish_start`](Self::finish_start).
    pub fn finish_loading(
        &mut self,
        pending: PendingSetup,
        samples: Result<Tensor, LoadError>,
        labels: Result<Tensor, LoadError>,
    ) -> Result<EncodeSetup, SetupError> {
        self.check_setup(&pending.token, SessionState::LoadingDataset)?;
        match self.check_dataset(samples, labels) {
            Ok((samples, labels)) => {
                self.transition(SessionState::EncodingDataset);
                Ok(EncodeSetup {
                    encoder: pending.encoder,
                    samples,
                    labels,
                    token: pending.token,
                })
            }
            Err(err) => Err(self.abort_setup(err)),
        }
    }

    /// Replaces the loading indicator with one point per encoded sample.
    ///
    /// Binds the pointer listeners and enters [`SessionState::Ready`].
    pub fn finish_start(
        &mut self,
        setup: EncodeSetup,
        encoded: Result<Tensor, InferenceError>,
    ) -> Result<(), SetupError> {
        self.check_setup(&setup.token, SessionState::EncodingDataset)?;
        let points = match encoded
            .map_err(SetupError::from)
            .and_then(|latent| encoded_points(&latent, &setup.labels, setup.samples.rows()))
        {
            Ok(points) => points,
            Err(err) => return Err(self.abort_setup(err)),
        };

        let config = &self.config;
        let Some(session) = self.session.as_mut() else {
            return Err(SetupError::Superseded);
        };
        if let Some(indicator) = session.loading.take() {
            session.scene.remove_element(indicator);
        }
        for p in &points {
            session.scene.add_element(PointMarker::new(
                p.position,
                config.point_radius,
                config.coloring.color(p.label),
            ));
        }
        session.pointer.bind();
        session.bound = true;
        session.samples = Some(setup.samples);
        session.points = points;

        info!(points = session.points.len(), "latent space ready");
        self.transition(SessionState::Ready);
        Ok(())
    }

    fn check_setup(
        &self,
        token: &Rc<Cell<bool>>,
        expected: SessionState,
    ) -> Result<(), SetupError> {
        let current = self
            .session
            .as_ref()
            .is_some_and(|s| Rc::ptr_eq(token, &s.in_flight));
        if current && self.state == expected {
            Ok(())
        } else {
            debug!(state = ?self.state, "discarding setup step of a superseded session");
            Err(SetupError::Superseded)
        }
    }

    fn check_dataset(
        &self,
        samples: Result<Tensor, LoadError>,
        labels: Result<Tensor, LoadError>,
    ) -> Result<(Tensor, Tensor), SetupError> {
        let samples = samples?;
        let labels = labels?;
        let count = samples.rows();
        let expected = count * self.config.pixels_per_image();
        if samples.len() != expected {
            return Err(LoadError::ShapeMismatch {
                dims: samples.dims().to_vec(),
                expected,
                actual: samples.len(),
            }
            .into());
        }
        if labels.rows() != count {
            return Err(SetupError::LabelCount {
                samples: count,
                labels: labels.rows(),
            });
        }
        Ok((samples, labels))
    }

    fn abort_setup(&mut self, err: SetupError) -> SetupError {
        warn!(%err, "session setup failed");
        if let Some(session) = self.session.take() {
            session.teardown();
        }
        self.transition(SessionState::Uninitialized);
        err
    }

    /// Accepts a pointer move, returning the decode request to run.
    ///
    /// Returns `None` when no session is ready, a decode is already in
    /// flight, the event carries no position, or the position cannot be
    /// mapped into latent space.
    pub fn begin_decode(
        &mut self,
        pointer: &PointerInput,
        css_rect: Rect,
    ) -> Option<DecodeRequest> {
        let Some(session) = self.session.as_ref() else {
            trace!("pointer event without a session");
            return None;
        };
        if self.state != SessionState::Ready {
            trace!(state = ?self.state, "pointer event before the session is ready");
            return None;
        }
        if session.in_flight.get() {
            trace!("decode in flight, dropping pointer event");
            return None;
        }
        let Some(client) = pointer.client() else {
            trace!("touch event without touches");
            return None;
        };
        let position = match session.scene.pointer_to_logical(client, css_rect) {
            Ok(position) => position,
            Err(err) => {
                debug!(%err, "pointer position cannot be mapped");
                return None;
            }
        };

        session.in_flight.set(true);
        Some(DecodeRequest {
            position,
            input: Tensor::row_vector(vec![narrow(position.x), narrow(position.y)]),
            guard: InFlight(Rc::clone(&session.in_flight)),
        })
    }

    /// Runs the session decoder on a request's input.
    pub fn run_decode(&mut self, request: &DecodeRequest) -> Result<Tensor, InferenceError> {
        match self.session.as_mut() {
            Some(session) => session.decoder.run(request.input()),
            None => Err(InferenceError::Runtime("no active session".into())),
        }
    }

    /// Completes a decode and accepts pointer events again.
    ///
    /// A successful result is painted to the output surface; a failure is
    /// logged. Either way the nearest sample is highlighted and painted to
    /// the reference surface. Requests from an earlier session are discarded.
    pub fn finish_decode(
        &mut self,
        request: DecodeRequest,
        result: Result<Tensor, InferenceError>,
    ) {
        let config = &self.config;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !Rc::ptr_eq(&request.guard.0, &session.in_flight) {
            debug!("discarding decode from a previous session");
            return;
        }

        match result.and_then(|out| reconstruction(&out, config)) {
            Ok(image) => session.output.put_image(image, Point::ORIGIN),
            Err(err) => warn!(%err, "decode failed"),
        }
        session.highlight_nearest(request.position, config);
    }

    /// Decodes the latent position under the pointer in one step.
    ///
    /// Returns whether the event was accepted.
    pub fn on_pointer_move(&mut self, pointer: &PointerInput, css_rect: Rect) -> bool {
        let Some(request) = self.begin_decode(pointer, css_rect) else {
            return false;
        };
        let result = self.run_decode(&request);
        self.finish_decode(request, result);
        true
    }

    /// Unbinds pointer listeners and stops the frame loop.
    ///
    /// Calling this more than once has no further effect.
    pub fn destroy(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("destroying latent space session");
            session.teardown();
        }
        if self.state != SessionState::Destroyed {
            self.transition(SessionState::Destroyed);
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

impl<S: Surface, F: FrameScheduler> Drop for LatentSpaceController<S, F> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
    }
}

fn encoded_points(
    latent: &Tensor,
    labels: &Tensor,
    count: usize,
) -> Result<Vec<LatentPoint>, SetupError> {
    if latent.len() != count * 2 {
        return Err(InferenceError::OutputShape {
            expected: count * 2,
            actual: latent.len(),
        }
        .into());
    }
    Ok(latent
        .data()
        .chunks_exact(2)
        .enumerate()
        .map(|(i, xy)| LatentPoint {
            position: Point::new(f64::from(xy[0]), f64::from(xy[1])),
            source_index: i,
            label: labels
                .row(i)
                .and_then(|row| row.first())
                .map_or(0, |&l| label_of(l)),
        })
        .collect())
}

fn reconstruction(output: &Tensor, config: &SessionConfig) -> Result<ImageData, InferenceError> {
    let (width, height) = (config.image_width, config.image_height);
    let pixels = config.pixels_per_image();
    let image = if output.len() == pixels {
        ImageData::from_gray(width, height, output.data(), 1.0)
    } else if output.len() == pixels * 4 {
        ImageData::from_rgba_f32(width, height, output.data())
    } else {
        return Err(InferenceError::OutputShape {
            expected: pixels,
            actual: output.len(),
        });
    };
    image.map_err(|err| InferenceError::OutputShape {
        expected: err.expected,
        actual: err.actual,
    })
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Latent coordinates are fed to the decoder as f32."
)]
fn narrow(value: f64) -> f32 {
    value as f32
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Class labels are small integers stored as f32."
)]
fn label_of(value: f32) -> i64 {
    value.round() as i64
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::PointerInput;

    #[test]
    fn first_touch_drives_decoding() {
        let touch = PointerInput::Touch {
            touches: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
        };
        assert_eq!(touch.client(), Some(Point::new(1.0, 2.0)));
        assert_eq!(PointerInput::Touch { touches: vec![] }.client(), None);
        let mouse = PointerInput::Mouse {
            client: Point::new(5.0, 6.0),
        };
        assert_eq!(mouse.client(), Some(Point::new(5.0, 6.0)));
    }
}
