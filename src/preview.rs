//! Composition root for a single preview slot.
//!
//! Owns the object-URL lifecycle of the current file, drives the
//! resolve → load → normalize pipeline, debounces the dimensions
//! notification and feeds the rotation and pointer controllers. Everything
//! here is instance state; two previews on the same page share nothing.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::task::noop_waker;
use serde::Deserialize;

use crate::error::PreviewError;
use crate::formats::MeshFormat;
use crate::handle::{AssetHandle, ObjectUrl, ObjectUrlRegistry};
use crate::loaders;
use crate::normalize::{normalize, Dimensions, NormalizeOutcome, NormalizedTransform};
use crate::pointer::{CursorStyle, PointerInteractionController};
use crate::rotation::RotationController;
use crate::scene::{fallback_scene, placeholder_scene, SceneNode};
use crate::surface::{FrameView, RenderSurface, SurfaceEvent};
use crate::timing::{Debounce, RetrySchedule, RetryTick};

/// Seconds between normalization attempts.
pub const RETRY_INTERVAL: f32 = 0.3;

/// Total normalization attempts before the timeout error fires.
pub const MAX_NORMALIZE_ATTEMPTS: u32 = 5;

/// Window collapsing rapid dimension notifications into one callback.
pub const DEBOUNCE_WINDOW: f32 = 0.1;

/// Spin applied to the loading placeholder, per frame.
pub const PLACEHOLDER_SPIN_STEP: f32 = 0.01;

/// Default viewport background (#f0f0f0).
pub const DEFAULT_BACKGROUND: [f32; 3] = [0.941, 0.941, 0.941];

/// Collaborator-supplied presentation knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub background: [f32; 3],
    /// Accent color applied to mesh materials; `None` keeps loaded
    /// materials (STL always gets the default grey).
    pub accent: Option<[f32; 3]>,
    pub show_grid: bool,
    pub show_axes: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            accent: None,
            show_grid: true,
            show_axes: true,
        }
    }
}

/// Where the pipeline currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPhase {
    /// No file selected.
    Empty,
    /// Load or normalization in flight; placeholder shown.
    Loading,
    /// Scene on screen (dimensions may still be withheld after a
    /// degenerate-geometry or timeout error).
    Ready,
    /// Terminal failure; fallback shown.
    Failed,
}

type LoadTask = Pin<Box<dyn Future<Output = anyhow::Result<SceneNode>>>>;

type DimensionsCallback = Box<dyn FnMut(Dimensions)>;
type ErrorCallback = Box<dyn FnMut(&PreviewError)>;
type RemoveCallback = Box<dyn FnMut()>;

pub struct PreviewOrchestrator {
    config: PreviewConfig,

    urls: ObjectUrlRegistry,
    handle: Option<AssetHandle>,
    url: Option<ObjectUrl>,

    phase: PreviewPhase,
    load: Option<LoadTask>,
    scene: Option<SceneNode>,
    normalized: Option<NormalizedTransform>,
    dimensions: Option<Dimensions>,
    last_error: Option<PreviewError>,

    retry: RetrySchedule,
    debounce: Debounce<Dimensions>,
    rotation: RotationController,
    pointer: PointerInteractionController,
    orbit_angle: f32,
    placeholder_angle: f32,

    placeholder: SceneNode,
    fallback: SceneNode,

    on_dimensions: Option<DimensionsCallback>,
    on_error: Option<ErrorCallback>,
    on_remove: Option<RemoveCallback>,
}

impl PreviewOrchestrator {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            urls: ObjectUrlRegistry::new(),
            handle: None,
            url: None,
            phase: PreviewPhase::Empty,
            load: None,
            scene: None,
            normalized: None,
            dimensions: None,
            last_error: None,
            retry: RetrySchedule::new(RETRY_INTERVAL, MAX_NORMALIZE_ATTEMPTS),
            debounce: Debounce::new(DEBOUNCE_WINDOW),
            rotation: RotationController::new(),
            pointer: PointerInteractionController::new(),
            orbit_angle: 0.0,
            placeholder_angle: 0.0,
            placeholder: placeholder_scene(),
            fallback: fallback_scene(),
            on_dimensions: None,
            on_error: None,
            on_remove: None,
        }
    }

    pub fn on_dimensions(&mut self, callback: impl FnMut(Dimensions) + 'static) {
        self.on_dimensions = Some(Box::new(callback));
    }

    pub fn on_error(&mut self, callback: impl FnMut(&PreviewError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    pub fn on_remove(&mut self, callback: impl FnMut() + 'static) {
        self.on_remove = Some(Box::new(callback));
    }

    pub fn phase(&self) -> PreviewPhase {
        self.phase
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn normalized(&self) -> Option<NormalizedTransform> {
        self.normalized
    }

    pub fn last_error(&self) -> Option<&PreviewError> {
        self.last_error.as_ref()
    }

    pub fn cursor(&self) -> CursorStyle {
        self.pointer.effective_cursor()
    }

    pub fn is_dragging(&self) -> bool {
        self.pointer.is_dragging()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.name.as_str())
    }

    /// Object-URL accounting, exposed for the hosting form and for tests.
    pub fn url_registry(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    /// Select a new file, replacing whatever was previewed before. The
    /// previous file's retries, debounce and object URL are cancelled and
    /// revoked synchronously before the new pipeline starts.
    pub fn set_file(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.teardown_current();

        let handle = AssetHandle::new(name, bytes);
        let url = self.urls.create(&handle);
        log::info!("previewing {} as {}", handle.name, url.url());

        match MeshFormat::from_extension(&handle.extension) {
            Some(format) => {
                let bytes = url.bytes().clone();
                let accent = self.config.accent;
                self.load = Some(Box::pin(async move {
                    loaders::load_scene(&bytes, format, accent).await
                }));
                self.phase = PreviewPhase::Loading;
            }
            None => {
                let extension = handle.extension.clone();
                self.fail(PreviewError::UnsupportedFormat { extension });
            }
        }

        self.handle = Some(handle);
        self.url = Some(url);
    }

    /// Drop the current file and return to the empty state.
    pub fn clear(&mut self) {
        self.teardown_current();
        self.phase = PreviewPhase::Empty;
    }

    /// The removal affordance: tells the hosting form to discard this slot.
    /// Nothing is deleted here; the form owns the actual file list.
    pub fn request_removal(&mut self) {
        if let Some(callback) = &mut self.on_remove {
            callback();
        }
    }

    /// Surface input: pointer events drive cursor feedback, orbit events
    /// additionally pause/resume the auto-rotation.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::PointerEntered => self.pointer.surface_entered(),
            SurfaceEvent::PointerLeft => self.pointer.surface_left(),
            SurfaceEvent::PointerPressed => self.pointer.pressed(),
            SurfaceEvent::PointerReleased | SurfaceEvent::GlobalPointerReleased => {
                self.pointer.released()
            }
            SurfaceEvent::OrbitStarted => {
                self.pointer.orbit_started();
                self.rotation.interaction_started();
            }
            SurfaceEvent::OrbitEnded => {
                self.pointer.orbit_ended();
                self.rotation.interaction_ended();
            }
        }
    }

    /// Safety net for failures the surface could not handle itself (lost
    /// device, panicking shader translation, ...). Treated as a load
    /// failure: fallback shown, error callback fired.
    pub fn report_runtime_error(&mut self, message: impl Into<String>) {
        self.fail(PreviewError::RuntimeRender(message.into()));
    }

    /// Advance the pipeline by one frame.
    pub fn update(&mut self, delta: f32) {
        self.poll_load();
        self.tick_retry(delta);

        if let Some(dimensions) = self.debounce.tick(delta) {
            if let Some(callback) = &mut self.on_dimensions {
                callback(dimensions);
            }
        }

        self.orbit_angle += self.rotation.tick(delta);
        if self.phase == PreviewPhase::Loading {
            self.placeholder_angle += PLACEHOLDER_SPIN_STEP;
        }
    }

    /// Push cursor feedback and the current frame to a render surface.
    pub fn present(&mut self, surface: &mut dyn RenderSurface) {
        surface.set_cursor(self.cursor());
        let result = surface.draw(&self.frame());
        if let Err(error) = result {
            self.report_runtime_error(error.to_string());
        }
    }

    /// What the surface should draw right now.
    pub fn frame(&self) -> FrameView<'_> {
        let (scene, orbit_angle, orbit_scale) = match self.phase {
            PreviewPhase::Empty => (None, 0.0, 1.0),
            PreviewPhase::Loading => (Some(&self.placeholder), self.placeholder_angle, 1.0),
            PreviewPhase::Failed => (Some(&self.fallback), 0.0, 1.0),
            PreviewPhase::Ready => (
                self.scene.as_ref(),
                self.orbit_angle,
                self.normalized.map(|n| n.uniform_scale).unwrap_or(1.0),
            ),
        };
        FrameView {
            scene,
            orbit_angle,
            orbit_scale,
            background: self.config.background,
            show_grid: self.config.show_grid,
            show_axes: self.config.show_axes,
        }
    }

    fn poll_load(&mut self) {
        let Some(task) = &mut self.load else {
            return;
        };
        let waker = noop_waker();
        let mut context = Context::from_waker(&waker);
        match task.as_mut().poll(&mut context) {
            Poll::Pending => {}
            Poll::Ready(Ok(scene)) => {
                self.load = None;
                self.scene = Some(scene);
                // Geometry may attach late; measure on the retry schedule
                // rather than immediately.
                self.retry.start();
            }
            Poll::Ready(Err(error)) => {
                self.load = None;
                self.fail(PreviewError::LoadFailure(error));
            }
        }
    }

    fn tick_retry(&mut self, delta: f32) {
        if self.retry.tick(delta) != RetryTick::Attempt {
            return;
        }
        let Some(scene) = &mut self.scene else {
            return;
        };
        match normalize(scene) {
            Ok(NormalizeOutcome::Ready {
                transform,
                dimensions,
            }) => {
                self.retry.stop();
                self.normalized = Some(transform);
                self.dimensions = Some(dimensions);
                self.phase = PreviewPhase::Ready;
                self.debounce.queue(dimensions);
            }
            Ok(NormalizeOutcome::NotReady) => {
                if self.retry.is_exhausted() {
                    self.fail(PreviewError::NormalizationTimeout);
                }
            }
            Err(error) => {
                self.retry.stop();
                self.fail(error);
            }
        }
    }

    fn fail(&mut self, error: PreviewError) {
        log::error!("preview failed: {}", error);

        self.load = None;
        self.retry.stop();
        if error.replaces_scene() {
            self.scene = None;
            self.normalized = None;
            self.phase = PreviewPhase::Failed;
        } else if self.scene.is_some() {
            // Model stays on screen; only the measurement is withheld.
            self.phase = PreviewPhase::Ready;
        } else {
            self.phase = PreviewPhase::Failed;
        }

        if let Some(callback) = &mut self.on_error {
            callback(&error);
        }
        self.last_error = Some(error);
    }

    /// Synchronous cancellation of everything owned by the current file:
    /// load task, retry schedule, pending debounce, resume timer, scene and
    /// object URL. Idempotent.
    fn teardown_current(&mut self) {
        self.load = None;
        self.retry.stop();
        self.debounce.cancel();
        self.rotation.reset();

        self.scene = None;
        self.normalized = None;
        self.dimensions = None;
        self.last_error = None;
        self.orbit_angle = 0.0;
        self.placeholder_angle = 0.0;

        self.handle = None;
        if let Some(url) = self.url.take() {
            self.urls.revoke(&url);
        }
    }
}

impl Drop for PreviewOrchestrator {
    fn drop(&mut self) {
        self.teardown_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::MockSurface;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cube_stl_bytes() -> Vec<u8> {
        crate::loaders::stl::binary_stl_fixture(&[
            [
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
            ],
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
        ])
    }

    /// Run enough frames for load + first normalization attempt + debounce.
    fn settle(preview: &mut PreviewOrchestrator) {
        for _ in 0..40 {
            preview.update(0.05);
        }
    }

    #[test]
    fn test_stl_pipeline_reports_dimensions() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let reported: Rc<RefCell<Vec<Dimensions>>> = Rc::default();
        let sink = reported.clone();
        preview.on_dimensions(move |d| sink.borrow_mut().push(d));

        preview.set_file("cube.stl", cube_stl_bytes());
        assert_eq!(preview.phase(), PreviewPhase::Loading);

        settle(&mut preview);

        assert_eq!(preview.phase(), PreviewPhase::Ready);
        let reported = reported.borrow();
        assert_eq!(reported.len(), 1);
        assert!((reported[0].width - 2000.0).abs() < 1e-2);
        assert!((reported[0].height - 2000.0).abs() < 1e-2);
        assert!((reported[0].depth - 2000.0).abs() < 1e-2);
    }

    #[test]
    fn test_unsupported_extension_never_loads() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = errors.clone();
        preview.on_error(move |e| sink.borrow_mut().push(e.to_string()));

        preview.set_file("model.xyz", vec![1, 2, 3]);

        assert_eq!(preview.phase(), PreviewPhase::Failed);
        assert!(preview.load.is_none());
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("xyz"));

        // Fallback box is what gets drawn
        let frame = preview.frame();
        assert_eq!(frame.scene.map(SceneNode::mesh_count), Some(1));
    }

    #[test]
    fn test_load_failure_renders_fallback() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = errors.clone();
        preview.on_error(move |e| sink.borrow_mut().push(e.to_string()));

        preview.set_file("broken.stl", b"not an stl".to_vec());
        settle(&mut preview);

        assert_eq!(preview.phase(), PreviewPhase::Failed);
        assert_eq!(errors.borrow().len(), 1);
        assert!(preview.dimensions().is_none());
    }

    #[test]
    fn test_replacement_revokes_previous_url_once() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());

        preview.set_file("first.stl", cube_stl_bytes());
        assert_eq!(preview.url_registry().live_count(), 1);

        preview.set_file("second.stl", cube_stl_bytes());
        assert_eq!(preview.url_registry().live_count(), 1);
        assert_eq!(preview.url_registry().revoked_count(), 1);
        assert_eq!(preview.url_registry().double_revocations(), 0);

        preview.clear();
        assert_eq!(preview.url_registry().live_count(), 0);
        assert_eq!(preview.url_registry().revoked_count(), 2);
        assert_eq!(preview.url_registry().double_revocations(), 0);
    }

    #[test]
    fn test_replacement_cancels_pending_retries() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        preview.set_file("first.stl", cube_stl_bytes());
        preview.update(0.05); // load completes, retry schedule armed
        assert!(preview.retry.is_active());

        preview.set_file("second.stl", cube_stl_bytes());
        // The new file's schedule starts only after its own load poll
        assert!(!preview.retry.is_active());
        settle(&mut preview);
        assert_eq!(preview.phase(), PreviewPhase::Ready);
    }

    #[test]
    fn test_debounce_collapses_rapid_completions() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let reported: Rc<RefCell<Vec<Dimensions>>> = Rc::default();
        let sink = reported.clone();
        preview.on_dimensions(move |d| sink.borrow_mut().push(d));

        preview.set_file("cube.stl", cube_stl_bytes());
        preview.update(0.05); // load
        preview.update(0.3); // first attempt succeeds, queues dimensions

        // Replace within the debounce window; old pending value is dropped
        preview.set_file("cube2.stl", cube_stl_bytes());
        settle(&mut preview);

        assert_eq!(reported.borrow().len(), 1);
    }

    #[test]
    fn test_runtime_error_from_surface_is_terminal() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = errors.clone();
        preview.on_error(move |e| sink.borrow_mut().push(e.to_string()));

        preview.set_file("cube.stl", cube_stl_bytes());
        settle(&mut preview);

        let mut surface = MockSurface::failing();
        preview.present(&mut surface);

        assert_eq!(preview.phase(), PreviewPhase::Failed);
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("device loss"));
    }

    #[test]
    fn test_present_pushes_cursor_and_frame() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        preview.set_file("cube.stl", cube_stl_bytes());
        settle(&mut preview);

        preview.handle_surface_event(SurfaceEvent::PointerPressed);
        let mut surface = MockSurface::new();
        preview.present(&mut surface);

        assert_eq!(surface.draw_call_count(), 1);
        assert_eq!(surface.last_cursor(), Some(CursorStyle::Grabbing));
    }

    #[test]
    fn test_orbit_events_pause_and_resume_rotation() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        preview.set_file("cube.stl", cube_stl_bytes());
        settle(&mut preview);

        let angle_before = preview.frame().orbit_angle;
        preview.handle_surface_event(SurfaceEvent::OrbitStarted);
        preview.update(0.016);
        assert_eq!(preview.frame().orbit_angle, angle_before);

        preview.handle_surface_event(SurfaceEvent::OrbitEnded);
        preview.update(3.0); // resume fires
        preview.update(0.016);
        assert!(preview.frame().orbit_angle > angle_before);
    }

    #[test]
    fn test_normalization_timeout_surfaces_error() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let reported: Rc<RefCell<Vec<Dimensions>>> = Rc::default();
        let error_sink = errors.clone();
        let dims_sink = reported.clone();
        preview.on_error(move |e| error_sink.borrow_mut().push(e.to_string()));
        preview.on_dimensions(move |d| dims_sink.borrow_mut().push(d));

        // Simulate a load whose geometry never attaches to the graph
        preview.phase = PreviewPhase::Loading;
        preview.scene = Some(SceneNode::group("detached"));
        preview.retry.start();

        // Plenty of frames for all five attempts at 300ms intervals
        for _ in 0..60 {
            preview.update(0.1);
        }

        assert!(reported.borrow().is_empty());
        assert_eq!(errors.borrow().len(), 1);
        assert!(matches!(
            preview.last_error(),
            Some(PreviewError::NormalizationTimeout)
        ));
        assert!(preview.dimensions().is_none());
    }

    #[test]
    fn test_degenerate_geometry_withholds_dimensions() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let errors: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = errors.clone();
        preview.on_error(move |e| sink.borrow_mut().push(e.to_string()));

        // A scene whose bounds collapse to a single point
        let mesh = crate::scene::Mesh::new(
            vec![Vec3::splat(2.0); 3],
            vec![Vec3::Y; 3],
            vec![0, 1, 2],
        );
        preview.phase = PreviewPhase::Loading;
        preview.scene = Some(SceneNode::leaf("point", mesh));
        preview.retry.start();

        for _ in 0..10 {
            preview.update(0.1);
        }

        assert_eq!(errors.borrow().len(), 1);
        assert!(matches!(
            preview.last_error(),
            Some(PreviewError::DegenerateGeometry)
        ));
        // Model stays on screen, but no dimensions are published
        assert_eq!(preview.phase(), PreviewPhase::Ready);
        assert!(preview.dimensions().is_none());
    }

    #[test]
    fn test_removal_signals_collaborator_only() {
        let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
        let removed: Rc<RefCell<u32>> = Rc::default();
        let sink = removed.clone();
        preview.on_remove(move || *sink.borrow_mut() += 1);

        preview.set_file("cube.stl", cube_stl_bytes());
        preview.request_removal();

        assert_eq!(*removed.borrow(), 1);
        // The preview itself keeps its state until the form clears it
        assert!(preview.file_name().is_some());
    }
}
