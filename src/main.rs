use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window, WindowId},
};

use mesh_preview::camera::OrbitCamera;
use mesh_preview::cli::Cli;
use mesh_preview::pointer::CursorStyle;
use mesh_preview::preview::{PreviewOrchestrator, PreviewPhase};
use mesh_preview::renderer::{OverlayResponse, OverlayStatus, Renderer};
use mesh_preview::surface::{FrameView, RenderSurface, SurfaceEvent};

const INITIAL_WINDOW_WIDTH: u32 = 900;
const INITIAL_WINDOW_HEIGHT: u32 = 700;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Adapter giving the orchestrator its render-surface capability: draws
/// through the wgpu renderer and maps cursor feedback onto the window.
struct ViewportSurface<'a> {
    renderer: &'a mut Renderer,
    window: &'a Window,
    camera: &'a OrbitCamera,
    status: OverlayStatus,
    response: OverlayResponse,
}

impl RenderSurface for ViewportSurface<'_> {
    fn draw(&mut self, frame: &FrameView) -> std::result::Result<(), Box<dyn std::error::Error>> {
        match self
            .renderer
            .render(frame, self.camera, self.window, &self.status)
        {
            Ok(response) => {
                self.response = response;
                Ok(())
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.reconfigure();
                Ok(())
            }
            Err(wgpu::SurfaceError::Timeout) => Ok(()),
            Err(error) => Err(Box::new(error)),
        }
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        let icon = match cursor {
            CursorStyle::Default => CursorIcon::Default,
            CursorStyle::Grab => CursorIcon::Grab,
            CursorStyle::Grabbing => CursorIcon::Grabbing,
        };
        self.window.set_cursor(icon.into());
    }
}

struct App {
    cli: Cli,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    preview: PreviewOrchestrator,
    camera: OrbitCamera,
    remove_requested: Rc<Cell<bool>>,
    cursor_inside: bool,
    orbit_dragging: bool,
    last_cursor_pos: Option<(f64, f64)>,
    last_frame_time: Instant,
}

impl App {
    fn new(cli: Cli) -> Result<Self> {
        let config = cli.preview_config()?;
        let mut preview = PreviewOrchestrator::new(config);

        // Stand-in for the hosting form: the two callbacks plus removal.
        preview.on_dimensions(|d| {
            log::info!(
                "dimensions: {:.0} x {:.0} x {:.0} mm",
                d.width,
                d.height,
                d.depth
            );
        });
        preview.on_error(|e| log::error!("{}", e));

        let remove_requested = Rc::new(Cell::new(false));
        let flag = remove_requested.clone();
        preview.on_remove(move || flag.set(true));

        if let Some(path) = &cli.model {
            let bytes = std::fs::read(path)
                .map_err(|e| format!("failed to read {:?}: {}", path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned());
            preview.set_file(name, bytes);
        }

        Ok(Self {
            cli,
            window: None,
            renderer: None,
            preview,
            camera: OrbitCamera::new(),
            remove_requested,
            cursor_inside: false,
            orbit_dragging: false,
            last_cursor_pos: None,
            last_frame_time: Instant::now(),
        })
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.preview.update(delta);

        // The removal affordance only signals; the "form" (this app) decides
        // to actually clear the slot.
        if self.remove_requested.replace(false) {
            log::info!("model removed from slot");
            self.preview.clear();
        }

        let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) else {
            return;
        };

        let status = OverlayStatus {
            file_name: self.preview.file_name().map(str::to_string),
            loading: self.preview.phase() == PreviewPhase::Loading,
            dimensions: self.preview.dimensions(),
            error: self.preview.last_error().map(|e| e.to_string()),
        };

        let mut surface = ViewportSurface {
            renderer,
            window: window.as_ref(),
            camera: &self.camera,
            status,
            response: OverlayResponse::default(),
        };
        self.preview.present(&mut surface);

        if surface.response.remove_clicked {
            self.preview.request_removal();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let title = match &self.cli.model {
                Some(path) => format!("Mesh Preview - {}", path.display()),
                None => "Mesh Preview".to_string(),
            };
            let window = match event_loop.create_window(
                Window::default_attributes()
                    .with_title(title)
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        INITIAL_WINDOW_WIDTH,
                        INITIAL_WINDOW_HEIGHT,
                    )),
            ) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            let renderer = match pollster::block_on(Renderer::new(window.clone())) {
                Ok(r) => r,
                Err(e) => {
                    log::error!("failed to initialize renderer: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            self.window = Some(window);
            self.renderer = Some(renderer);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Overlay gets first refusal on input
        if let (Some(renderer), Some(window)) = (&mut self.renderer, &self.window) {
            if renderer.handle_window_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size);
                }
            }
            WindowEvent::CursorEntered { .. } => {
                self.cursor_inside = true;
                self.preview.handle_surface_event(SurfaceEvent::PointerEntered);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_inside = false;
                self.last_cursor_pos = None;
                self.preview.handle_surface_event(SurfaceEvent::PointerLeft);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.orbit_dragging = true;
                    self.preview.handle_surface_event(SurfaceEvent::PointerPressed);
                    self.preview.handle_surface_event(SurfaceEvent::OrbitStarted);
                }
                ElementState::Released => {
                    self.orbit_dragging = false;
                    let release = if self.cursor_inside {
                        SurfaceEvent::PointerReleased
                    } else {
                        SurfaceEvent::GlobalPointerReleased
                    };
                    self.preview.handle_surface_event(release);
                    self.preview.handle_surface_event(SurfaceEvent::OrbitEnded);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_cursor_pos {
                    if self.orbit_dragging {
                        self.camera.orbit(
                            (position.x - last_x) as f32,
                            (position.y - last_y) as f32,
                        );
                    }
                }
                self.last_cursor_pos = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                self.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let event_loop = EventLoop::new()?;
    let mut app = App::new(cli)?;

    event_loop.run_app(&mut app)?;
    Ok(())
}
