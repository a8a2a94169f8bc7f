//! Preview runtime: owns the window, the settings hub, and the event loop
//! that drives the enhancement pipeline once per display frame.
//!
//! Keys while the window is focused: `1`-`4` select the built-in presets
//! (off, light, medium, strong), `e` toggles enhancement globally. Toggling
//! off destroys every session; toggling back on re-creates one for the demo
//! source, mirroring how a host re-binds sources after a global re-enable.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;
use pipeline::{
    CreateError, FrameScheduler, OverlayAnchor, OverlaySurface, PipelineFactory, PlaybackSource,
    ProcessorLifecycle, Rect, TrustingOracle, WgpuBackend,
};
use presets::{EnhancementParameters, PresetLibrary, SettingsHub};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::{Window, WindowBuilder};

use crate::cli::{parse_surface_size, Cli};
use crate::sources::{ImageSource, TestPatternSource};

pub fn initialise_tracing() {
    let default_filter =
        "warn,vivify=info,pipeline=info,presets=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the preset library: an explicit `--config` path, else
/// `presets.toml` in the user config directory, else the built-ins.
pub fn load_library(config: Option<&Path>) -> Result<PresetLibrary> {
    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => default_library_path().filter(|path| path.is_file()),
    };
    let Some(path) = path else {
        return Ok(PresetLibrary::builtin());
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read preset library at {}", path.display()))?;
    let library = PresetLibrary::from_toml_str(&contents)
        .with_context(|| format!("failed to load preset library at {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded preset library");
    Ok(library)
}

fn default_library_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vivify").map(|dirs| dirs.config_dir().join("presets.toml"))
}

/// Starting parameters: the chosen (or default) preset with any per-stage
/// CLI overrides applied on top.
pub fn resolve_parameters(cli: &Cli, library: &PresetLibrary) -> Result<EnhancementParameters> {
    let preset = match &cli.preset {
        Some(name) => library
            .preset(name)
            .ok_or_else(|| anyhow!("unknown preset '{name}'"))?,
        None => library.default_preset(),
    };
    let mut parameters = preset.parameters;
    if let Some(debanding) = cli.debanding {
        parameters.debanding = debanding;
    }
    if let Some(smoothing) = cli.smoothing {
        parameters.smoothing = smoothing;
    }
    if let Some(sharpening) = cli.sharpening {
        parameters.sharpening = sharpening;
    }
    Ok(parameters.clamped())
}

/// The preview window acting as the overlay surface. A real host would hand
/// the pipeline a compositor subsurface; here the window itself is the
/// output, so geometry maps to the inner size and passthrough maps to
/// cursor hit-testing.
struct WindowOverlay {
    window: Arc<Window>,
}

impl OverlaySurface for WindowOverlay {
    fn set_rect(&mut self, rect: Rect) {
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(rect.width, rect.height));
    }

    fn set_input_passthrough(&mut self, passthrough: bool) {
        // Not every platform supports hit-test control; a refusal leaves the
        // preview interactive, which is harmless here.
        let _ = self.window.set_cursor_hittest(!passthrough);
    }

    fn set_visible(&mut self, visible: bool) {
        self.window.set_visible(visible);
    }

    fn detach(&mut self) {
        self.window.set_visible(false);
    }
}

/// Builds wgpu backends and overlay surfaces against the preview window.
struct WindowFactory {
    window: Arc<Window>,
}

impl PipelineFactory for WindowFactory {
    type Backend = WgpuBackend;

    fn create_backend(&mut self, size: (u32, u32)) -> Result<WgpuBackend, CreateError> {
        WgpuBackend::new(self.window.as_ref(), size)
    }

    fn create_overlay_surface(
        &mut self,
        _anchor: &dyn OverlayAnchor,
    ) -> Result<Box<dyn OverlaySurface>, CreateError> {
        Ok(Box::new(WindowOverlay {
            window: self.window.clone(),
        }))
    }
}

struct RedrawScheduler {
    window: Arc<Window>,
}

impl FrameScheduler for RedrawScheduler {
    fn schedule(&mut self) {
        self.window.request_redraw();
    }
}

fn bind_demo_source(
    lifecycle: &mut ProcessorLifecycle<WindowFactory>,
    source: &Rc<RefCell<dyn PlaybackSource>>,
    parameters: EnhancementParameters,
) {
    if let Err(err) = lifecycle.create(source, parameters, &TrustingOracle) {
        tracing::warn!(error = %err, "failed to create enhancement session");
    }
}

/// Renders the resolved library as JSON, one object per preset.
pub fn print_presets(library: &PresetLibrary) -> Result<()> {
    let presets: Vec<_> = library
        .names()
        .filter_map(|name| library.preset(name))
        .collect();
    let rendered =
        serde_json::to_string_pretty(&presets).context("failed to serialise preset library")?;
    println!("{rendered}");
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    let library = load_library(cli.config.as_deref())?;
    if cli.list_presets {
        return print_presets(&library);
    }
    let parameters = resolve_parameters(&cli, &library)?;

    let source: Rc<RefCell<dyn PlaybackSource>> = match &cli.image {
        Some(path) => Rc::new(RefCell::new(ImageSource::load(path)?)),
        None => {
            let (width, height) = match cli.size.as_deref() {
                Some(spec) => parse_surface_size(spec)?,
                None => (1280, 720),
            };
            Rc::new(RefCell::new(TestPatternSource::new(width, height)))
        }
    };
    let window_size = match cli.size.as_deref() {
        Some(spec) => parse_surface_size(spec)?,
        None => source.borrow().intrinsic_size(),
    };

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("Vivify Preview")
        .with_inner_size(PhysicalSize::new(window_size.0, window_size.1))
        .build(&event_loop)
        .context("failed to create preview window")?;
    let window = Arc::new(window);

    let mut hub = SettingsHub::new(parameters);
    let events = hub.subscribe();
    let mut lifecycle = ProcessorLifecycle::new(WindowFactory {
        window: window.clone(),
    });
    bind_demo_source(&mut lifecycle, &source, parameters);

    let mut scheduler = RedrawScheduler {
        window: window.clone(),
    };
    window.request_redraw();

    let loop_window = window.clone();
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == loop_window.id() => {
                    match event {
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            lifecycle.destroy_all();
                            elwt.exit();
                        }
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => {
                            handle_key(&logical_key, &mut hub, &library);
                            loop_window.request_redraw();
                        }
                        WindowEvent::RedrawRequested => {
                            lifecycle.pump_settings(&events);
                            if hub.is_enabled() && lifecycle.session_count() == 0 {
                                bind_demo_source(&mut lifecycle, &source, hub.parameters());
                            }
                            lifecycle.tick_all(&mut scheduler);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

fn handle_key(key: &Key, hub: &mut SettingsHub, library: &PresetLibrary) {
    let preset_name = match key.as_ref() {
        Key::Character("1") => Some("off"),
        Key::Character("2") => Some("light"),
        Key::Character("3") => Some("medium"),
        Key::Character("4") => Some("strong"),
        Key::Character("e") => {
            let enabled = !hub.is_enabled();
            tracing::info!(enabled, "toggled enhancement");
            hub.set_enabled(enabled);
            None
        }
        _ => None,
    };
    if let Some(name) = preset_name {
        if let Some(preset) = library.preset(name) {
            tracing::info!(preset = name, "selected preset");
            hub.replace_parameters(preset.parameters);
        }
    }
}
