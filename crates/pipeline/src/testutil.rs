//! Shared fakes for exercising the tick and lifecycle contracts without a
//! GPU or a host compositor.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{CreateError, DrawError};
use crate::lifecycle::PipelineFactory;
use crate::overlay::{OverlayAnchor, OverlaySurface, Rect};
use crate::renderer::RenderBackend;
use crate::source::{FrameRef, FrameSource, SourceId};
use crate::tick::FrameScheduler;
use crate::uniforms::ChainUniforms;

/// Everything a backend was asked to do, in order where it matters.
#[derive(Default)]
pub struct Counters {
    pub resizes: Vec<(u32, u32)>,
    pub uploads: u32,
    pub draws: Vec<ChainUniforms>,
    pub releases: u32,
}

/// Backend that records calls into shared counters instead of touching a
/// device.
pub struct CountingBackend {
    counters: Rc<RefCell<Counters>>,
    pub fail_draws: bool,
}

impl CountingBackend {
    pub fn new(counters: Rc<RefCell<Counters>>) -> Self {
        Self {
            counters,
            fail_draws: false,
        }
    }
}

impl RenderBackend for CountingBackend {
    fn resize(&mut self, width: u32, height: u32) {
        self.counters.borrow_mut().resizes.push((width, height));
    }

    fn upload_frame(&mut self, _pixels: &[u8], _width: u32, _height: u32) {
        self.counters.borrow_mut().uploads += 1;
    }

    fn draw(&mut self, uniforms: &ChainUniforms) -> Result<(), DrawError> {
        if self.fail_draws {
            return Err(DrawError::Gpu("scripted draw failure".into()));
        }
        self.counters.borrow_mut().draws.push(*uniforms);
        Ok(())
    }

    fn release(&mut self) {
        self.counters.borrow_mut().releases += 1;
    }
}

/// Source whose readiness, liveness, size, and geometry the test scripts.
pub struct ScriptedSource {
    id: SourceId,
    width: u32,
    height: u32,
    ready: bool,
    live: bool,
    rect: Rect,
    has_context: bool,
    pub contexts_established: u32,
    pixels: Vec<u8>,
}

impl ScriptedSource {
    pub fn new(id: &str, width: u32, height: u32) -> Self {
        Self {
            id: SourceId::new(id),
            width,
            height,
            ready: true,
            live: true,
            rect: Rect::new(0, 0, width, height),
            has_context: false,
            contexts_established: 0,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0u8; width as usize * height as usize * 4];
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }
}

impl FrameSource for ScriptedSource {
    fn id(&self) -> SourceId {
        self.id.clone()
    }

    fn intrinsic_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn pull_frame(&mut self) -> Option<FrameRef<'_>> {
        if !self.ready {
            return None;
        }
        Some(FrameRef {
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        })
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

impl OverlayAnchor for ScriptedSource {
    fn display_rect(&self) -> Rect {
        self.rect
    }

    fn has_positioning_context(&self) -> bool {
        self.has_context
    }

    fn establish_positioning_context(&mut self) {
        self.has_context = true;
        self.contexts_established += 1;
    }
}

/// Overlay surface that only tracks whether it is still attached.
pub struct NullSurface {
    pub detached: Rc<RefCell<u32>>,
}

impl OverlaySurface for NullSurface {
    fn set_rect(&mut self, _rect: Rect) {}
    fn set_input_passthrough(&mut self, _passthrough: bool) {}
    fn set_visible(&mut self, _visible: bool) {}
    fn detach(&mut self) {
        *self.detached.borrow_mut() += 1;
    }
}

/// Factory handing out counting backends, with scriptable failure modes.
#[derive(Default)]
pub struct CountingFactory {
    pub counters: Rc<RefCell<Counters>>,
    pub backends_created: Rc<RefCell<u32>>,
    pub surfaces_created: Rc<RefCell<u32>>,
    pub surfaces_detached: Rc<RefCell<u32>>,
    pub fail_backend: bool,
    /// Backends created for exactly this size fail every draw.
    pub fail_draws_for_size: Option<(u32, u32)>,
}

impl PipelineFactory for CountingFactory {
    type Backend = CountingBackend;

    fn create_backend(&mut self, size: (u32, u32)) -> Result<CountingBackend, CreateError> {
        if self.fail_backend {
            return Err(CreateError::Unsupported("scripted backend failure".into()));
        }
        *self.backends_created.borrow_mut() += 1;
        let mut backend = CountingBackend::new(self.counters.clone());
        backend.fail_draws = self.fail_draws_for_size == Some(size);
        Ok(backend)
    }

    fn create_overlay_surface(
        &mut self,
        _anchor: &dyn OverlayAnchor,
    ) -> Result<Box<dyn OverlaySurface>, CreateError> {
        *self.surfaces_created.borrow_mut() += 1;
        Ok(Box::new(NullSurface {
            detached: self.surfaces_detached.clone(),
        }))
    }
}

/// Scheduler that just counts how often the loop asked for another tick.
#[derive(Default)]
pub struct RecordingScheduler {
    pub requests: u32,
}

impl FrameScheduler for RecordingScheduler {
    fn schedule(&mut self) {
        self.requests += 1;
    }
}
