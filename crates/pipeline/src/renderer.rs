//! The per-frame upload/draw cycle.
//!
//! `FrameRenderer` owns the tick contract; the GPU itself sits behind the
//! [`RenderBackend`] seam so the contract is testable without a device. One
//! tick is: lazily resize on dimension mismatch, skip (not fail) when the
//! source has nothing decoded yet, upload the latest frame into the reused
//! texture, then draw with the current parameters and elapsed time.
//! Rescheduling the next tick is the lifecycle's job.

use std::time::Instant;

use presets::EnhancementParameters;

use crate::error::DrawError;
use crate::source::FrameSource;
use crate::uniforms::ChainUniforms;

/// The resource operations a tick performs against the GPU.
///
/// The production implementation is [`crate::gpu::WgpuBackend`]; tests
/// substitute a counting fake. Implementations own their program, frame
/// texture, and output surface exclusively, and reuse the texture in place
/// across ticks — it is only reallocated when the frame size changes.
pub trait RenderBackend {
    /// Resizes the output surface and viewport. Called only on mismatch,
    /// never every tick.
    fn resize(&mut self, width: u32, height: u32);

    /// Uploads one frame of tightly packed RGBA8 into the reused texture.
    fn upload_frame(&mut self, pixels: &[u8], width: u32, height: u32);

    /// Binds uniforms and draws the full-screen quad, presenting the result.
    fn draw(&mut self, uniforms: &ChainUniforms) -> Result<(), DrawError>;

    /// Releases the program, texture, and surface. Later calls must be safe
    /// no-ops; the backend may outlive its session in an already-scheduled
    /// tick callback.
    fn release(&mut self);
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was uploaded and drawn.
    Rendered,
    /// The source had nothing for us; the loop continues undisturbed.
    Skipped,
}

/// Drives the upload/draw cycle for one session.
pub struct FrameRenderer<B: RenderBackend> {
    backend: B,
    parameters: EnhancementParameters,
    /// Surface size last pushed to the backend; starts unset so the first
    /// tick establishes it.
    surface_size: (u32, u32),
    started: Instant,
}

impl<B: RenderBackend> FrameRenderer<B> {
    pub fn new(backend: B, parameters: EnhancementParameters) -> Self {
        Self {
            backend,
            parameters,
            surface_size: (0, 0),
            started: Instant::now(),
        }
    }

    pub fn parameters(&self) -> EnhancementParameters {
        self.parameters
    }

    /// Wholesale replacement; the next tick picks it up. No GPU churn.
    pub fn set_parameters(&mut self, parameters: EnhancementParameters) {
        self.parameters = parameters.clamped();
    }

    /// Runs one tick against the source. Unready sources are skipped, not
    /// failed; a skip still counts as a completed tick and the caller
    /// reschedules as usual.
    pub fn render_once(&mut self, source: &mut dyn FrameSource) -> Result<TickOutcome, DrawError> {
        let (width, height) = source.intrinsic_size();
        if width == 0 || height == 0 {
            return Ok(TickOutcome::Skipped);
        }

        if (width, height) != self.surface_size {
            self.backend.resize(width, height);
            self.surface_size = (width, height);
            tracing::debug!(width, height, "resized output surface to source");
        }

        if !source.is_ready() {
            return Ok(TickOutcome::Skipped);
        }
        let Some(frame) = source.pull_frame() else {
            return Ok(TickOutcome::Skipped);
        };

        self.backend
            .upload_frame(frame.pixels, frame.width, frame.height);

        let elapsed = self.started.elapsed().as_secs_f32();
        let uniforms = ChainUniforms::new(self.surface_size, self.parameters, elapsed);
        self.backend.draw(&uniforms)?;
        Ok(TickOutcome::Rendered)
    }

    /// Forwards resource release to the backend.
    pub fn release(&mut self) {
        self.backend.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CountingBackend, Counters, ScriptedSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn renderer_with_counters() -> (FrameRenderer<CountingBackend>, Rc<RefCell<Counters>>) {
        let counters = Rc::new(RefCell::new(Counters::default()));
        let backend = CountingBackend::new(counters.clone());
        let renderer = FrameRenderer::new(backend, EnhancementParameters::new(0.5, 0.3, 0.15));
        (renderer, counters)
    }

    #[test]
    fn first_tick_resizes_uploads_and_draws_exactly_once() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 640, 360);

        let outcome = renderer.render_once(&mut source).unwrap();
        assert_eq!(outcome, TickOutcome::Rendered);

        let counters = counters.borrow();
        assert_eq!(counters.resizes, vec![(640, 360)]);
        assert_eq!(counters.uploads, 1);
        assert_eq!(counters.draws.len(), 1);
        assert_eq!(counters.draws[0].resolution, [640.0, 360.0]);
        assert_eq!(counters.draws[0].debanding, 0.5);
        assert_eq!(counters.draws[0].smoothing, 0.3);
        assert_eq!(counters.draws[0].sharpening, 0.15);
    }

    #[test]
    fn resize_happens_lazily_on_mismatch_only() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 640, 360);

        renderer.render_once(&mut source).unwrap();
        renderer.render_once(&mut source).unwrap();
        renderer.render_once(&mut source).unwrap();
        assert_eq!(counters.borrow().resizes.len(), 1);

        source.set_size(1280, 720);
        renderer.render_once(&mut source).unwrap();
        assert_eq!(counters.borrow().resizes, vec![(640, 360), (1280, 720)]);
    }

    #[test]
    fn unready_source_skips_draw_without_error() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 640, 360);
        source.set_ready(false);

        let outcome = renderer.render_once(&mut source).unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);
        let counters = counters.borrow();
        // Geometry is still established, but nothing is uploaded or drawn.
        assert_eq!(counters.resizes.len(), 1);
        assert_eq!(counters.uploads, 0);
        assert!(counters.draws.is_empty());
    }

    #[test]
    fn latest_parameter_replacement_wins() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 320, 240);

        renderer.set_parameters(EnhancementParameters::new(0.1, 0.1, 0.1));
        renderer.set_parameters(EnhancementParameters::new(0.9, 0.8, 0.7));
        renderer.render_once(&mut source).unwrap();

        let counters = counters.borrow();
        assert_eq!(counters.draws.len(), 1);
        assert_eq!(counters.draws[0].debanding, 0.9);
        assert_eq!(counters.draws[0].smoothing, 0.8);
        assert_eq!(counters.draws[0].sharpening, 0.7);
    }

    #[test]
    fn zero_sized_source_is_skipped_entirely() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 0, 0);
        let outcome = renderer.render_once(&mut source).unwrap();
        assert_eq!(outcome, TickOutcome::Skipped);
        assert!(counters.borrow().resizes.is_empty());
    }

    #[test]
    fn draw_time_is_monotonic() {
        let (mut renderer, counters) = renderer_with_counters();
        let mut source = ScriptedSource::new("s", 64, 64);
        renderer.render_once(&mut source).unwrap();
        renderer.render_once(&mut source).unwrap();
        let counters = counters.borrow();
        assert!(counters.draws[1].time >= counters.draws[0].time);
    }
}
