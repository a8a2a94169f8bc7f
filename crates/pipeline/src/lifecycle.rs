//! Session lifecycle: creation, parameter updates, stop/start, teardown.
//!
//! ```text
//! create ──▶ Active ◀──start──▶ Stopped
//!               │                  │
//!               └────── destroy ───┴──▶ Destroyed (terminal)
//! ```
//!
//! One session binds one playback source to one renderer and one overlay.
//! The session table is keyed by [`SourceId`], creation is idempotent per
//! source, and every transition is safe to repeat. The lifecycle never
//! decides validity itself; it trusts the [`SourceOracle`] it is handed.
//! Sources are held weakly, so a source freed by its host mid-flight turns
//! the next tick into a teardown instead of a dangling access.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crossbeam_channel::Receiver;
use presets::{EnhancementParameters, SettingsEvent};

use crate::error::CreateError;
use crate::overlay::{OverlayAnchor, OverlaySurface, SurfaceOverlay};
use crate::renderer::{FrameRenderer, RenderBackend};
use crate::source::{PlaybackSource, SourceId, SourceOracle};
use crate::tick::{CancelToken, FrameScheduler};

/// Per-session state. `Destroyed` is terminal; a destroyed source needs a
/// fresh `create` to be enhanced again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Rendering every tick.
    Active,
    /// Resources held, ticks ignored.
    Stopped,
    Destroyed,
}

/// Host-environment hook for conjuring the concrete GPU backend and overlay
/// surface a session needs. The production factory wraps a window or
/// compositor surface; tests substitute counting fakes.
pub trait PipelineFactory {
    type Backend: RenderBackend;

    fn create_backend(&mut self, size: (u32, u32)) -> Result<Self::Backend, CreateError>;

    fn create_overlay_surface(
        &mut self,
        anchor: &dyn OverlayAnchor,
    ) -> Result<Box<dyn OverlaySurface>, CreateError>;
}

struct SessionInner<B: RenderBackend> {
    renderer: FrameRenderer<B>,
    overlay: SurfaceOverlay,
    source: Weak<RefCell<dyn PlaybackSource>>,
    state: SessionState,
    token: CancelToken,
}

impl<B: RenderBackend> SessionInner<B> {
    fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.state = SessionState::Destroyed;
        self.token.cancel();
        self.renderer.release();
        self.overlay.detach();
    }
}

/// External view of one session. Holds no strong reference; a handle kept
/// past destruction simply reports `Destroyed`.
pub struct SessionHandle<B: RenderBackend> {
    id: SourceId,
    inner: Weak<RefCell<SessionInner<B>>>,
}

impl<B: RenderBackend> std::fmt::Debug for SessionHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<B: RenderBackend> SessionHandle<B> {
    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        match self.inner.upgrade() {
            Some(inner) => inner.borrow().state,
            None => SessionState::Destroyed,
        }
    }
}

/// Owns every live session and drives their shared tick.
pub struct ProcessorLifecycle<F: PipelineFactory> {
    factory: F,
    sessions: HashMap<SourceId, Rc<RefCell<SessionInner<F::Backend>>>>,
}

impl<F: PipelineFactory> ProcessorLifecycle<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sessions: HashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Builds a session for `source`, or returns the existing one — repeat
    /// creation for a source that already has a live session is a no-op.
    ///
    /// Construction is all-or-nothing: if the GPU backend cannot be built,
    /// the already-attached overlay is torn down again and no session entry
    /// is left behind.
    pub fn create(
        &mut self,
        source: &Rc<RefCell<dyn PlaybackSource>>,
        parameters: EnhancementParameters,
        oracle: &dyn SourceOracle,
    ) -> Result<SessionHandle<F::Backend>, CreateError> {
        let id = source.borrow().id();
        if let Some(existing) = self.sessions.get(&id) {
            tracing::debug!(source = %id, "session already exists; reusing");
            return Ok(SessionHandle {
                id,
                inner: Rc::downgrade(existing),
            });
        }

        {
            let guard = source.borrow();
            if oracle.is_protected(&*guard) {
                return Err(CreateError::Protected);
            }
            if !oracle.ready_for_processing(&*guard) {
                return Err(CreateError::NotReady);
            }
        }

        let size = source.borrow().intrinsic_size();
        let surface = {
            let guard = source.borrow();
            self.factory.create_overlay_surface(&*guard)?
        };
        let mut overlay = SurfaceOverlay::new(surface);
        overlay.attach(&mut *source.borrow_mut());

        let backend = match self.factory.create_backend(size) {
            Ok(backend) => backend,
            Err(err) => {
                overlay.detach();
                return Err(err);
            }
        };

        tracing::info!(source = %id, width = size.0, height = size.1, "session created");
        let inner = Rc::new(RefCell::new(SessionInner {
            renderer: FrameRenderer::new(backend, parameters),
            overlay,
            source: Rc::downgrade(source),
            state: SessionState::Active,
            token: CancelToken::new(),
        }));
        let handle = SessionHandle {
            id: id.clone(),
            inner: Rc::downgrade(&inner),
        };
        self.sessions.insert(id, inner);
        Ok(handle)
    }

    /// Replaces the parameter set on one session; takes effect next tick.
    pub fn set_parameters(&mut self, id: &SourceId, parameters: EnhancementParameters) {
        if let Some(session) = self.sessions.get(id) {
            session.borrow_mut().renderer.set_parameters(parameters);
        }
    }

    /// Replaces the parameter set on every session.
    pub fn set_all_parameters(&mut self, parameters: EnhancementParameters) {
        for session in self.sessions.values() {
            session.borrow_mut().renderer.set_parameters(parameters);
        }
    }

    /// Pauses rendering without dropping resources. Repeat stops are no-ops.
    pub fn stop(&mut self, id: &SourceId) {
        if let Some(session) = self.sessions.get(id) {
            let mut session = session.borrow_mut();
            if session.state == SessionState::Active {
                session.state = SessionState::Stopped;
            }
        }
    }

    /// Resumes a stopped session.
    pub fn start(&mut self, id: &SourceId) {
        if let Some(session) = self.sessions.get(id) {
            let mut session = session.borrow_mut();
            if session.state == SessionState::Stopped {
                session.state = SessionState::Active;
            }
        }
    }

    /// Tears the session down for good. Safe to repeat; destroying an
    /// unknown id does nothing.
    pub fn destroy(&mut self, id: &SourceId) {
        if let Some(session) = self.sessions.remove(id) {
            session.borrow_mut().destroy();
            tracing::info!(source = %id, "session destroyed");
        }
    }

    pub fn destroy_all(&mut self) {
        let ids: Vec<SourceId> = self.sessions.keys().cloned().collect();
        for id in ids {
            self.destroy(&id);
        }
    }

    /// Applies queued settings events in arrival order. Disabling tears down
    /// every session; re-enabling alone creates nothing — the host issues
    /// fresh `create` calls for the sources it still wants enhanced.
    pub fn pump_settings(&mut self, events: &Receiver<SettingsEvent>) {
        for event in events.try_iter().collect::<Vec<_>>() {
            match event {
                SettingsEvent::Parameters(parameters) => self.set_all_parameters(parameters),
                SettingsEvent::Enabled(false) => self.destroy_all(),
                SettingsEvent::Enabled(true) => {}
            }
        }
    }

    /// Runs one tick for every active session, then asks the scheduler for
    /// the next display-frame callback if any session remains active. A
    /// session whose source has vanished or whose draw failed is destroyed
    /// here; the others carry on.
    pub fn tick_all(&mut self, scheduler: &mut dyn FrameScheduler) {
        let ids: Vec<SourceId> = self.sessions.keys().cloned().collect();
        for id in ids {
            let Some(session) = self.sessions.get(&id).cloned() else {
                continue;
            };
            let mut inner = session.borrow_mut();
            if inner.token.is_cancelled() || inner.state != SessionState::Active {
                continue;
            }
            let Some(source) = inner.source.upgrade() else {
                drop(inner);
                tracing::debug!(source = %id, "source dropped by host; destroying session");
                self.destroy(&id);
                continue;
            };
            let mut source = source.borrow_mut();
            if !source.is_live() {
                drop(source);
                drop(inner);
                tracing::debug!(source = %id, "source no longer live; destroying session");
                self.destroy(&id);
                continue;
            }

            inner.overlay.sync(&*source);
            if let Err(err) = inner.renderer.render_once(&mut *source) {
                drop(source);
                drop(inner);
                tracing::warn!(source = %id, error = %err, "draw failed; destroying session");
                self.destroy(&id);
            }
        }

        let any_active = self
            .sessions
            .values()
            .any(|session| session.borrow().state == SessionState::Active);
        if any_active {
            scheduler.schedule();
        }
    }
}
