//! Real-time video enhancement pipeline.
//!
//! Binds GPU post-processing to live playback sources: each source gets a
//! session that uploads its latest decoded frame every display tick, runs it
//! through the enhancement chain (debanding, then smoothing, then
//! sharpening), and presents the result on an overlay surface kept
//! registered over the source element.
//!
//! ```text
//! host tick ─▶ lifecycle ─▶ overlay sync ─▶ renderer ─▶ backend (wgpu)
//!                  │                            │
//!             session table                 chain.wgsl
//! ```
//!
//! The host environment supplies sources ([`FrameSource`]), an overlay
//! surface, and a [`PipelineFactory`]; everything GPU-shaped sits behind the
//! [`RenderBackend`] seam.

pub mod chain;
pub mod error;
pub mod gpu;
pub mod lifecycle;
pub mod overlay;
pub mod renderer;
pub mod source;
pub mod tick;
pub mod uniforms;

#[cfg(test)]
mod testutil;

pub use error::{CreateError, DrawError};
pub use gpu::{GpuContext, WgpuBackend};
pub use lifecycle::{PipelineFactory, ProcessorLifecycle, SessionHandle, SessionState};
pub use overlay::{OverlayAnchor, OverlaySurface, Rect, SurfaceOverlay};
pub use presets::EnhancementParameters;
pub use renderer::{FrameRenderer, RenderBackend, TickOutcome};
pub use source::{FrameRef, FrameSource, PlaybackSource, SourceId, SourceOracle, TrustingOracle};
pub use tick::{CancelToken, FrameScheduler};
pub use uniforms::ChainUniforms;
