//! The frame-source capability interface.
//!
//! Anything that can hand the renderer decoded video frames implements
//! [`FrameSource`]. The interface is deliberately narrow: intrinsic
//! dimensions, a readiness predicate, and a pull-latest-frame operation.
//! There is no frame queue — `pull_frame` always yields the most recently
//! decoded frame and may be called redundantly.

use crate::overlay::OverlayAnchor;

/// Stable identifier for a playback source.
///
/// The lifecycle keys its session table on this value rather than on source
/// object identity, so sessions can be removed explicitly when a source goes
/// away.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Borrowed view of the latest decoded frame, tightly packed RGBA8 with a
/// top-left origin.
#[derive(Debug)]
pub struct FrameRef<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Capability reference to a live decodable video surface.
pub trait FrameSource {
    /// Stable identifier used as the session-table key.
    fn id(&self) -> SourceId;

    /// Current intrinsic pixel dimensions of the decoded stream.
    fn intrinsic_size(&self) -> (u32, u32);

    /// True once at least one decoded frame is available. A false return is
    /// a skip signal, never an error.
    fn is_ready(&self) -> bool;

    /// Yields the most recently decoded frame. Idempotent; no queueing.
    fn pull_frame(&mut self) -> Option<FrameRef<'_>>;

    /// False once the stream has ended or the source left the live document.
    fn is_live(&self) -> bool;
}

/// A playback element the pipeline can bind to: it decodes frames and has
/// on-screen geometry for the overlay to track.
pub trait PlaybackSource: FrameSource + OverlayAnchor {}

impl<T: FrameSource + OverlayAnchor + ?Sized> PlaybackSource for T {}

/// External validity determination, trusted by the lifecycle and never
/// re-derived by the core.
pub trait SourceOracle {
    /// Ready for processing: positive intrinsic dimensions, at least one
    /// decoded frame, currently visible.
    fn ready_for_processing(&self, source: &dyn PlaybackSource) -> bool;

    /// True for DRM-protected sources; the lifecycle never attaches to these.
    fn is_protected(&self, source: &dyn PlaybackSource) -> bool;
}

/// Oracle for hosts without DRM or visibility signals: processable as soon
/// as the source has decoded something, never protected.
pub struct TrustingOracle;

impl SourceOracle for TrustingOracle {
    fn ready_for_processing(&self, source: &dyn PlaybackSource) -> bool {
        let (width, height) = source.intrinsic_size();
        width > 0 && height > 0 && source.is_ready()
    }

    fn is_protected(&self, _source: &dyn PlaybackSource) -> bool {
        false
    }
}
