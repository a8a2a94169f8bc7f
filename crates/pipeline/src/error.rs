//! Error taxonomy for session construction and per-tick drawing.
//!
//! Every failure is local to a single session. Construction errors are fatal
//! to that session only and are never retried automatically; the caller must
//! issue a fresh `create` (for example after the user re-enables
//! enhancement). Transient frame unavailability is not an error at all and
//! never appears here.

/// Fatal errors raised while building a processing session.
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// No usable GPU context could be acquired. The source stays unenhanced.
    #[error("no usable GPU context: {0}")]
    Unsupported(String),
    /// The shader chain failed to compile or link. No partial program is
    /// left bound.
    #[error("shader chain failed to build: {0}")]
    ShaderBuild(String),
    /// The source is DRM-protected; a session must never attach.
    #[error("source is protected; refusing to attach")]
    Protected,
    /// The source did not satisfy the validity oracle.
    #[error("source is not ready for processing")]
    NotReady,
    /// The overlay surface could not be created or attached.
    #[error("overlay surface unavailable: {0}")]
    Overlay(String),
}

/// Errors surfaced by a backend draw. Recoverable surface hiccups (lost,
/// outdated, timeout) are absorbed by the backend itself; anything that
/// reaches the caller destroys the session.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("GPU surface is out of memory")]
    OutOfMemory,
    #[error("GPU error: {0}")]
    Gpu(String),
}
