//! Shared error type for the ringview library.

/// Crate error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command-line path argument that does not exist on disk.
    #[error("no such path: {0}")]
    BadPath(String),

    /// The arguments expanded to no viewable images.
    #[error("no images found in the given paths")]
    EmptyScan,

    /// Wrapper for std IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Container misuse surfaced by the ring.
    #[error(transparent)]
    Ring(#[from] crate::ring::RingError),

    /// Rendering/backend error bubbled up from the viewer.
    #[error(transparent)]
    Render(#[from] anyhow::Error),
}
