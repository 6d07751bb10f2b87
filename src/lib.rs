#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all)]

//! ringview library surface.
//!
//! This crate exposes a small, cohesive API for:
//! - A generic cyclic container over arena-backed nodes ([`ring`]).
//! - Expanding file/directory arguments into that container ([`scan`]).
//! - A windowed pan/zoom presentation loop over the result ([`render`]).
//!
//! All fallible operations return [`Result<T, Error>`] or a more specific
//! error where one exists.

/// Library error type used across modules.
pub mod error;
/// Windowed presentation: background decoding and the draw loop.
pub mod render {
    /// Request-driven background image decoder.
    pub mod loader;
    /// winit event loop and wgpu draw path.
    pub mod viewer;
}
/// Cyclic doubly-linked container.
pub mod ring;
/// Path collection from command-line arguments.
pub mod scan;

pub use error::Error;
