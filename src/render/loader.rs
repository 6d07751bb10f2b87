//! Request-driven background image decoder.
//! Receives paths, decodes them to RGBA8 off-thread, and answers with
//! either a frame ready for GPU upload or a failure notice. Decode errors
//! never touch the path ring; the viewer keeps whatever it was showing.

use std::{path::PathBuf, thread};

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

/// Message sent to the background decode thread.
pub enum LoaderMsg {
    /// Decode this path at native resolution.
    Decode(PathBuf),
    /// Stop the decoder.
    Quit,
}

/// Decode outcome returned to the render loop.
pub enum LoaderReply {
    /// RGBA8 frame ready for texture upload.
    Ready(DecodedImage),
    /// The file could not be decoded.
    Failed(PathBuf),
}

/// An image decoded on the CPU and ready for GPU upload.
pub struct DecodedImage {
    /// Source path (for the title bar and logging).
    pub path: PathBuf,
    /// Native dimensions (width, height).
    pub size: (u32, u32),
    /// RGBA8 pixel buffer.
    pub pixels: Vec<u8>,
}

/// Spawn the request-driven decode thread.
pub fn spawn_loader(rx: Receiver<LoaderMsg>, tx: Sender<LoaderReply>) {
    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                LoaderMsg::Quit => break,
                LoaderMsg::Decode(path) => match image::open(&path) {
                    Ok(img) => {
                        let rgba = img.to_rgba8();
                        let size = rgba.dimensions();
                        let _ = tx.send(LoaderReply::Ready(DecodedImage {
                            path,
                            size,
                            pixels: rgba.into_vec(),
                        }));
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "decode failed");
                        let _ = tx.send(LoaderReply::Failed(path));
                    }
                },
            }
        }
    });
}
