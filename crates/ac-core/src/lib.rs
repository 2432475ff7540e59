/// Configuration, types, and shared structures for asciicam.
///
/// This crate contains the shared types, capability traits, and
/// configuration logic used across the asciicam workspace.

pub mod charset;
pub mod clock;
pub mod color;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod frame;
pub mod stream;
pub mod traits;

pub use color::Rgb;
pub use config::AsciiConfig;
pub use error::CoreError;
pub use frame::{Cell, CellColor, FrameBuffer, Grid};
