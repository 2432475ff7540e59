/// Rendering for asciicam.
///
/// Glyph rasterisation onto RGBA surfaces, terminal painting, render
/// targets, and the real-time animation driver.
pub mod canvas;
pub mod driver;
pub mod fps;
pub mod raster;
pub mod target;
pub mod ui;

pub use driver::AnimationDriver;
pub use raster::{FontBook, Renderer};
