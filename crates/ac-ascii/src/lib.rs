/// Pixel → character-grid conversion for asciicam.
///
/// Aggregation, tone mapping, grid building, and plain-text export.
pub mod aggregate;
pub mod grid_builder;
pub mod text;
pub mod tone;

pub use grid_builder::build;
pub use text::{export_text, grid_to_text};
