/// Export modules for asciicam.
///
/// Offline video transcoding, the ffmpeg-backed encoder, PNG and
/// clipboard export.
pub mod audio;
pub mod clipboard;
pub mod muxer;
pub mod png;
pub mod transcode;

pub use transcode::{TranscodeError, Transcoder};
