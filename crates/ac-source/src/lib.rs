/// Visual source modules for asciicam (still images, ffmpeg video).
pub mod ffmpeg;
pub mod image;
pub mod playback;
pub mod resize;
pub mod video;

pub use image::ImageSource;
pub use playback::Playback;
pub use video::FfmpegVideo;
