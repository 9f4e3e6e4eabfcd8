#![deny(unreachable_patterns)]
//! FFmpeg-driven thumbnail transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - The `ImageEncoder` seam and its FFmpeg implementation
//! - Source image inspection (format sniffing, dimensions)
//! - The size-budget ladder that turns any cover image into a bounded JPEG

pub mod command;
pub mod encoder;
pub mod error;
pub mod source;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encoder::{EncodeRequest, FfmpegEncoder, ImageEncoder};
pub use error::{MediaError, MediaResult};
pub use source::SourceImage;
pub use transcode::{Thumbnail, TranscodeEngine, TranscodeResult};
