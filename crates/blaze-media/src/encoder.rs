//! Image encoder seam.
//!
//! The transcode ladder only needs "turn this file into a JPEG at that
//! bound and quality". Production uses FFmpeg; tests script the sizes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use blaze_models::ResolutionBound;

use crate::command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// A single encode request.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    /// Box to shrink into, `None` keeps the full resolution
    pub bound: Option<ResolutionBound>,
    /// Quality scalar, lower means higher fidelity
    pub quality: u8,
}

/// Encodes images into JPEG files.
///
/// Implementations write to `request.output`. The returned exit code is
/// informational only: whether an attempt produced anything is decided from
/// the output file.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    async fn encode(&self, request: &EncodeRequest<'_>) -> MediaResult<Option<i32>>;
}

/// FFmpeg-backed encoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    /// Create an encoder using the given executable without checking it.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            runner: FfmpegRunner::new().with_binary(binary),
        }
    }

    /// Resolve the executable on PATH and fail early when it is missing.
    pub fn locate(binary: impl AsRef<Path>) -> MediaResult<Self> {
        let resolved = check_ffmpeg(binary)?;
        Ok(Self::new(resolved))
    }

    pub fn binary(&self) -> &Path {
        self.runner.binary()
    }

    /// Build the FFmpeg invocation for a request.
    pub fn build_command(request: &EncodeRequest<'_>) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(request.input, request.output);
        let cmd = match request.bound {
            Some(bound) => cmd.video_filter(bound.to_scale_filter()),
            None => cmd,
        };
        cmd.qscale(request.quality)
    }
}

#[async_trait]
impl ImageEncoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest<'_>) -> MediaResult<Option<i32>> {
        self.runner
            .run_unchecked(&Self::build_command(request))
            .await
    }
}
