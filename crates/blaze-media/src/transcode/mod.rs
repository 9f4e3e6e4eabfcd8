//! Size-bounded JPEG thumbnail transcoding.
//!
//! A cover image goes through, in order:
//! 1. Pass-through: a JPEG already under the hard cap is returned verbatim.
//! 2. Ladder: encode at tier 0, then keep re-encoding the smallest artifact
//!    with worse quality and smaller tiers until it fits the working goal.
//! 3. Fallback: one full-resolution encode of the source at quality 25,
//!    followed by a forced-aggressive ladder pass over it when it is still
//!    over the hard cap.
//!
//! Every attempt writes into a per-call scratch directory that is removed
//! before the call returns, whatever the outcome.

mod ladder;
#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use blaze_models::encoding::FALLBACK_QUALITY;
use blaze_models::{EncodeAttempt, EncodePhase, ResolutionBound, SizeBudget, TranscodeOutcome};

use crate::encoder::{EncodeRequest, ImageEncoder};
use crate::error::{MediaError, MediaResult};
use crate::source::SourceImage;

use ladder::{Ladder, Rung};

/// Metric names.
pub mod names {
    pub const TRANSCODES_TOTAL: &str = "blaze_transcodes_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "blaze_transcode_duration_seconds";
    pub const ENCODER_INVOCATIONS_TOTAL: &str = "blaze_encoder_invocations_total";
}

const SCRATCH_PREFIX: &str = "blaze-thumb-";
const SOURCE_FILE_NAME: &str = "source";

/// Result of one transcode call.
#[derive(Debug, Clone)]
pub struct TranscodeResult {
    /// Final JPEG bytes, `None` when nothing was produced
    pub data: Option<Vec<u8>>,
    /// Size of `data` in bytes
    pub size_bytes: u64,
    /// Every encoder invocation, in order
    pub attempts: Vec<EncodeAttempt>,
    pub outcome: TranscodeOutcome,
    /// The source was returned without re-encoding
    pub passthrough: bool,
    /// Hard cap the result was judged against
    pub hard_cap_kb: u32,
}

impl TranscodeResult {
    fn passthrough(bytes: Vec<u8>, budget: &SizeBudget) -> Self {
        Self {
            size_bytes: bytes.len() as u64,
            data: Some(bytes),
            attempts: Vec::new(),
            outcome: TranscodeOutcome::Success,
            passthrough: true,
            hard_cap_kb: budget.hard_cap_kb(),
        }
    }

    /// Number of times the encoder ran.
    pub fn encoder_invocations(&self) -> usize {
        self.attempts.len()
    }

    /// Keep only a successful result, turning the other outcomes into errors.
    pub fn into_thumbnail(self) -> MediaResult<Thumbnail> {
        match (self.outcome, self.data) {
            (TranscodeOutcome::Success, Some(data)) => Ok(Thumbnail {
                data,
                attempts: self.attempts,
                passthrough: self.passthrough,
            }),
            (TranscodeOutcome::BudgetExceeded, Some(artifact)) => Err(MediaError::BudgetExceeded {
                size_bytes: self.size_bytes,
                hard_cap_kb: self.hard_cap_kb,
                attempts: self.attempts,
                artifact,
            }),
            (TranscodeOutcome::EncodeFailure, _) => Err(MediaError::EncodeFailure {
                attempts: self.attempts,
            }),
            (outcome, None) => Err(MediaError::internal(format!(
                "transcode outcome {} carries no data",
                outcome
            ))),
        }
    }
}

/// A JPEG thumbnail that fits the hard cap.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub attempts: Vec<EncodeAttempt>,
    pub passthrough: bool,
}

impl Thumbnail {
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Drives an [`ImageEncoder`] through the size ladder.
#[derive(Clone)]
pub struct TranscodeEngine {
    encoder: Arc<dyn ImageEncoder>,
    work_dir: Option<PathBuf>,
}

impl TranscodeEngine {
    /// Create an engine using the system temp dir for scratch space.
    pub fn new(encoder: Arc<dyn ImageEncoder>) -> Self {
        Self {
            encoder,
            work_dir: None,
        }
    }

    /// Place per-call scratch directories under `work_dir`.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Transcode an image file into a JPEG within `budget`.
    pub async fn transcode(
        &self,
        source: impl AsRef<Path>,
        budget: &SizeBudget,
    ) -> MediaResult<TranscodeResult> {
        let source = SourceImage::read(source).await?;
        if let Some(result) = Self::try_passthrough(&source, budget) {
            return Ok(result);
        }

        let scratch = self.scratch_dir().await?;
        self.transcode_in(&source, scratch, budget).await
    }

    /// Transcode in-memory image bytes into a JPEG within `budget`.
    pub async fn transcode_bytes(
        &self,
        bytes: Vec<u8>,
        budget: &SizeBudget,
    ) -> MediaResult<TranscodeResult> {
        let source = SourceImage::from_bytes(SOURCE_FILE_NAME, bytes)?;
        if let Some(result) = Self::try_passthrough(&source, budget) {
            return Ok(result);
        }

        let scratch = self.scratch_dir().await?;
        let path = scratch.path().join(SOURCE_FILE_NAME);
        tokio::fs::write(&path, source.as_bytes()).await?;
        let source = source.with_path(path);
        self.transcode_in(&source, scratch, budget).await
    }

    fn try_passthrough(source: &SourceImage, budget: &SizeBudget) -> Option<TranscodeResult> {
        if !(source.is_jpeg() && budget.fits_hard_cap(source.len())) {
            return None;
        }

        debug!(
            size_bytes = source.len(),
            hard_cap_kb = budget.hard_cap_kb(),
            "Source is a JPEG within the hard cap, passing through"
        );
        counter!(names::TRANSCODES_TOTAL, "outcome" => "passthrough").increment(1);
        Some(TranscodeResult::passthrough(source.as_bytes().to_vec(), budget))
    }

    async fn scratch_dir(&self) -> MediaResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.work_dir {
            Some(work_dir) => {
                tokio::fs::create_dir_all(work_dir).await?;
                builder.tempdir_in(work_dir)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn transcode_in(
        &self,
        source: &SourceImage,
        scratch: TempDir,
        budget: &SizeBudget,
    ) -> MediaResult<TranscodeResult> {
        let started = Instant::now();
        debug!(
            source_bytes = source.len(),
            format = ?source.format(),
            dimensions = ?source.dimensions(),
            working_goal_kb = budget.working_goal_kb(),
            hard_cap_kb = budget.hard_cap_kb(),
            aggressive = budget.aggressive(),
            "Transcoding cover image"
        );

        let mut run = TranscodeRun::new(self.encoder.as_ref(), scratch.path(), budget);
        let best = run.execute(source.path()).await;

        let (data, size_bytes) = match &best {
            Some(artifact) => (Some(tokio::fs::read(&artifact.path).await?), artifact.size),
            None => (None, 0),
        };

        let outcome = match &data {
            None => TranscodeOutcome::EncodeFailure,
            Some(_) if budget.fits_hard_cap(size_bytes) => TranscodeOutcome::Success,
            Some(_) => TranscodeOutcome::BudgetExceeded,
        };
        let attempts = run.attempts;

        if let Err(e) = scratch.close() {
            warn!("Failed to remove transcode scratch directory: {}", e);
        }

        let elapsed = started.elapsed().as_secs_f64();
        counter!(names::TRANSCODES_TOTAL, "outcome" => outcome.as_str()).increment(1);
        histogram!(names::TRANSCODE_DURATION_SECONDS).record(elapsed);

        info!(
            outcome = %outcome,
            size_bytes = size_bytes,
            attempts = attempts.len(),
            duration_ms = (elapsed * 1000.0) as u64,
            "Transcode finished"
        );

        Ok(TranscodeResult {
            data,
            size_bytes,
            attempts,
            outcome,
            passthrough: false,
            hard_cap_kb: budget.hard_cap_kb(),
        })
    }
}

/// An encoded file in the scratch directory.
#[derive(Debug)]
struct Artifact {
    path: PathBuf,
    size: u64,
}

/// State of a single transcode call.
struct TranscodeRun<'a> {
    encoder: &'a dyn ImageEncoder,
    dir: &'a Path,
    budget: &'a SizeBudget,
    attempts: Vec<EncodeAttempt>,
}

impl<'a> TranscodeRun<'a> {
    fn new(encoder: &'a dyn ImageEncoder, dir: &'a Path, budget: &'a SizeBudget) -> Self {
        Self {
            encoder,
            dir,
            budget,
            attempts: Vec::new(),
        }
    }

    fn meets_goal(&self, artifact: &Artifact) -> bool {
        artifact.size <= self.budget.working_goal_bytes()
    }

    /// Run the ladder and fallback, returning the smallest artifact produced.
    async fn execute(&mut self, source: &Path) -> Option<Artifact> {
        let (best, met_goal) = self
            .ladder_pass(EncodePhase::Ladder, source, None, *self.budget)
            .await;
        if met_goal {
            return best;
        }

        debug!(
            best_size = ?best.as_ref().map(|a| a.size),
            "Ladder exhausted without meeting the goal, trying full-resolution fallback"
        );

        let fallback = self
            .attempt(EncodePhase::Fallback, source, None, FALLBACK_QUALITY)
            .await;

        let fallback = match fallback {
            Some(artifact) if !self.budget.fits_hard_cap(artifact.size) => {
                let input = artifact.path.clone();
                let forced = self.budget.forced_aggressive();
                let (best, _) = self
                    .ladder_pass(EncodePhase::AggressiveLadder, &input, Some(artifact), forced)
                    .await;
                best
            }
            other => other,
        };

        keep_smaller(best, fallback).await
    }

    /// One ladder pass over `input`.
    ///
    /// The first rung encodes `input`; later rungs re-encode the smallest
    /// artifact so far. `seed` is an existing artifact that competes for
    /// "smallest" from the start. `budget` picks the starting rung. Returns
    /// the smallest artifact and whether it met the working goal.
    async fn ladder_pass(
        &mut self,
        phase: EncodePhase,
        input: &Path,
        seed: Option<Artifact>,
        budget: SizeBudget,
    ) -> (Option<Artifact>, bool) {
        let mut ladder = Ladder::new(budget.aggressive());

        let first = ladder.first();
        let produced = self.attempt_rung(phase, input, first).await;
        let mut best = keep_smaller(seed, produced).await;

        loop {
            let current = match best.as_ref().map(|a| (self.meets_goal(a), a.path.clone())) {
                Some((true, _)) => {
                    debug!(phase = phase.as_str(), attempts = ladder.attempts(), "Ladder met goal");
                    return (best, true);
                }
                Some((false, path)) => path,
                None => break,
            };

            let Some(rung) = ladder.next() else {
                break;
            };

            let produced = self.attempt_rung(phase, &current, rung).await;
            best = keep_smaller(best, produced).await;
        }

        debug!(phase = phase.as_str(), attempts = ladder.attempts(), "Ladder pass exhausted");
        (best, false)
    }

    async fn attempt_rung(&mut self, phase: EncodePhase, input: &Path, rung: Rung) -> Option<Artifact> {
        self.attempt(phase, input, Some((rung.tier, rung.bound)), rung.quality)
            .await
    }

    /// Run the encoder once into a fresh file and record the attempt.
    async fn attempt(
        &mut self,
        phase: EncodePhase,
        input: &Path,
        tier: Option<(u8, ResolutionBound)>,
        quality: u8,
    ) -> Option<Artifact> {
        let output = self
            .dir
            .join(format!("attempt-{:02}.jpg", self.attempts.len() + 1));
        let request = EncodeRequest {
            input,
            output: &output,
            bound: tier.map(|(_, bound)| bound),
            quality,
        };

        counter!(names::ENCODER_INVOCATIONS_TOTAL).increment(1);
        match self.encoder.encode(&request).await {
            Ok(exit_code) => debug!(exit_code = ?exit_code, quality, "Encoder finished"),
            Err(e) => warn!("Encoder invocation failed: {}", e),
        }

        let artifact = artifact_at(output).await;
        let output_size_bytes = artifact.as_ref().map(|a| a.size);
        let succeeded = artifact.as_ref().is_some_and(|a| self.meets_goal(a));

        self.attempts.push(EncodeAttempt {
            phase,
            resolution_tier: tier.map(|(tier, _)| tier),
            bound: tier.map(|(_, bound)| bound),
            quality,
            output_size_bytes,
            succeeded,
        });

        artifact
    }
}

/// Inspect an encoder output. Missing and zero-byte files count as nothing
/// produced.
async fn artifact_at(path: PathBuf) -> Option<Artifact> {
    let size = tokio::fs::metadata(&path).await.ok()?.len();
    if size == 0 {
        remove_artifact(&path).await;
        return None;
    }
    Some(Artifact { path, size })
}

/// Keep the smaller of two artifacts, deleting the other.
async fn keep_smaller(current: Option<Artifact>, candidate: Option<Artifact>) -> Option<Artifact> {
    match (current, candidate) {
        (Some(current), Some(candidate)) => {
            if candidate.size < current.size {
                remove_artifact(&current.path).await;
                Some(candidate)
            } else {
                remove_artifact(&candidate.path).await;
                Some(current)
            }
        }
        (current, None) => current,
        (None, candidate) => candidate,
    }
}

async fn remove_artifact(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Failed to remove transient artifact {}: {}", path.display(), e);
    }
}
