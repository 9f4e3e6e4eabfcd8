//! Transcode engine tests driven by a scripted encoder.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use tempfile::TempDir;

use blaze_models::encoding::{MAX_QUALITY, MIN_QUALITY, TIER_0_AGGRESSIVE, TIER_0_NORMAL};
use blaze_models::{EncodePhase, ResolutionBound, SizeBudget, TranscodeOutcome};

use super::*;

/// Pixel area the scripted encoder assumes for full-resolution encodes.
const SOURCE_AREA: u64 = 5000 * 3000;

#[derive(Debug, Clone)]
struct Call {
    input: PathBuf,
    bound: Option<ResolutionBound>,
    quality: u8,
}

type Sizer = dyn Fn(Option<ResolutionBound>, u8) -> Option<usize> + Send + Sync;

/// Writes an output of a scripted size, `None` writes nothing.
struct ScriptedEncoder {
    sizer: Box<Sizer>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedEncoder {
    fn new(sizer: impl Fn(Option<ResolutionBound>, u8) -> Option<usize> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            sizer: Box::new(sizer),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Output shrinks with pixel area and grows with fidelity.
    fn area_model() -> Arc<Self> {
        Self::new(|bound, quality| {
            let area = bound.map(|b| b.area()).unwrap_or(SOURCE_AREA);
            Some((area * 4 / u64::from(quality)) as usize)
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEncoder for ScriptedEncoder {
    async fn encode(&self, request: &EncodeRequest<'_>) -> MediaResult<Option<i32>> {
        self.calls.lock().unwrap().push(Call {
            input: request.input.to_path_buf(),
            bound: request.bound,
            quality: request.quality,
        });
        match (self.sizer)(request.bound, request.quality) {
            Some(size) => {
                tokio::fs::write(request.output, vec![0xAB; size]).await?;
                Ok(Some(0))
            }
            None => Ok(Some(1)),
        }
    }
}

fn engine(encoder: &Arc<ScriptedEncoder>, work_dir: &Path) -> TranscodeEngine {
    let encoder: Arc<dyn ImageEncoder> = encoder.clone();
    TranscodeEngine::new(encoder).with_work_dir(work_dir)
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageOutputFormat::Jpeg(90))
        .unwrap();
    out.into_inner()
}

/// PNG signature padded to `size` bytes; only the magic matters to the engine.
fn png_like(size: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(size, 0);
    bytes
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn assert_monotonic_per_phase(result: &TranscodeResult) {
    for phase in [EncodePhase::Ladder, EncodePhase::AggressiveLadder] {
        let attempts: Vec<_> = result.attempts.iter().filter(|a| a.phase == phase).collect();
        for pair in attempts.windows(2) {
            assert!(pair[1].resolution_tier >= pair[0].resolution_tier);
            let (prev, next) = (pair[0].bound.unwrap(), pair[1].bound.unwrap());
            assert!(next.area() <= prev.area());
            assert!(pair[1].quality >= pair[0].quality);
        }
    }
}

#[tokio::test]
async fn test_small_jpeg_passes_through_untouched() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let source = jpeg_bytes(64, 48);
    assert!(source.len() <= 200 * 1024);

    let result = engine(&encoder, work.path())
        .transcode_bytes(source.clone(), &SizeBudget::default())
        .await
        .unwrap();

    assert!(result.passthrough);
    assert_eq!(result.outcome, TranscodeOutcome::Success);
    assert_eq!(result.data.as_deref(), Some(source.as_slice()));
    assert_eq!(result.encoder_invocations(), 0);
    assert!(encoder.calls().is_empty());
}

#[tokio::test]
async fn test_passthrough_from_file() {
    let work = TempDir::new().unwrap();
    let path = work.path().join("cover.bin");
    let source = jpeg_bytes(32, 32);
    tokio::fs::write(&path, &source).await.unwrap();

    let encoder = ScriptedEncoder::area_model();
    let result = engine(&encoder, work.path())
        .transcode(&path, &SizeBudget::default())
        .await
        .unwrap();

    assert!(result.passthrough);
    assert_eq!(result.data.unwrap(), source);
    assert!(encoder.calls().is_empty());
}

#[tokio::test]
async fn test_jpeg_over_hard_cap_is_reencoded() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let source = jpeg_bytes(64, 48);
    // Cap below the source size forces the ladder
    let budget = SizeBudget::new(2000, 0, false);

    let result = engine(&encoder, work.path())
        .transcode_bytes(source, &budget)
        .await
        .unwrap();

    assert!(!result.passthrough);
    assert!(!encoder.calls().is_empty());
}

#[tokio::test]
async fn test_large_png_fits_budget_within_a_few_rungs() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let budget = SizeBudget::new(2000, 200, false);

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(4 * 1024 * 1024), &budget)
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::Success);
    assert!(result.size_bytes <= 200 * 1024);
    assert!(result.encoder_invocations() <= 8);
    assert!(result
        .attempts
        .iter()
        .all(|a| (MIN_QUALITY..=MAX_QUALITY).contains(&a.quality)));
    assert!(result.attempts.last().unwrap().succeeded);
    assert_monotonic_per_phase(&result);

    // 1280x720 at q3, q6, q9 miss; the fourth attempt drops to 640x360
    let calls = encoder.calls();
    assert_eq!(calls[0].bound, Some(TIER_0_NORMAL));
    assert_eq!(calls[0].quality, 3);
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3].bound, Some(ResolutionBound::new(640, 360)));
    assert_eq!(calls[3].quality, 12);

    assert!(dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_rungs_reencode_the_prior_artifact() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();

    engine(&encoder, work.path())
        .transcode_bytes(png_like(1024), &SizeBudget::default())
        .await
        .unwrap();

    let calls = encoder.calls();
    assert!(calls[0].input.ends_with("source"));
    for call in &calls[1..] {
        let name = call.input.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("attempt-"), "re-encoded from {}", name);
    }
}

#[tokio::test]
async fn test_aggressive_budget_starts_smaller() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let budget = SizeBudget::new(2000, 200, true);

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(2048), &budget)
        .await
        .unwrap();

    let calls = encoder.calls();
    assert_eq!(calls[0].bound, Some(TIER_0_AGGRESSIVE));
    assert_eq!(calls[0].quality, 5);
    assert_eq!(result.outcome, TranscodeOutcome::Success);
}

#[tokio::test]
async fn test_oversized_everywhere_is_budget_exceeded() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::new(|_, _| Some(300 * 1024));
    let budget = SizeBudget::default();

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(4096), &budget)
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::BudgetExceeded);
    assert_eq!(result.size_bytes, 300 * 1024);
    assert!(result.data.is_some());

    // Full ladder, one fallback, one aggressive ladder
    let ladder = result.attempts.iter().filter(|a| a.phase == EncodePhase::Ladder).count();
    let fallback = result.attempts.iter().filter(|a| a.phase == EncodePhase::Fallback).count();
    let aggressive = result
        .attempts
        .iter()
        .filter(|a| a.phase == EncodePhase::AggressiveLadder)
        .count();
    assert_eq!((ladder, fallback, aggressive), (14, 1, 13));
    assert!(result.attempts.iter().all(|a| !a.succeeded));
    assert!(result.attempts.iter().all(|a| a.quality <= MAX_QUALITY));
    assert_monotonic_per_phase(&result);
    assert!(dir_is_empty(work.path()));

    match result.into_thumbnail() {
        Err(MediaError::BudgetExceeded {
            size_bytes,
            hard_cap_kb,
            attempts,
            artifact,
        }) => {
            assert_eq!(size_bytes, 300 * 1024);
            assert_eq!(hard_cap_kb, 200);
            assert_eq!(attempts.len(), 28);
            assert_eq!(artifact.len(), 300 * 1024);
        }
        other => panic!("expected budget exceeded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_budget_exceeded_keeps_smallest_artifact() {
    let work = TempDir::new().unwrap();
    // Bounded encodes stall at 250 KB, the full-resolution fallback is larger
    let encoder = ScriptedEncoder::new(|bound, _| match bound {
        Some(_) => Some(250 * 1024),
        None => Some(900 * 1024),
    });

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(4096), &SizeBudget::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::BudgetExceeded);
    assert_eq!(result.size_bytes, 250 * 1024);
}

#[tokio::test]
async fn test_nothing_produced_is_encode_failure() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::new(|_, _| None);

    let result = engine(&encoder, work.path())
        .transcode_bytes(b"HEIC-ish payload".to_vec(), &SizeBudget::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::EncodeFailure);
    assert!(result.data.is_none());
    // Ladder stops once the opening rung produces nothing, then one fallback
    assert_eq!(result.encoder_invocations(), 2);
    assert_eq!(result.attempts[1].phase, EncodePhase::Fallback);
    assert_eq!(result.attempts[1].quality, 25);
    assert!(result.attempts.iter().all(|a| a.output_size_bytes.is_none()));
    assert!(dir_is_empty(work.path()));

    assert!(matches!(
        result.into_thumbnail(),
        Err(MediaError::EncodeFailure { .. })
    ));
}

#[tokio::test]
async fn test_zero_byte_output_counts_as_nothing() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::new(|_, _| Some(0));

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(64), &SizeBudget::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::EncodeFailure);
}

#[tokio::test]
async fn test_fallback_rescues_failed_ladder() {
    let work = TempDir::new().unwrap();
    // Scaling fails, a plain re-encode works
    let encoder = ScriptedEncoder::new(|bound, _| match bound {
        Some(_) => None,
        None => Some(120 * 1024),
    });

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(64), &SizeBudget::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::Success);
    assert_eq!(result.size_bytes, 120 * 1024);
    let thumbnail = result.into_thumbnail().unwrap();
    assert_eq!(thumbnail.size_bytes(), 120 * 1024);
    assert!(!thumbnail.passthrough);
}

#[tokio::test]
async fn test_oversized_fallback_gets_aggressive_pass() {
    let work = TempDir::new().unwrap();
    // Normal tiers are stuck; the aggressive pass over the fallback succeeds
    let encoder = ScriptedEncoder::new(|bound, quality| match bound {
        None => Some(600 * 1024),
        Some(b) if b == TIER_0_AGGRESSIVE && quality >= 8 => Some(150 * 1024),
        Some(_) => Some(400 * 1024),
    });

    let result = engine(&encoder, work.path())
        .transcode_bytes(png_like(64), &SizeBudget::default())
        .await
        .unwrap();

    assert_eq!(result.outcome, TranscodeOutcome::Success);
    assert_eq!(result.size_bytes, 150 * 1024);

    let calls = encoder.calls();
    let fallback_index = result
        .attempts
        .iter()
        .position(|a| a.phase == EncodePhase::Fallback)
        .unwrap();
    assert!(calls[fallback_index].input.ends_with("source"));
    assert_eq!(calls[fallback_index].bound, None);

    let aggressive = &calls[fallback_index + 1];
    assert_eq!(aggressive.bound, Some(TIER_0_AGGRESSIVE));
    assert_eq!(aggressive.quality, 5);
    let fallback_output = format!("attempt-{:02}.jpg", fallback_index + 1);
    assert!(aggressive.input.ends_with(&fallback_output));
    assert!(dir_is_empty(work.path()));
}

#[tokio::test]
async fn test_unreadable_sources() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let engine = engine(&encoder, work.path());

    let missing = engine
        .transcode(work.path().join("missing.png"), &SizeBudget::default())
        .await;
    assert!(matches!(missing, Err(MediaError::SourceUnreadable { .. })));

    let empty = engine.transcode_bytes(Vec::new(), &SizeBudget::default()).await;
    assert!(matches!(empty, Err(MediaError::SourceUnreadable { .. })));

    assert!(encoder.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_transcodes_use_private_scratch() {
    let work = TempDir::new().unwrap();
    let encoder = ScriptedEncoder::area_model();
    let engine = engine(&encoder, work.path());
    let budget = SizeBudget::default();

    let (a, b) = tokio::join!(
        engine.transcode_bytes(png_like(1000), &budget),
        engine.transcode_bytes(png_like(2000), &budget),
    );

    assert_eq!(a.unwrap().outcome, TranscodeOutcome::Success);
    assert_eq!(b.unwrap().outcome, TranscodeOutcome::Success);
    assert!(dir_is_empty(work.path()));
}
