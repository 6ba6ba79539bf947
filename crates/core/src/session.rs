//! Frame-by-frame PSNR comparison of two raw YUV files.
//!
//! A [`ComparisonSession`] validates both format tags and the resolution
//! before touching any file, sizes the run from the shorter input, then reads,
//! splits and scores one frame pair at a time. It yields a single averaged
//! [`PsnrSummary`] once the whole run has been consumed.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{PsnrError, Result, Warning};
use crate::format::{FrameLayout, Resolution};
use crate::metrics::{psnr, BlankFrameRule, FrameScore, ScoreAccumulator};
use crate::planes::PlaneExtractor;
use crate::reader::FrameReader;
use crate::registry::{self, FormatDescriptor};

/// Everything needed to compare two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub reference: PathBuf,
    pub distorted: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format_in: String,
    /// Validated like `format_in` but not used for scoring.
    pub format_out: Option<String>,
    pub num_frames: Option<u64>,
    pub skip_blank_frames: bool,
}

impl ComparisonRequest {
    pub fn new(
        reference: impl Into<PathBuf>,
        distorted: impl Into<PathBuf>,
        width: u32,
        height: u32,
        format_in: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            distorted: distorted.into(),
            width,
            height,
            format_in: format_in.into(),
            format_out: None,
            num_frames: None,
            skip_blank_frames: true,
        }
    }
}

/// Mean PSNR per plane plus the weighted composite, in dB.
/// A field is NaN when every scored frame matched exactly on that plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PsnrSummary {
    pub y: f64,
    pub cb: f64,
    pub cr: f64,
    pub composite: f64,
}

impl From<FrameScore> for PsnrSummary {
    fn from(score: FrameScore) -> Self {
        Self {
            y: score.y,
            cb: score.cb,
            cr: score.cr,
            composite: score.composite,
        }
    }
}

struct SessionPlan {
    format_in: &'static FormatDescriptor,
    format_out: &'static FormatDescriptor,
    resolution: Resolution,
    layout: FrameLayout,
}

fn plan(request: &ComparisonRequest) -> Result<SessionPlan> {
    let format_in = registry::lookup(&request.format_in)?;
    let format_out = match request.format_out.as_deref() {
        Some(tag) => registry::lookup(tag)?,
        None => format_in,
    };
    let resolution = Resolution::new(request.width, request.height)?;
    Ok(SessionPlan {
        format_in,
        format_out,
        resolution,
        layout: format_in.layout(resolution),
    })
}

pub(crate) fn resolution_warnings(resolution: Resolution) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if resolution.width & 0xF != 0 {
        warnings.push(Warning::WidthNotMultipleOf16 {
            width: resolution.width,
        });
    }
    if resolution.height & 0xF != 0 {
        warnings.push(Warning::HeightNotMultipleOf16 {
            height: resolution.height,
        });
    }
    warnings
}

/// Whole frames in `len` bytes, plus a warning if bytes are left over.
pub(crate) fn frames_available(
    path: &Path,
    len: u64,
    frame_size: usize,
) -> (u64, Option<Warning>) {
    let frame_size = frame_size as u64;
    let frames = len / frame_size;
    let remainder = len % frame_size;
    let warning = (remainder != 0).then(|| Warning::PartialTrailingFrame {
        path: path.to_path_buf(),
        frames,
        remainder,
    });
    (frames, warning)
}

pub(crate) fn file_len(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|source| PsnrError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| PsnrError::Io {
            path: path.to_path_buf(),
            source,
        })
}

pub struct ComparisonSession<R = BufReader<File>> {
    format_in: &'static FormatDescriptor,
    format_out: &'static FormatDescriptor,
    resolution: Resolution,
    extractor: PlaneExtractor,
    frame_count: u64,
    blank_rule: Option<BlankFrameRule>,
    warnings: Vec<Warning>,
    reference: FrameReader<R>,
    distorted: FrameReader<R>,
}

impl ComparisonSession<BufReader<File>> {
    /// Validate the request, size the run from both files and open them.
    pub fn open(request: &ComparisonRequest) -> Result<Self> {
        let plan = plan(request)?;
        let reference_len = file_len(&request.reference)?;
        let distorted_len = file_len(&request.distorted)?;
        let reference = open_file(&request.reference)?;
        let distorted = open_file(&request.distorted)?;
        Ok(Self::build(
            plan,
            request,
            (reference, reference_len),
            (distorted, distorted_len),
        ))
    }
}

impl<R: Read> ComparisonSession<R> {
    /// Like [`ComparisonSession::open`] over already-open streams of known length.
    /// The request's paths are used only to name the streams.
    pub fn from_streams(
        request: &ComparisonRequest,
        reference: (R, u64),
        distorted: (R, u64),
    ) -> Result<Self> {
        let plan = plan(request)?;
        Ok(Self::build(plan, request, reference, distorted))
    }

    fn build(
        plan: SessionPlan,
        request: &ComparisonRequest,
        (reference, reference_len): (R, u64),
        (distorted, distorted_len): (R, u64),
    ) -> Self {
        let frame_size = plan.layout.frame_size;
        let mut warnings = resolution_warnings(plan.resolution);

        let (frames_a, warning_a) = frames_available(&request.reference, reference_len, frame_size);
        let (frames_b, warning_b) = frames_available(&request.distorted, distorted_len, frame_size);
        warnings.extend(warning_a);
        warnings.extend(warning_b);

        let mut frame_count = frames_a.min(frames_b);
        if let Some(cap) = request.num_frames {
            frame_count = frame_count.min(cap);
        }

        for warning in &warnings {
            warn!("{warning}");
        }
        debug!(
            format_in = plan.format_in.tag,
            format_out = plan.format_out.tag,
            resolution = %plan.resolution,
            chroma_divisor = ?plan.format_in.subsampling.divisor(),
            frame_size,
            frames_reference = frames_a,
            frames_distorted = frames_b,
            frame_count,
            "Comparison session ready"
        );

        let blank_rule = request
            .skip_blank_frames
            .then(|| BlankFrameRule::new(plan.layout.y.len()));

        Self {
            format_in: plan.format_in,
            format_out: plan.format_out,
            resolution: plan.resolution,
            extractor: PlaneExtractor::new(plan.layout),
            frame_count,
            blank_rule,
            warnings,
            reference: FrameReader::new(
                reference,
                request.reference.display().to_string(),
                frame_size,
            ),
            distorted: FrameReader::new(
                distorted,
                request.distorted.display().to_string(),
                frame_size,
            ),
        }
    }

    pub fn input_format(&self) -> &'static FormatDescriptor {
        self.format_in
    }

    pub fn output_format(&self) -> &'static FormatDescriptor {
        self.format_out
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn layout(&self) -> &FrameLayout {
        self.extractor.layout()
    }

    /// Number of frame pairs the run will read.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Score every frame pair and return the averages. Both streams are
    /// dropped when this returns, on success or failure.
    pub fn run(mut self) -> Result<PsnrSummary> {
        let mut scores = ScoreAccumulator::default();
        let mut skipped = 0u64;

        for index in 0..self.frame_count {
            let planes_a = self.extractor.extract(self.reference.read_frame()?);
            let planes_b = self.extractor.extract(self.distorted.read_frame()?);

            if let Some(rule) = &self.blank_rule {
                if rule.is_blank(&planes_b.y) {
                    debug!(frame = index, "Skipping frame with blank luma in distorted input");
                    skipped += 1;
                    continue;
                }
            }

            let score = FrameScore::new(
                psnr(&planes_a.y, &planes_b.y),
                psnr(&planes_a.cb, &planes_b.cb),
                psnr(&planes_a.cr, &planes_b.cr),
            );
            trace!(
                frame = index,
                y = score.y,
                cb = score.cb,
                cr = score.cr,
                composite = score.composite,
                "Frame scored"
            );
            scores.push(score);
        }

        info!(
            frames = self.frame_count,
            scored = scores.count(),
            skipped,
            "Comparison finished"
        );

        scores
            .mean()
            .map(PsnrSummary::from)
            .ok_or(PsnrError::NoData {
                frames: self.frame_count,
                skipped,
            })
    }
}

/// Open, run and close a comparison in one call.
pub fn run(request: &ComparisonRequest) -> Result<PsnrSummary> {
    ComparisonSession::open(request)?.run()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;

    const W: u32 = 16;
    const H: u32 = 16;
    const IYUV_FRAME: usize = 16 * 16 * 3 / 2;

    fn ramp_frames(frames: usize, frame_size: usize) -> Vec<u8> {
        (0..frames * frame_size)
            .map(|i| (i % 200) as u8 + 10)
            .collect()
    }

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).expect("write fixture");
        path
    }

    fn request(a: &Path, b: &Path) -> ComparisonRequest {
        ComparisonRequest::new(a, b, W, H, "IYUV")
    }

    fn expected_unit_psnr() -> f64 {
        10.0 * 65025f64.log10()
    }

    #[test]
    fn off_by_one_everywhere_scores_48_db() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a_bytes = ramp_frames(2, IYUV_FRAME);
        let b_bytes: Vec<u8> = a_bytes.iter().map(|&v| v + 1).collect();
        let a = write(&dir, "a.yuv", &a_bytes);
        let b = write(&dir, "b.yuv", &b_bytes);

        let summary = run(&request(&a, &b)).expect("comparison succeeds");

        let expected = expected_unit_psnr();
        for value in [summary.y, summary.cb, summary.cr, summary.composite] {
            assert!((value - expected).abs() < 1e-9, "{value} != {expected}");
        }
        assert!((summary.y - 48.1308).abs() < 1e-4);
    }

    #[test]
    fn frame_count_follows_the_shorter_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &ramp_frames(3, IYUV_FRAME));
        let b = write(&dir, "b.yuv", &ramp_frames(2, IYUV_FRAME));

        let session = ComparisonSession::open(&request(&a, &b)).expect("session opens");
        assert_eq!(session.frame_count(), 2);
        assert!(session.warnings().is_empty());
        assert!(session.run().expect("run succeeds").y.is_nan());
    }

    #[test]
    fn num_frames_caps_the_run() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &ramp_frames(4, IYUV_FRAME));
        let b = write(&dir, "b.yuv", &ramp_frames(4, IYUV_FRAME));

        let mut req = request(&a, &b);
        req.num_frames = Some(1);
        let session = ComparisonSession::open(&req).expect("session opens");
        assert_eq!(session.frame_count(), 1);

        req.num_frames = Some(10);
        let session = ComparisonSession::open(&req).expect("session opens");
        assert_eq!(session.frame_count(), 4);
    }

    #[test]
    fn identical_files_yield_perfect_match_everywhere() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let bytes = ramp_frames(3, IYUV_FRAME);
        let a = write(&dir, "a.yuv", &bytes);
        let b = write(&dir, "b.yuv", &bytes);

        let summary = run(&request(&a, &b)).expect("comparison succeeds");
        assert!(summary.y.is_nan());
        assert!(summary.cb.is_nan());
        assert!(summary.cr.is_nan());
        assert!(summary.composite.is_nan());
    }

    #[test]
    fn unsupported_format_fails_before_any_file_access() {
        let missing = Path::new("/nonexistent/definitely/missing.yuv");
        let mut req = ComparisonRequest::new(missing, missing, W, H, "RGB24");
        match ComparisonSession::open(&req) {
            Err(PsnrError::UnsupportedFormat { tag }) => assert_eq!(tag, "RGB24"),
            Err(other) => panic!("expected UnsupportedFormat, got {other:?}"),
            Ok(_) => panic!("RGB24 must be rejected"),
        }

        req.format_in = "IYUV".to_string();
        req.format_out = Some("RGB24".to_string());
        assert!(matches!(
            ComparisonSession::open(&req),
            Err(PsnrError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn zero_resolution_fails_before_any_file_access() {
        let missing = Path::new("/nonexistent/missing.yuv");
        let req = ComparisonRequest::new(missing, missing, 0, H, "IYUV");
        assert!(matches!(
            ComparisonSession::open(&req),
            Err(PsnrError::InvalidResolution { width: 0, .. })
        ));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &ramp_frames(1, IYUV_FRAME));
        let b = dir.path().join("missing.yuv");

        match ComparisonSession::open(&request(&a, &b)) {
            Err(PsnrError::Io { path, .. }) => assert_eq!(path, b),
            Err(other) => panic!("expected Io error, got {other:?}"),
            Ok(_) => panic!("missing file must fail"),
        }
    }

    #[test]
    fn output_format_is_validated_but_kept_separate() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &ramp_frames(1, IYUV_FRAME));
        let mut req = request(&a, &a);
        req.format_out = Some("YV12".to_string());

        let session = ComparisonSession::open(&req).expect("session opens");
        assert_eq!(session.input_format().tag, "IYUV");
        assert_eq!(session.output_format().tag, "YV12");
        assert_eq!(session.layout().frame_size, IYUV_FRAME);
    }

    #[test]
    fn blank_distorted_frames_are_skipped() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a_bytes = ramp_frames(2, IYUV_FRAME);
        let mut b_bytes: Vec<u8> = a_bytes.iter().map(|&v| v + 1).collect();
        b_bytes[..IYUV_FRAME].fill(0);
        let a = write(&dir, "a.yuv", &a_bytes);
        let b = write(&dir, "b.yuv", &b_bytes);

        let summary = run(&request(&a, &b)).expect("second frame is scored");
        assert!((summary.y - expected_unit_psnr()).abs() < 1e-9);
    }

    #[test]
    fn blank_luma_alone_triggers_the_skip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a_bytes = ramp_frames(1, IYUV_FRAME);
        let mut b_bytes = a_bytes.clone();
        b_bytes[..(W * H) as usize].fill(0);
        let a = write(&dir, "a.yuv", &a_bytes);
        let b = write(&dir, "b.yuv", &b_bytes);

        match run(&request(&a, &b)) {
            Err(PsnrError::NoData { frames, skipped }) => {
                assert_eq!(frames, 1);
                assert_eq!(skipped, 1);
            }
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn skip_rule_can_be_disabled() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &vec![1u8; IYUV_FRAME]);
        let b = write(&dir, "b.yuv", &vec![0u8; IYUV_FRAME]);

        let mut req = request(&a, &b);
        req.skip_blank_frames = false;
        let summary = run(&req).expect("blank frame is scored");
        assert!((summary.composite - expected_unit_psnr()).abs() < 1e-9);
    }

    #[test]
    fn files_shorter_than_one_frame_are_no_data() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let a = write(&dir, "a.yuv", &[1u8; 100]);
        let b = write(&dir, "b.yuv", &[1u8; 100]);

        let session = ComparisonSession::open(&request(&a, &b)).expect("session opens");
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.warnings().len(), 2);
        assert!(matches!(
            session.run(),
            Err(PsnrError::NoData {
                frames: 0,
                skipped: 0
            })
        ));
    }

    #[test]
    fn odd_resolution_and_trailing_bytes_only_warn() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let frame_size = crate::format::PixelFormat::Yuy2
            .frame_size(Resolution::new(18, 10).expect("positive resolution"));
        let mut a_bytes = ramp_frames(2, frame_size);
        a_bytes.extend_from_slice(&[5, 5, 5]);
        let a = write(&dir, "a.yuv", &a_bytes);
        let b = write(&dir, "b.yuv", &ramp_frames(2, frame_size));

        let req = ComparisonRequest::new(&a, &b, 18, 10, "YUY2");
        let session = ComparisonSession::open(&req).expect("warnings are not fatal");
        assert_eq!(
            session.warnings(),
            &[
                Warning::WidthNotMultipleOf16 { width: 18 },
                Warning::HeightNotMultipleOf16 { height: 10 },
                Warning::PartialTrailingFrame {
                    path: a.clone(),
                    frames: 2,
                    remainder: 3,
                },
            ]
        );
        assert_eq!(session.frame_count(), 2);
        assert!(session.run().expect("run succeeds").y.is_nan());
    }

    #[test]
    fn truncated_stream_aborts_with_end_of_stream() {
        let req = request(Path::new("a.yuv"), Path::new("b.yuv"));
        let full = ramp_frames(2, IYUV_FRAME);
        let short = full[..IYUV_FRAME + 10].to_vec();

        let session = ComparisonSession::from_streams(
            &req,
            (Cursor::new(full), (2 * IYUV_FRAME) as u64),
            (Cursor::new(short), (2 * IYUV_FRAME) as u64),
        )
        .expect("session builds");

        match session.run() {
            Err(PsnrError::EndOfStream {
                source_name,
                frame,
                expected,
                received,
            }) => {
                assert_eq!(source_name, "b.yuv");
                assert_eq!(frame, 1);
                assert_eq!(expected, IYUV_FRAME);
                assert_eq!(received, 10);
            }
            other => panic!("expected EndOfStream, got {other:?}"),
        }
    }

    #[test]
    fn every_format_compares_against_itself() {
        let resolution = Resolution::new(W, H).expect("positive resolution");
        for descriptor in registry::descriptors() {
            let frame_size = descriptor.frame_size(resolution);
            let bytes = ramp_frames(2, frame_size);
            let shifted: Vec<u8> = bytes.iter().map(|&v| v + 1).collect();
            let req = ComparisonRequest::new("a.yuv", "b.yuv", W, H, descriptor.tag);

            let summary = ComparisonSession::from_streams(
                &req,
                (Cursor::new(bytes), (2 * frame_size) as u64),
                (Cursor::new(shifted), (2 * frame_size) as u64),
            )
            .and_then(|session| session.run())
            .expect("comparison succeeds");

            assert!(
                (summary.composite - expected_unit_psnr()).abs() < 1e-9,
                "{}",
                descriptor.tag
            );
        }
    }
}
