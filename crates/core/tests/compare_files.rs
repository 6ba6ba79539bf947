use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};
use yuvpsnr_core::convert::{convert, ConversionRequest};
use yuvpsnr_core::session::{run, ComparisonRequest, ComparisonSession};
use yuvpsnr_core::{PixelFormat, PsnrError, Resolution, Warning};

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path
}

fn frames_of(format: PixelFormat, width: u32, height: u32, values: &[u8]) -> Vec<u8> {
    let frame_size =
        format.frame_size(Resolution::new(width, height).expect("positive resolution"));
    values
        .iter()
        .flat_map(|&value| std::iter::repeat(value).take(frame_size))
        .collect()
}

#[test]
fn cif_iyuv_off_by_one_scores_48_db() {
    let dir = tempdir().expect("create temp dir");
    let a = write_fixture(&dir, "a.yuv", &frames_of(PixelFormat::Iyuv, 352, 288, &[100, 100]));
    let b = write_fixture(&dir, "b.yuv", &frames_of(PixelFormat::Iyuv, 352, 288, &[101, 101]));

    let summary = run(&ComparisonRequest::new(&a, &b, 352, 288, "IYUV")).expect("comparison");
    for value in [summary.y, summary.cb, summary.cr, summary.composite] {
        assert!((value - 48.1308).abs() < 1e-3, "got {value}");
    }
}

#[test]
fn identical_files_serialize_nan_as_null() {
    let dir = tempdir().expect("create temp dir");
    let bytes = frames_of(PixelFormat::Uyvy, 16, 16, &[90]);
    let a = write_fixture(&dir, "a.yuv", &bytes);
    let b = write_fixture(&dir, "b.yuv", &bytes);

    let summary = run(&ComparisonRequest::new(&a, &b, 16, 16, "UYVY")).expect("comparison");
    assert!(summary.y.is_nan());

    let json: serde_json::Value = serde_json::to_value(summary).expect("encode summary");
    assert_eq!(json["y"], serde_json::Value::Null);
    assert_eq!(json["composite"], serde_json::Value::Null);
}

#[test]
fn session_reports_advisory_warnings() {
    let dir = tempdir().expect("create temp dir");
    let mut bytes = frames_of(PixelFormat::Nv12, 20, 16, &[10, 20]);
    bytes.extend_from_slice(&[0, 0, 0]);
    let a = write_fixture(&dir, "a.yuv", &bytes);
    let b = write_fixture(&dir, "b.yuv", &frames_of(PixelFormat::Nv12, 20, 16, &[12, 22, 32]));

    let session = ComparisonSession::open(&ComparisonRequest::new(&a, &b, 20, 16, "NV12"))
        .expect("open session");
    assert_eq!(session.frame_count(), 2);
    assert_eq!(session.warnings().len(), 2);
    assert!(matches!(
        session.warnings()[0],
        Warning::WidthNotMultipleOf16 { width: 20 }
    ));
    match &session.warnings()[1] {
        Warning::PartialTrailingFrame {
            path,
            frames,
            remainder,
        } => {
            assert_eq!(path, &a);
            assert_eq!(*frames, 2);
            assert_eq!(*remainder, 3);
        }
        other => panic!("expected PartialTrailingFrame, got {other:?}"),
    }

    let summary = session.run().expect("comparison");
    assert!(summary.y > 40.0 && summary.y < 45.0);
}

#[test]
fn unknown_format_fails_before_opening_files() {
    let missing = Path::new("/nonexistent/a.yuv");
    let err = run(&ComparisonRequest::new(missing, missing, 16, 16, "yv12"))
        .expect_err("tags are case-sensitive");
    assert!(matches!(err, PsnrError::UnsupportedFormat { tag } if tag == "yv12"));
}

#[test]
fn converted_file_scores_against_its_source() {
    let dir = tempdir().expect("create temp dir");
    let source: Vec<u8> = (0..PixelFormat::Yuy2.frame_size(
        Resolution::new(16, 4).expect("positive resolution"),
    ) * 2)
        .map(|i| (i % 200) as u8 + 1)
        .collect();
    let input = write_fixture(&dir, "in.yuv", &source);
    let output = dir.path().join("out.yuv");

    let written = convert(&ConversionRequest {
        input: input.clone(),
        output: output.clone(),
        width: 16,
        height: 4,
        format_in: "YUY2".to_string(),
        format_out: "422".to_string(),
        num_frames: None,
    })
    .expect("conversion");
    assert_eq!(written, 2);

    // Converting back restores the packed bytes exactly.
    let packed_back = dir.path().join("back.yuv");
    convert(&ConversionRequest {
        input: output,
        output: packed_back.clone(),
        width: 16,
        height: 4,
        format_in: "422".to_string(),
        format_out: "YUY2".to_string(),
        num_frames: None,
    })
    .expect("conversion back");
    assert_eq!(fs::read(&packed_back).expect("read output"), source);

    let summary =
        run(&ComparisonRequest::new(&input, &packed_back, 16, 4, "YUY2")).expect("comparison");
    assert!(summary.y.is_nan() && summary.cb.is_nan() && summary.cr.is_nan());
}
