//! Splitting a raw frame into Y, Cb and Cr sample planes and packing them back.

use crate::format::{FrameLayout, PlaneRange};
use crate::reader::RawFrame;

/// Owned copies of the three planes of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneSamples {
    pub y: Vec<i32>,
    pub cb: Vec<i32>,
    pub cr: Vec<i32>,
}

impl PlaneSamples {
    pub fn planes(&self) -> [&[i32]; 3] {
        [&self.y, &self.cb, &self.cr]
    }
}

fn gather(samples: &[i32], range: PlaneRange) -> Vec<i32> {
    let mut plane = Vec::with_capacity(range.len());
    plane.extend(range.offsets().map(|offset| samples[offset]));
    plane
}

fn scatter(plane: &[i32], range: PlaneRange, out: &mut [u8]) {
    debug_assert_eq!(plane.len(), range.len());
    for (&sample, offset) in plane.iter().zip(range.offsets()) {
        out[offset] = sample.clamp(0, 255) as u8;
    }
}

/// Applies a [`FrameLayout`] to raw frames.
#[derive(Debug, Clone, Copy)]
pub struct PlaneExtractor {
    layout: FrameLayout,
}

impl PlaneExtractor {
    pub fn new(layout: FrameLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Copy the planes out of `raw`; the result does not borrow it.
    pub fn extract(&self, raw: &RawFrame) -> PlaneSamples {
        extract(raw, &self.layout)
    }
}

pub fn extract(raw: &RawFrame, layout: &FrameLayout) -> PlaneSamples {
    debug_assert_eq!(raw.len(), layout.frame_size);
    let samples = raw.samples();
    PlaneSamples {
        y: gather(samples, layout.y),
        cb: gather(samples, layout.cb),
        cr: gather(samples, layout.cr),
    }
}

/// Inverse of [`extract`]: writes planes into `out` at the layout's offsets.
/// Samples outside `0..=255` are clamped.
pub fn pack(planes: &PlaneSamples, layout: &FrameLayout, out: &mut [u8]) {
    debug_assert_eq!(out.len(), layout.frame_size);
    scatter(&planes.y, layout.y, out);
    scatter(&planes.cb, layout.cb, out);
    scatter(&planes.cr, layout.cr, out);
}
