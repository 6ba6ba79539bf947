//! MSE and PSNR over 8-bit sample planes.

/// Peak sample value; only 8-bit samples are supported.
pub const PEAK: f64 = 255.0;

/// Returned by [`psnr`] when the inputs are identical.
pub const PERFECT_MATCH: f64 = f64::NAN;

/// Mean of squared differences. Both slices must have the same length.
pub fn mse(a: &[i32], b: &[i32]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "planes must have equal length");
    let sum: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let diff = i64::from(x) - i64::from(y);
            (diff * diff) as u64
        })
        .sum();
    sum as f64 / a.len() as f64
}

/// PSNR in decibels, or [`PERFECT_MATCH`] when `mse == 0`.
pub fn psnr(a: &[i32], b: &[i32]) -> f64 {
    psnr_from_mse(mse(a, b))
}

pub fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return PERFECT_MATCH;
    }
    10.0 * (PEAK * PEAK / mse).log10()
}

/// 6:1:1 luma-weighted score.
pub fn composite(psnr_y: f64, psnr_cb: f64, psnr_cr: f64) -> f64 {
    (6.0 * psnr_y + psnr_cb + psnr_cr) / 8.0
}

/// Excludes frame pairs whose second luma plane is entirely zero.
///
/// The zero reference length is the luma plane size of the resolution under
/// test; a plane of any other length never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankFrameRule {
    reference_len: usize,
}

impl BlankFrameRule {
    pub fn new(reference_len: usize) -> Self {
        Self { reference_len }
    }

    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    pub fn is_blank(&self, luma: &[i32]) -> bool {
        luma.len() == self.reference_len && luma.iter().all(|&sample| sample == 0)
    }
}

/// Per-plane PSNR of one frame pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameScore {
    pub y: f64,
    pub cb: f64,
    pub cr: f64,
    pub composite: f64,
}

impl FrameScore {
    pub fn new(y: f64, cb: f64, cr: f64) -> Self {
        Self {
            y,
            cb,
            cr,
            composite: composite(y, cb, cr),
        }
    }
}

/// Running sums of frame scores. A NaN score propagates into the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAccumulator {
    y: f64,
    cb: f64,
    cr: f64,
    composite: f64,
    count: u64,
}

impl ScoreAccumulator {
    pub fn push(&mut self, score: FrameScore) {
        self.y += score.y;
        self.cb += score.cb;
        self.cr += score.cr;
        self.composite += score.composite;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Arithmetic mean of each series, `None` when nothing was pushed.
    pub fn mean(&self) -> Option<FrameScore> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(FrameScore {
            y: self.y / n,
            cb: self.cb / n,
            cr: self.cr / n,
            composite: self.composite / n,
        })
    }
}
