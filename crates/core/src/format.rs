//! Byte layout of one raw frame for every supported pixel format.
//!
//! A [`FrameLayout`] splits a frame into three [`PlaneRange`]s (Y, Cb, Cr).
//! Planar formats address contiguous blocks; NV12 and the packed 4:2:2
//! formats address interleaved bytes with a stride. In every case the three
//! ranges together touch each byte of the frame exactly once.

use std::fmt;
use std::str::FromStr;

use crate::error::PsnrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 4:2:0, Y then Cr then Cb.
    Yv12,
    /// Planar 4:2:0, Y then Cb then Cr.
    Iyuv,
    /// Y plane then interleaved CbCr.
    Nv12,
    /// Packed 4:2:2, `U0 Y0 V0 Y1`.
    Uyvy,
    /// Packed 4:2:2, `Y0 V0 Y1 U0`.
    Yvyu,
    /// Packed 4:2:2, `Y0 U0 Y1 V0`.
    Yuy2,
    /// Planar 4:2:2, Y then Cb then Cr.
    Y422,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaSubsampling {
    Yuv420,
    Yuv422,
}

impl ChromaSubsampling {
    /// Horizontal and vertical divisor of chroma relative to luma.
    pub const fn divisor(self) -> (u32, u32) {
        match self {
            ChromaSubsampling::Yuv420 => (2, 2),
            ChromaSubsampling::Yuv422 => (2, 1),
        }
    }
}

/// Luma dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self, PsnrError> {
        if width == 0 || height == 0 {
            return Err(PsnrError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn luma_samples(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn chroma_width(&self) -> usize {
        (self.width as usize + 1) / 2
    }

    fn chroma_height(&self, subsampling: ChromaSubsampling) -> usize {
        match subsampling {
            ChromaSubsampling::Yuv420 => (self.height as usize + 1) / 2,
            ChromaSubsampling::Yuv422 => self.height as usize,
        }
    }

    /// Samples in one chroma plane.
    pub fn chroma_samples(&self, subsampling: ChromaSubsampling) -> usize {
        self.chroma_width() * self.chroma_height(subsampling)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Strided byte selection: `start, start + stride, ...` while `< stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneRange {
    pub start: usize,
    pub stop: usize,
    pub stride: usize,
}

impl PlaneRange {
    pub const fn contiguous(start: usize, stop: usize) -> Self {
        Self {
            start,
            stop,
            stride: 1,
        }
    }

    pub const fn strided(start: usize, stop: usize, stride: usize) -> Self {
        Self {
            start,
            stop,
            stride,
        }
    }

    /// Number of bytes addressed.
    pub fn len(&self) -> usize {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start).div_ceil(self.stride)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte offsets addressed, in order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> {
        (self.start..self.stop).step_by(self.stride)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub y: PlaneRange,
    pub cb: PlaneRange,
    pub cr: PlaneRange,
    pub frame_size: usize,
}

impl FrameLayout {
    pub fn planes(&self) -> [PlaneRange; 3] {
        [self.y, self.cb, self.cr]
    }
}

/// Plane boundaries `(y_start, y_stop, cb_start, cb_stop, cr_start, cr_stop)`
/// for a planar frame of the given subsampling.
pub fn planar_partition(
    resolution: Resolution,
    subsampling: ChromaSubsampling,
) -> [usize; 6] {
    let luma = resolution.luma_samples();
    let chroma = resolution.chroma_samples(subsampling);
    [0, luma, luma, luma + chroma, luma + chroma, luma + 2 * chroma]
}

// Byte offsets of Y, Cb and Cr inside one 4-byte packed group.
const UYVY_OFFSETS: (usize, usize, usize) = (1, 0, 2);
const YVYU_OFFSETS: (usize, usize, usize) = (0, 3, 1);
const YUY2_OFFSETS: (usize, usize, usize) = (0, 1, 3);

fn packed_frame_size(resolution: Resolution) -> usize {
    resolution.chroma_width() * 4 * resolution.height as usize
}

fn packed_layout(resolution: Resolution, (y, cb, cr): (usize, usize, usize)) -> FrameLayout {
    let frame_size = packed_frame_size(resolution);
    FrameLayout {
        y: PlaneRange::strided(y, frame_size, 2),
        cb: PlaneRange::strided(cb, frame_size, 4),
        cr: PlaneRange::strided(cr, frame_size, 4),
        frame_size,
    }
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 7] = [
        PixelFormat::Yv12,
        PixelFormat::Iyuv,
        PixelFormat::Nv12,
        PixelFormat::Uyvy,
        PixelFormat::Yvyu,
        PixelFormat::Yuy2,
        PixelFormat::Y422,
    ];

    /// Tag used on the command line and in the registry.
    pub const fn tag(self) -> &'static str {
        match self {
            PixelFormat::Yv12 => "YV12",
            PixelFormat::Iyuv => "IYUV",
            PixelFormat::Nv12 => "NV12",
            PixelFormat::Uyvy => "UYVY",
            PixelFormat::Yvyu => "YVYU",
            PixelFormat::Yuy2 => "YUY2",
            PixelFormat::Y422 => "422",
        }
    }

    pub const fn subsampling(self) -> ChromaSubsampling {
        match self {
            PixelFormat::Yv12 | PixelFormat::Iyuv | PixelFormat::Nv12 => ChromaSubsampling::Yuv420,
            PixelFormat::Uyvy | PixelFormat::Yvyu | PixelFormat::Yuy2 | PixelFormat::Y422 => {
                ChromaSubsampling::Yuv422
            }
        }
    }

    pub fn frame_size(self, resolution: Resolution) -> usize {
        match self {
            PixelFormat::Uyvy | PixelFormat::Yvyu | PixelFormat::Yuy2 => {
                packed_frame_size(resolution)
            }
            PixelFormat::Yv12 | PixelFormat::Iyuv | PixelFormat::Nv12 | PixelFormat::Y422 => {
                planar_partition(resolution, self.subsampling())[5]
            }
        }
    }

    pub fn layout(self, resolution: Resolution) -> FrameLayout {
        match self {
            PixelFormat::Yv12 => {
                let [y0, y1, c0, c1, c2, c3] =
                    planar_partition(resolution, ChromaSubsampling::Yuv420);
                FrameLayout {
                    y: PlaneRange::contiguous(y0, y1),
                    cb: PlaneRange::contiguous(c2, c3),
                    cr: PlaneRange::contiguous(c0, c1),
                    frame_size: c3,
                }
            }
            PixelFormat::Iyuv | PixelFormat::Y422 => {
                let [y0, y1, c0, c1, c2, c3] = planar_partition(resolution, self.subsampling());
                FrameLayout {
                    y: PlaneRange::contiguous(y0, y1),
                    cb: PlaneRange::contiguous(c0, c1),
                    cr: PlaneRange::contiguous(c2, c3),
                    frame_size: c3,
                }
            }
            PixelFormat::Nv12 => {
                let [y0, y1, c0, _, _, c3] =
                    planar_partition(resolution, ChromaSubsampling::Yuv420);
                FrameLayout {
                    y: PlaneRange::contiguous(y0, y1),
                    cb: PlaneRange::strided(c0, c3, 2),
                    cr: PlaneRange::strided(c0 + 1, c3, 2),
                    frame_size: c3,
                }
            }
            PixelFormat::Uyvy => packed_layout(resolution, UYVY_OFFSETS),
            PixelFormat::Yvyu => packed_layout(resolution, YVYU_OFFSETS),
            PixelFormat::Yuy2 => packed_layout(resolution, YUY2_OFFSETS),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PixelFormat {
    type Err = PsnrError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        crate::registry::lookup(tag).map(|descriptor| descriptor.format)
    }
}
