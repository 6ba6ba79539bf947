use crate::error::{PsnrError, Result};
use crate::format::{ChromaSubsampling, FrameLayout, PixelFormat, Resolution};

/// Registry entry binding a tag to its layout functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub tag: &'static str,
    pub format: PixelFormat,
    pub subsampling: ChromaSubsampling,
}

impl FormatDescriptor {
    const fn new(format: PixelFormat) -> Self {
        Self {
            tag: format.tag(),
            format,
            subsampling: format.subsampling(),
        }
    }

    pub fn frame_size(&self, resolution: Resolution) -> usize {
        self.format.frame_size(resolution)
    }

    pub fn layout(&self, resolution: Resolution) -> FrameLayout {
        self.format.layout(resolution)
    }
}

static FORMATS: [FormatDescriptor; 7] = [
    FormatDescriptor::new(PixelFormat::Yv12),
    FormatDescriptor::new(PixelFormat::Iyuv),
    FormatDescriptor::new(PixelFormat::Nv12),
    FormatDescriptor::new(PixelFormat::Uyvy),
    FormatDescriptor::new(PixelFormat::Yvyu),
    FormatDescriptor::new(PixelFormat::Yuy2),
    FormatDescriptor::new(PixelFormat::Y422),
];

/// Resolve a format tag. Tags are case-sensitive.
pub fn lookup(tag: &str) -> Result<&'static FormatDescriptor> {
    FORMATS
        .iter()
        .find(|descriptor| descriptor.tag == tag)
        .ok_or_else(|| PsnrError::UnsupportedFormat {
            tag: tag.to_string(),
        })
}

pub fn descriptors() -> &'static [FormatDescriptor] {
    &FORMATS
}

pub fn list_tags() -> Vec<&'static str> {
    let mut tags: Vec<&'static str> = FORMATS.iter().map(|descriptor| descriptor.tag).collect();
    tags.sort_unstable();
    tags
}
