//! Error and warning types shared by every stage of a comparison.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal conditions raised by the core.
#[derive(Debug, thiserror::Error)]
pub enum PsnrError {
    /// The format tag is not in the registry.
    #[error("unsupported pixel format: \"{tag}\"")]
    UnsupportedFormat { tag: String },

    #[error("invalid resolution {width}x{height}: width and height must be positive")]
    InvalidResolution { width: u32, height: u32 },

    /// A stream ran dry in the middle of a frame.
    #[error(
        "unexpected end of stream in {source_name} at frame {frame}: expected {expected} bytes, got {received}"
    )]
    EndOfStream {
        source_name: String,
        frame: u64,
        expected: usize,
        received: usize,
    },

    /// Nothing was left to average after the skip rule ran.
    #[error("no usable frames: {frames} frame(s) read, {skipped} skipped")]
    NoData { frames: u64, skipped: u64 },

    #[error("cannot convert {from} to {to}: plane sizes differ")]
    IncompatibleConversion { from: String, to: String },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = PsnrError> = std::result::Result<T, E>;

/// Advisory conditions. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    WidthNotMultipleOf16 { width: u32 },
    HeightNotMultipleOf16 { height: u32 },
    /// File size leaves a partial frame at the end.
    PartialTrailingFrame {
        path: PathBuf,
        frames: u64,
        remainder: u64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::WidthNotMultipleOf16 { width } => {
                write!(f, "width {width} is not divisible by 16")
            }
            Warning::HeightNotMultipleOf16 { height } => {
                write!(f, "height {height} is not divisible by 16")
            }
            Warning::PartialTrailingFrame {
                path,
                frames,
                remainder,
            } => write!(
                f,
                "{} holds {frames} whole frame(s) plus {remainder} trailing byte(s)",
                path.display()
            ),
        }
    }
}
