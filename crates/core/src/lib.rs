//! Core crate for yuvpsnr: raw YUV frame layouts and PSNR comparison.

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod planes;
pub mod reader;
pub mod registry;
pub mod session;

pub use error::{PsnrError, Result, Warning};
pub use format::{ChromaSubsampling, FrameLayout, PixelFormat, PlaneRange, Resolution};
pub use session::{ComparisonRequest, ComparisonSession, PsnrSummary};
