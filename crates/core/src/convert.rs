//! Rewriting a raw file from one pixel format into another with the same
//! plane sizes, e.g. YV12 to NV12 or UYVY to YUY2.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{PsnrError, Result};
use crate::format::{FrameLayout, Resolution};
use crate::planes::{pack, PlaneExtractor};
use crate::reader::FrameReader;
use crate::registry::{self, FormatDescriptor};
use crate::session::{file_len, frames_available, open_file, resolution_warnings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub format_in: String,
    pub format_out: String,
    pub num_frames: Option<u64>,
}

/// Input and output layouts, checked to carry planes of equal length.
#[derive(Debug, Clone, Copy)]
pub struct ConversionPlan {
    pub from: &'static FormatDescriptor,
    pub to: &'static FormatDescriptor,
    pub input_layout: FrameLayout,
    pub output_layout: FrameLayout,
}

impl ConversionPlan {
    pub fn new(format_in: &str, format_out: &str, resolution: Resolution) -> Result<Self> {
        let from = registry::lookup(format_in)?;
        let to = registry::lookup(format_out)?;
        let input_layout = from.layout(resolution);
        let output_layout = to.layout(resolution);

        let same_planes = input_layout
            .planes()
            .iter()
            .zip(output_layout.planes().iter())
            .all(|(a, b)| a.len() == b.len());
        if !same_planes {
            return Err(PsnrError::IncompatibleConversion {
                from: from.tag.to_string(),
                to: to.tag.to_string(),
            });
        }

        Ok(Self {
            from,
            to,
            input_layout,
            output_layout,
        })
    }

    /// Convert `frames` frames from `input` into `output`.
    pub fn convert_stream<R: Read, W: Write>(
        &self,
        mut input: FrameReader<R>,
        output: &mut W,
        output_name: &Path,
        frames: u64,
    ) -> Result<u64> {
        let extractor = PlaneExtractor::new(self.input_layout);
        let mut buf = vec![0u8; self.output_layout.frame_size];

        for _ in 0..frames {
            let planes = extractor.extract(input.read_frame()?);
            pack(&planes, &self.output_layout, &mut buf);
            output.write_all(&buf).map_err(|source| PsnrError::Io {
                path: output_name.to_path_buf(),
                source,
            })?;
        }
        output.flush().map_err(|source| PsnrError::Io {
            path: output_name.to_path_buf(),
            source,
        })?;
        Ok(frames)
    }
}

/// Convert a whole file. Returns the number of frames written.
pub fn convert(request: &ConversionRequest) -> Result<u64> {
    let resolution = Resolution::new(request.width, request.height)?;
    let plan = ConversionPlan::new(&request.format_in, &request.format_out, resolution)?;

    for warning in resolution_warnings(resolution) {
        warn!("{warning}");
    }

    let frame_size = plan.input_layout.frame_size;
    let (available, trailing) =
        frames_available(&request.input, file_len(&request.input)?, frame_size);
    if let Some(warning) = trailing {
        warn!("{warning}");
    }
    let frames = request
        .num_frames
        .map_or(available, |cap| available.min(cap));

    debug!(
        from = plan.from.tag,
        to = plan.to.tag,
        resolution = %resolution,
        frames,
        "Converting"
    );

    let reader = FrameReader::new(
        open_file(&request.input)?,
        request.input.display().to_string(),
        frame_size,
    );
    let written = write_atomically(&request.output, |writer| {
        plan.convert_stream(reader, writer, &request.output, frames)
    })?;
    info!(
        frames = written,
        output = %request.output.display(),
        "Conversion finished"
    );
    Ok(written)
}

/// Run `write` against a temporary file next to `output` and move it into
/// place only on success. On failure `output` is left untouched.
pub fn write_atomically<F>(output: &Path, write: F) -> Result<u64>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<u64>,
{
    let io_error = |source| PsnrError::Io {
        path: output.to_path_buf(),
        source,
    };
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;

    let written = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let written = write(&mut writer)?;
        writer.flush().map_err(io_error)?;
        written
    };

    staged
        .persist(output)
        .map_err(|error| io_error(error.error))?;
    Ok(written)
}
