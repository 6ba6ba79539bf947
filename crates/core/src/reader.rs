//! Whole-frame reads from a raw YUV byte stream.

use std::io::{ErrorKind, Read};
use std::path::PathBuf;

use crate::error::{PsnrError, Result};

/// One frame's bytes widened to signed samples, so differences never wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    samples: Vec<i32>,
}

impl RawFrame {
    pub fn zeroed(frame_size: usize) -> Self {
        Self {
            samples: vec![0; frame_size],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            samples: bytes.iter().map(|&b| i32::from(b)).collect(),
        }
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn fill_from(&mut self, bytes: &[u8]) {
        for (sample, &byte) in self.samples.iter_mut().zip(bytes) {
            *sample = i32::from(byte);
        }
    }
}

/// Reads frames of a fixed size, reusing one byte buffer and one [`RawFrame`].
pub struct FrameReader<R> {
    inner: R,
    source_name: String,
    frame_size: usize,
    frames_read: u64,
    buf: Vec<u8>,
    frame: RawFrame,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, source_name: impl Into<String>, frame_size: usize) -> Self {
        Self {
            inner,
            source_name: source_name.into(),
            frame_size,
            frames_read: 0,
            buf: vec![0u8; frame_size],
            frame: RawFrame::zeroed(frame_size),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame. A short read is an error, never a partial frame.
    pub fn read_frame(&mut self) -> Result<&RawFrame> {
        let mut total_read = 0;
        while total_read < self.frame_size {
            match self.inner.read(&mut self.buf[total_read..]) {
                Ok(0) => {
                    return Err(PsnrError::EndOfStream {
                        source_name: self.source_name.clone(),
                        frame: self.frames_read,
                        expected: self.frame_size,
                        received: total_read,
                    });
                }
                Ok(n) => total_read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(PsnrError::Io {
                        path: PathBuf::from(&self.source_name),
                        source,
                    });
                }
            }
        }

        self.frame.fill_from(&self.buf);
        self.frames_read += 1;
        Ok(&self.frame)
    }
}

/// Read exactly one frame of `frame_size` bytes from `stream`.
pub fn read_frame<R: Read>(stream: R, frame_size: usize) -> Result<RawFrame> {
    let mut reader = FrameReader::new(stream, "<stream>", frame_size);
    reader.read_frame().cloned()
}
