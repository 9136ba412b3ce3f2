//! Error type shared by the raster access layer and the B-spline filters.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::raster::ScalarType;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported spline order: {0} (must be in 0..=5)")]
    UnsupportedOrder(usize),

    #[error("Cannot open {}: {source}", path.display())]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Seek to byte {offset} failed: {source}")]
    SeekFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Short read at byte {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Read at byte {offset} failed: {source}")]
    ReadFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("File {} too small: expected at least {expected} bytes, found {actual}", path.display())]
    FileTooSmall {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid raster descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Invalid resolution level: {0}")]
    InvalidResLevel(u32),

    #[error("Raster is not open")]
    NotOpen,

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Scalar type mismatch: raster holds {actual:?}, requested a {expected}-byte type")]
    ScalarMismatch { expected: usize, actual: ScalarType },

    #[error("No input image set")]
    NoInputImage,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
