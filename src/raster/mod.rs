//! Tiled, interleave-aware access to general raster files.
//!
//! A general raster is a headerless (or fixed-header) block of samples
//! described by sidecar metadata: extent, band count, scalar type, band
//! interleave and byte order. This module reads arbitrary rectangles of
//! such rasters without loading them whole, and writes them back out.
//!
//! Supported interleaves:
//!
//! | Interleave     | File order                      | Reads per filled rectangle |
//! |----------------|---------------------------------|----------------------------|
//! | BIP            | line, sample, band              | one per line               |
//! | BIL            | line, band, sample              | one per line and band      |
//! | BSQ            | band, line, sample              | one per band and line      |
//! | BSQ multi-file | one file per band; line, sample | one per band and line      |
pub mod descriptor;
pub mod endian;
pub mod reader;
pub mod rect;
pub mod tile;
pub mod writer;

pub use descriptor::{BandValues, ByteOrder, Interleave, RasterDescriptor, ScalarType};
pub use endian::{swap_if_needed, swap_in_place};
pub use reader::{OpenOptions, RasterReader, TileSource};
pub use rect::Rect;
pub use tile::{Tile, TileStatus};
pub use writer::{write_raster, write_to};
