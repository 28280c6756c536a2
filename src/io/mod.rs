//! I/O module for reading and writing DXF files

pub mod dxf;

pub use dxf::{DxfReader, DxfWriter};
