//! DXF (Drawing Exchange Format) reading and writing

pub mod code_page;
pub mod reader;
pub mod unicode;
pub mod writer;

pub use reader::{
    decode_tags, detect_format, read_dxf, DecodedTags, DxfReader, DxfReaderConfiguration,
    LoadStage,
};
pub use writer::{encode_tags, write_binary_dxf, write_dxf, DxfWriter, EncodeOptions};

/// Physical DXF format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxfFormat {
    Ascii,
    Binary,
}
