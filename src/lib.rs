//! # dxfcore
//!
//! Structure-preserving DXF reading and writing.
//!
//! A loaded document keeps every tag of every entity, so a document that
//! is read and saved without edits comes back with the same tables, blocks,
//! layouts and entities. Unknown entities, unknown sections and XDATA of
//! any application survive the round-trip.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dxfcore::{CadDocument, DxfReader, DxfReaderConfiguration, DxfWriter};
//!
//! // Read a DXF file, recording structural problems instead of failing
//! let config = DxfReaderConfiguration { failsafe: true, ..Default::default() };
//! let doc = DxfReader::from_file("sample.dxf")?
//!     .with_configuration(config)
//!     .read()?;
//!
//! for entity in doc.iterate_section("ENTITIES")? {
//!     println!("{} on layer {}", entity.dxftype(), entity.layer());
//! }
//!
//! DxfWriter::new(&doc).write_to_file("output.dxf")?;
//! # Ok::<(), dxfcore::DxfError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`tags`] - group code/value pairs and the raw tag codec types
//! - [`entity_db`] - handle registry owning all entities of a document
//! - [`entities`] - generic entity assembled from tags by a per-type schema
//! - [`tables`], [`blocks`], [`layouts`], [`objects`] - the section graph
//! - [`io::dxf`] - ASCII and binary DXF readers and writers
//! - [`xref`] - copying resources between documents

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod blocks;
pub mod document;
pub mod entities;
pub mod entity_db;
pub mod error;
pub mod header;
pub mod io;
pub mod layouts;
pub mod notification;
pub mod objects;
pub mod tables;
pub mod tags;
pub mod types;
pub mod xdata;
pub mod xref;

// Re-export commonly used types
pub use error::{DxfError, Result};
pub use types::{DxfVersion, Handle, Vector2, Vector3};

pub use blocks::{BlockLayout, ReferenceRule};
pub use document::CadDocument;
pub use entities::{DxfEntity, EntityKind};
pub use entity_db::{EntityDb, EntityId};
pub use io::dxf::{DxfFormat, DxfReaderConfiguration};
pub use io::{DxfReader, DxfWriter};
pub use notification::{Notification, NotificationType};
pub use tables::TableKind;
pub use tags::{Tag, TagValue};
