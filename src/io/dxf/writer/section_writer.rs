//! DXF section writers
//!
//! Writes HEADER, CLASSES, TABLES, BLOCKS, ENTITIES and OBJECTS from the
//! document graph, plus the sections the document kept as raw tags.

use super::stream_writer::{DxfStreamWriter, DxfStreamWriterExt};
use crate::blocks::{is_active_paperspace_name, is_modelspace_name, MODEL_SPACE_R12, PAPER_SPACE_R12};
use crate::document::CadDocument;
use crate::entities::EntityKind;
use crate::entity_db::EntityId;
use crate::error::Result;
use crate::io::dxf::code_page::code_page_for_encoding;
use crate::tables::TableKind;
use crate::tags::group_code::NAME_CODE;
use crate::tags::Tag;
use crate::types::DxfVersion;

const SECTIONS: [&str; 6] = ["HEADER", "CLASSES", "TABLES", "BLOCKS", "ENTITIES", "OBJECTS"];

/// Writes all DXF sections
pub struct SectionWriter<'a, W: DxfStreamWriter + ?Sized> {
    writer: &'a mut W,
    version: DxfVersion,
}

impl<'a, W: DxfStreamWriter + ?Sized> SectionWriter<'a, W> {
    /// Create a new section writer for the document revision `version`
    pub fn new(writer: &'a mut W, version: DxfVersion) -> Self {
        Self { writer, version }
    }

    fn legacy(&self) -> bool {
        self.version.is_legacy()
    }

    /// Write the whole document including `0/EOF`.
    ///
    /// Raw sections follow the section they followed in the source file.
    pub fn write_document(&mut self, document: &CadDocument) -> Result<()> {
        let mut written = vec![false; document.unknown_sections.len()];
        self.write_raw_after(document, None, &mut written)?;
        for name in SECTIONS {
            match name {
                "HEADER" => self.write_header(document)?,
                "CLASSES" => self.write_classes(document)?,
                "TABLES" => self.write_tables(document)?,
                "BLOCKS" => self.write_blocks(document)?,
                "ENTITIES" => self.write_entities(document)?,
                _ => self.write_objects(document)?,
            }
            self.write_raw_after(document, Some(name), &mut written)?;
        }
        // sections whose predecessor is gone
        for (index, section) in document.unknown_sections.iter().enumerate() {
            if !written[index] {
                self.write_raw(&section.name, &section.tags)?;
            }
        }
        self.writer.write_eof()
    }

    fn write_raw_after(
        &mut self,
        document: &CadDocument,
        after: Option<&str>,
        written: &mut [bool],
    ) -> Result<()> {
        for (index, section) in document.unknown_sections.iter().enumerate() {
            if written[index] || section.after.as_deref() != after {
                continue;
            }
            written[index] = true;
            self.write_raw(&section.name, &section.tags)?;
            self.write_raw_after(document, Some(&section.name), written)?;
        }
        Ok(())
    }

    fn write_raw(&mut self, name: &str, tags: &[Tag]) -> Result<()> {
        self.writer.write_section_start(name)?;
        self.writer.write_tags(tags)?;
        self.writer.write_section_end()
    }

    /// Write the HEADER section with `$ACADVER`, `$HANDSEED` and, for
    /// pre-R2007 output, `$DWGCODEPAGE` refreshed.
    pub fn write_header(&mut self, document: &CadDocument) -> Result<()> {
        let mut header = document.header.clone();
        header.set_value("$ACADVER", Tag::string(1, self.version.as_str()));
        header.set_value("$HANDSEED", Tag::handle(5, document.db().seed()));
        if !self.version.uses_utf8() {
            header.set_value(
                "$DWGCODEPAGE",
                Tag::string(3, code_page_for_encoding(document.encoding)),
            );
        }
        let mut tags = Vec::new();
        header.export_tags(&mut tags);

        self.writer.write_section_start("HEADER")?;
        self.writer.write_tags(&tags)?;
        self.writer.write_section_end()
    }

    /// Write the CLASSES section; R12 has none.
    pub fn write_classes(&mut self, document: &CadDocument) -> Result<()> {
        if self.legacy() {
            return Ok(());
        }
        self.writer.write_section_start("CLASSES")?;
        self.write_entities_of(document, document.classes.raw_ids())?;
        self.writer.write_section_end()
    }

    /// Write the TABLES section in the standard table order.
    ///
    /// TABLE head counts are refreshed; BLOCK_RECORD is not written for
    /// R12.
    pub fn write_tables(&mut self, document: &CadDocument) -> Result<()> {
        self.writer.write_section_start("TABLES")?;
        for kind in TableKind::ALL {
            if kind == TableKind::BlockRecord && self.legacy() {
                continue;
            }
            let table = document.tables.get(kind);
            let db = document.db();
            let entries: Vec<EntityId> = table.ids().filter(|id| db.is_alive(*id)).collect();

            let mut head = match table.head().and_then(|id| db.get(id)) {
                Some(head) => head.export_tags(self.version),
                None => vec![
                    Tag::string(0, "TABLE"),
                    Tag::string(NAME_CODE, kind.dxf_name()),
                ],
            };
            let count = Tag::int(70, entries.len() as i64);
            match head.iter_mut().find(|t| t.code == 70) {
                Some(tag) => *tag = count,
                None => head.push(count),
            }
            self.writer.write_tags(&head)?;
            self.write_entities_of(document, &entries)?;
            self.writer.write_string(0, "ENDTAB")?;
        }
        self.writer.write_section_end()
    }

    /// Write the BLOCKS section. Bodies of modelspace and the active
    /// paperspace go to ENTITIES.
    pub fn write_blocks(&mut self, document: &CadDocument) -> Result<()> {
        self.writer.write_section_start("BLOCKS")?;
        for id in document.section_ids("BLOCKS").unwrap_or_default() {
            let Some(entity) = document.db().get(id) else { continue };
            if !entity.is_alive() {
                continue;
            }
            let mut tags = entity.export_tags(self.version);
            if self.legacy() && entity.kind() == EntityKind::Block {
                rename_layout_block(&mut tags);
            }
            self.writer.write_tags(&tags)?;
        }
        self.writer.write_section_end()
    }

    /// Write the ENTITIES section: modelspace, then the active paperspace.
    pub fn write_entities(&mut self, document: &CadDocument) -> Result<()> {
        self.writer.write_section_start("ENTITIES")?;
        let ids = document.section_ids("ENTITIES").unwrap_or_default();
        self.write_entities_of(document, &ids)?;
        self.writer.write_section_end()
    }

    /// Write the OBJECTS section; R12 has none.
    pub fn write_objects(&mut self, document: &CadDocument) -> Result<()> {
        if self.legacy() {
            return Ok(());
        }
        self.writer.write_section_start("OBJECTS")?;
        self.write_entities_of(document, document.objects.space.raw_ids())?;
        self.writer.write_section_end()
    }

    fn write_entities_of(&mut self, document: &CadDocument, ids: &[EntityId]) -> Result<()> {
        for entity in ids.iter().filter_map(|id| document.db().get(*id)) {
            if entity.is_alive() {
                self.writer.write_tags(&entity.export_tags(self.version))?;
            }
        }
        Ok(())
    }
}

/// R12 names of the layout blocks
fn rename_layout_block(tags: &mut [Tag]) {
    for tag in tags.iter_mut().filter(|t| t.code == 2 || t.code == 3) {
        let name = tag.as_str().unwrap_or_default();
        let r12 = if is_modelspace_name(name) {
            MODEL_SPACE_R12
        } else if is_active_paperspace_name(name) {
            PAPER_SPACE_R12
        } else {
            continue;
        };
        *tag = Tag::string(tag.code, r12);
    }
}
