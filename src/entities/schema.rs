//! Attribute schemas
//!
//! Each supported entity kind maps `(subclass marker, group code)` to a
//! named, typed attribute. Tags matched by the schema become attributes;
//! everything else stays in place as raw tags. Legacy (R12) entities have
//! no subclasses and are matched by group code alone.

use crate::types::DxfVersion;
use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Value kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttribKind {
    Str,
    /// Hex handle stored as string
    Handle,
    Int,
    Double,
    Point,
}

/// One schema attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttribDef {
    pub name: &'static str,
    pub code: i32,
    /// `None` for the base class
    pub subclass: Option<&'static str>,
    pub kind: AttribKind,
    /// First revision that writes this attribute
    pub since: DxfVersion,
}

const fn def(
    name: &'static str,
    code: i32,
    subclass: Option<&'static str>,
    kind: AttribKind,
) -> AttribDef {
    AttribDef {
        name,
        code,
        subclass,
        kind,
        since: DxfVersion::AC1009,
    }
}

const fn def_since(
    name: &'static str,
    code: i32,
    subclass: Option<&'static str>,
    kind: AttribKind,
    since: DxfVersion,
) -> AttribDef {
    AttribDef {
        name,
        code,
        subclass,
        kind,
        since,
    }
}

use AttribKind::{Double, Handle, Int, Point, Str};

const ENTITY: Option<&str> = Some("AcDbEntity");
const SYMBOL_RECORD: &str = "AcDbSymbolTableRecord";

const BASE: &[AttribDef] = &[
    def("handle", 5, None, Handle),
    def_since("owner", 330, None, Handle, DxfVersion::AC1012),
];

const DIMSTYLE_BASE: &[AttribDef] = &[
    def("handle", 105, None, Handle),
    def_since("owner", 330, None, Handle, DxfVersion::AC1012),
];

const ENTITY_COMMON: &[AttribDef] = &[
    def("paperspace", 67, ENTITY, Int),
    def("layer", 8, ENTITY, Str),
    def("linetype", 6, ENTITY, Str),
    def("color", 62, ENTITY, Int),
    def_since("lineweight", 370, ENTITY, Int, DxfVersion::AC1015),
    def_since("ltscale", 48, ENTITY, Double, DxfVersion::AC1012),
    def_since("invisible", 60, ENTITY, Int, DxfVersion::AC1012),
    def_since("true_color", 420, ENTITY, Int, DxfVersion::AC1018),
    def_since("transparency", 440, ENTITY, Int, DxfVersion::AC1018),
];

const LINE: Option<&str> = Some("AcDbLine");
const LINE_ATTRIBS: &[AttribDef] = &[
    def("thickness", 39, LINE, Double),
    def("start", 10, LINE, Point),
    def("end", 11, LINE, Point),
    def("extrusion", 210, LINE, Point),
];

const POINT: Option<&str> = Some("AcDbPoint");
const POINT_ATTRIBS: &[AttribDef] = &[
    def("location", 10, POINT, Point),
    def("thickness", 39, POINT, Double),
    def("extrusion", 210, POINT, Point),
    def("angle", 50, POINT, Double),
];

const CIRCLE: Option<&str> = Some("AcDbCircle");
const CIRCLE_ATTRIBS: &[AttribDef] = &[
    def("thickness", 39, CIRCLE, Double),
    def("center", 10, CIRCLE, Point),
    def("radius", 40, CIRCLE, Double),
    def("extrusion", 210, CIRCLE, Point),
];

const ARC: Option<&str> = Some("AcDbArc");
const ARC_ATTRIBS: &[AttribDef] = &[
    def("start_angle", 50, ARC, Double),
    def("end_angle", 51, ARC, Double),
];

const TEXT: Option<&str> = Some("AcDbText");
const TEXT_ATTRIBS: &[AttribDef] = &[
    def("thickness", 39, TEXT, Double),
    def("insert", 10, TEXT, Point),
    def("height", 40, TEXT, Double),
    def("text", 1, TEXT, Str),
    def("rotation", 50, TEXT, Double),
    def("width", 41, TEXT, Double),
    def("oblique", 51, TEXT, Double),
    def("style", 7, TEXT, Str),
    def("text_generation_flag", 71, TEXT, Int),
    def("halign", 72, TEXT, Int),
    def("align_point", 11, TEXT, Point),
    def("extrusion", 210, TEXT, Point),
    def("valign", 73, TEXT, Int),
];

const ATTRIB: Option<&str> = Some("AcDbAttribute");
const ATTRIB_ATTRIBS: &[AttribDef] = &[
    def("tag", 2, ATTRIB, Str),
    def("flags", 70, ATTRIB, Int),
    def("field_length", 73, ATTRIB, Int),
];

const ATTDEF: Option<&str> = Some("AcDbAttributeDefinition");
const ATTDEF_ATTRIBS: &[AttribDef] = &[
    def("prompt", 3, ATTDEF, Str),
    def("tag", 2, ATTDEF, Str),
    def("flags", 70, ATTDEF, Int),
    def("field_length", 73, ATTDEF, Int),
];

const BLOCKREF: Option<&str> = Some("AcDbBlockReference");
const INSERT_ATTRIBS: &[AttribDef] = &[
    def("attribs_follow", 66, BLOCKREF, Int),
    def("name", 2, BLOCKREF, Str),
    def("insert", 10, BLOCKREF, Point),
    def("xscale", 41, BLOCKREF, Double),
    def("yscale", 42, BLOCKREF, Double),
    def("zscale", 43, BLOCKREF, Double),
    def("rotation", 50, BLOCKREF, Double),
    def("column_count", 70, BLOCKREF, Int),
    def("row_count", 71, BLOCKREF, Int),
    def("column_spacing", 44, BLOCKREF, Double),
    def("row_spacing", 45, BLOCKREF, Double),
    def("extrusion", 210, BLOCKREF, Point),
];

const LWPOLYLINE: Option<&str> = Some("AcDbPolyline");
const LWPOLYLINE_ATTRIBS: &[AttribDef] = &[
    def("count", 90, LWPOLYLINE, Int),
    def("flags", 70, LWPOLYLINE, Int),
    def("const_width", 43, LWPOLYLINE, Double),
    def("elevation", 38, LWPOLYLINE, Double),
    def("thickness", 39, LWPOLYLINE, Double),
    def("extrusion", 210, LWPOLYLINE, Point),
];

const DIMENSION: Option<&str> = Some("AcDbDimension");
const DIMENSION_ATTRIBS: &[AttribDef] = &[
    def("geometry", 2, DIMENSION, Str),
    def("dimstyle", 3, DIMENSION, Str),
    def("defpoint", 10, DIMENSION, Point),
    def("text_midpoint", 11, DIMENSION, Point),
    def("dimtype", 70, DIMENSION, Int),
    def("text", 1, DIMENSION, Str),
    def("extrusion", 210, DIMENSION, Point),
];

const BLOCK_BEGIN: Option<&str> = Some("AcDbBlockBegin");
const BLOCK_ATTRIBS: &[AttribDef] = &[
    def("name", 2, BLOCK_BEGIN, Str),
    def("flags", 70, BLOCK_BEGIN, Int),
    def("base_point", 10, BLOCK_BEGIN, Point),
    def("name2", 3, BLOCK_BEGIN, Str),
    def("xref_path", 1, BLOCK_BEGIN, Str),
    def("description", 4, BLOCK_BEGIN, Str),
];

const TABLE_HEAD_ATTRIBS: &[AttribDef] = &[
    def("name", 2, None, Str),
    def("count", 70, Some("AcDbSymbolTable"), Int),
];

const LAYER: Option<&str> = Some("AcDbLayerTableRecord");
const LAYER_ATTRIBS: &[AttribDef] = &[
    def("name", 2, LAYER, Str),
    def("flags", 70, LAYER, Int),
    def("color", 62, LAYER, Int),
    def("linetype", 6, LAYER, Str),
    def_since("plot", 290, LAYER, Int, DxfVersion::AC1015),
    def_since("lineweight", 370, LAYER, Int, DxfVersion::AC1015),
    def_since("plotstyle_handle", 390, LAYER, Handle, DxfVersion::AC1015),
    def_since("material_handle", 347, LAYER, Handle, DxfVersion::AC1018),
];

const LTYPE: Option<&str> = Some("AcDbLinetypeTableRecord");
const LTYPE_ATTRIBS: &[AttribDef] = &[
    def("name", 2, LTYPE, Str),
    def("flags", 70, LTYPE, Int),
    def("description", 3, LTYPE, Str),
    def("alignment", 72, LTYPE, Int),
    def("items", 73, LTYPE, Int),
    def("total_pattern_length", 40, LTYPE, Double),
];

const STYLE: Option<&str> = Some("AcDbTextStyleTableRecord");
const STYLE_ATTRIBS: &[AttribDef] = &[
    def("name", 2, STYLE, Str),
    def("flags", 70, STYLE, Int),
    def("height", 40, STYLE, Double),
    def("width", 41, STYLE, Double),
    def("oblique", 50, STYLE, Double),
    def("generation_flags", 71, STYLE, Int),
    def("last_height", 42, STYLE, Double),
    def("font", 3, STYLE, Str),
    def("bigfont", 4, STYLE, Str),
];

const VIEW: Option<&str> = Some("AcDbViewTableRecord");
const VIEW_ATTRIBS: &[AttribDef] = &[
    def("name", 2, VIEW, Str),
    def("flags", 70, VIEW, Int),
    def("height", 40, VIEW, Double),
    def("width", 41, VIEW, Double),
    def("center", 10, VIEW, Point),
    def("direction", 11, VIEW, Point),
    def("target", 12, VIEW, Point),
];

const VPORT: Option<&str> = Some("AcDbViewportTableRecord");
const VPORT_ATTRIBS: &[AttribDef] = &[
    def("name", 2, VPORT, Str),
    def("flags", 70, VPORT, Int),
    def("lower_left", 10, VPORT, Point),
    def("upper_right", 11, VPORT, Point),
    def("center", 12, VPORT, Point),
    def("height", 40, VPORT, Double),
    def("aspect_ratio", 41, VPORT, Double),
];

const UCS: Option<&str> = Some("AcDbUCSTableRecord");
const UCS_ATTRIBS: &[AttribDef] = &[
    def("name", 2, UCS, Str),
    def("flags", 70, UCS, Int),
    def("origin", 10, UCS, Point),
    def("xaxis", 11, UCS, Point),
    def("yaxis", 12, UCS, Point),
];

const APPID: Option<&str> = Some("AcDbRegAppTableRecord");
const APPID_ATTRIBS: &[AttribDef] = &[def("name", 2, APPID, Str), def("flags", 70, APPID, Int)];

const DIMSTYLE: Option<&str> = Some("AcDbDimStyleTableRecord");
const DIMSTYLE_ATTRIBS: &[AttribDef] = &[
    def("name", 2, DIMSTYLE, Str),
    def("flags", 70, DIMSTYLE, Int),
    def("dimpost", 3, DIMSTYLE, Str),
    def("dimapost", 4, DIMSTYLE, Str),
    def("dimblk_name", 5, DIMSTYLE, Str),
    def("dimblk1_name", 6, DIMSTYLE, Str),
    def("dimblk2_name", 7, DIMSTYLE, Str),
    def("dimscale", 40, DIMSTYLE, Double),
    def("dimasz", 41, DIMSTYLE, Double),
    def("dimtxt", 140, DIMSTYLE, Double),
    def_since("dimtxsty_handle", 340, DIMSTYLE, Handle, DxfVersion::AC1015),
    def_since("dimldrblk_handle", 341, DIMSTYLE, Handle, DxfVersion::AC1015),
    def_since("dimblk_handle", 342, DIMSTYLE, Handle, DxfVersion::AC1015),
    def_since("dimblk1_handle", 343, DIMSTYLE, Handle, DxfVersion::AC1015),
    def_since("dimblk2_handle", 344, DIMSTYLE, Handle, DxfVersion::AC1015),
];

const BLOCK_RECORD: Option<&str> = Some("AcDbBlockTableRecord");
const BLOCK_RECORD_ATTRIBS: &[AttribDef] = &[
    def("name", 2, BLOCK_RECORD, Str),
    def_since("layout", 340, BLOCK_RECORD, Handle, DxfVersion::AC1015),
    def_since("units", 70, BLOCK_RECORD, Int, DxfVersion::AC1021),
    def_since("explode", 280, BLOCK_RECORD, Int, DxfVersion::AC1021),
    def_since("scale", 281, BLOCK_RECORD, Int, DxfVersion::AC1021),
];

const CLASS_ATTRIBS: &[AttribDef] = &[
    def("name", 1, None, Str),
    def("cpp_class_name", 2, None, Str),
    def("app_name", 3, None, Str),
    def("flags", 90, None, Int),
    def_since("instance_count", 91, None, Int, DxfVersion::AC1018),
    def("was_a_proxy", 280, None, Int),
    def("is_an_entity", 281, None, Int),
];

const DICTIONARY: Option<&str> = Some("AcDbDictionary");
const DICTIONARY_ATTRIBS: &[AttribDef] = &[
    def("hard_owned", 280, DICTIONARY, Int),
    def("cloning", 281, DICTIONARY, Int),
];

const LAYOUT: Option<&str> = Some("AcDbLayout");
const LAYOUT_ATTRIBS: &[AttribDef] = &[
    def("page_setup_name", 1, Some("AcDbPlotSettings"), Str),
    def("name", 1, LAYOUT, Str),
    def("flags", 70, LAYOUT, Int),
    def("taborder", 71, LAYOUT, Int),
    def("block_record_handle", 330, LAYOUT, Handle),
    def("viewport_handle", 331, LAYOUT, Handle),
];

const XRECORD_ATTRIBS: &[AttribDef] = &[def("cloning", 280, Some("AcDbXrecord"), Int)];

const OPAQUE_ATTRIBS: &[AttribDef] = &[def("paperspace", 67, ENTITY, Int)];

/// Supported entity kinds, anything else is opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Line,
    Point,
    Circle,
    Arc,
    Text,
    Attrib,
    AttDef,
    Insert,
    LwPolyline,
    Polyline,
    Vertex,
    SeqEnd,
    Dimension,
    Block,
    EndBlk,
    TableHead,
    Layer,
    LineType,
    TextStyle,
    View,
    VPort,
    Ucs,
    AppId,
    DimStyle,
    BlockRecord,
    Class,
    Dictionary,
    Layout,
    XRecord,
    Opaque,
}

impl EntityKind {
    pub fn from_dxftype(dxftype: &str) -> Self {
        match dxftype {
            "LINE" => Self::Line,
            "POINT" => Self::Point,
            "CIRCLE" => Self::Circle,
            "ARC" => Self::Arc,
            "TEXT" => Self::Text,
            "ATTRIB" => Self::Attrib,
            "ATTDEF" => Self::AttDef,
            "INSERT" => Self::Insert,
            "LWPOLYLINE" => Self::LwPolyline,
            "POLYLINE" => Self::Polyline,
            "VERTEX" => Self::Vertex,
            "SEQEND" => Self::SeqEnd,
            "DIMENSION" => Self::Dimension,
            "BLOCK" => Self::Block,
            "ENDBLK" => Self::EndBlk,
            "TABLE" => Self::TableHead,
            "LAYER" => Self::Layer,
            "LTYPE" => Self::LineType,
            "STYLE" => Self::TextStyle,
            "VIEW" => Self::View,
            "VPORT" => Self::VPort,
            "UCS" => Self::Ucs,
            "APPID" => Self::AppId,
            "DIMSTYLE" => Self::DimStyle,
            "BLOCK_RECORD" => Self::BlockRecord,
            "CLASS" => Self::Class,
            "DICTIONARY" => Self::Dictionary,
            "LAYOUT" => Self::Layout,
            "XRECORD" => Self::XRecord,
            _ => Self::Opaque,
        }
    }

    /// Table entry kinds
    pub fn is_table_entry(&self) -> bool {
        matches!(
            self,
            Self::Layer
                | Self::LineType
                | Self::TextStyle
                | Self::View
                | Self::VPort
                | Self::Ucs
                | Self::AppId
                | Self::DimStyle
                | Self::BlockRecord
        )
    }

    /// Entities owned by a preceding INSERT or POLYLINE
    pub fn is_sub_entity(&self) -> bool {
        matches!(self, Self::Attrib | Self::Vertex | Self::SeqEnd)
    }

    pub fn schema(&self) -> &'static EntitySchema {
        // every kind is registered by build_schemas
        SCHEMAS
            .get(self)
            .unwrap_or_else(|| &SCHEMAS[&EntityKind::Opaque])
    }
}

/// Attribute layout of one entity kind
#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Subclass markers an R13+ entity of this kind must carry
    pub markers: Vec<&'static str>,
    pub attribs: Vec<AttribDef>,
}

impl EntitySchema {
    fn new(kind: EntityKind, markers: &[&'static str], parts: &[&[AttribDef]]) -> Self {
        Self {
            kind,
            markers: markers.to_vec(),
            attribs: parts.iter().flat_map(|p| p.iter().copied()).collect(),
        }
    }

    /// Definition for a tag at `code` inside `subclass`.
    pub fn find(&self, subclass: Option<&str>, code: i32, legacy: bool) -> Option<&AttribDef> {
        if legacy {
            return self.attribs.iter().find(|d| d.code == code);
        }
        self.attribs
            .iter()
            .find(|d| d.code == code && d.subclass == subclass)
    }

    pub fn get(&self, name: &str) -> Option<&AttribDef> {
        self.attribs.iter().find(|d| d.name == name)
    }

    pub fn handle_code(&self) -> Option<i32> {
        self.get("handle").map(|d| d.code)
    }
}

static SCHEMAS: Lazy<AHashMap<EntityKind, EntitySchema>> = Lazy::new(build_schemas);

fn build_schemas() -> AHashMap<EntityKind, EntitySchema> {
    use EntityKind as K;
    let entity = "AcDbEntity";
    let schemas = vec![
        EntitySchema::new(K::Line, &[entity, "AcDbLine"], &[BASE, ENTITY_COMMON, LINE_ATTRIBS]),
        EntitySchema::new(K::Point, &[entity, "AcDbPoint"], &[BASE, ENTITY_COMMON, POINT_ATTRIBS]),
        EntitySchema::new(
            K::Circle,
            &[entity, "AcDbCircle"],
            &[BASE, ENTITY_COMMON, CIRCLE_ATTRIBS],
        ),
        EntitySchema::new(
            K::Arc,
            &[entity, "AcDbCircle", "AcDbArc"],
            &[BASE, ENTITY_COMMON, CIRCLE_ATTRIBS, ARC_ATTRIBS],
        ),
        EntitySchema::new(K::Text, &[entity, "AcDbText"], &[BASE, ENTITY_COMMON, TEXT_ATTRIBS]),
        EntitySchema::new(
            K::Attrib,
            &[entity, "AcDbText", "AcDbAttribute"],
            &[BASE, ENTITY_COMMON, TEXT_ATTRIBS, ATTRIB_ATTRIBS],
        ),
        EntitySchema::new(
            K::AttDef,
            &[entity, "AcDbText", "AcDbAttributeDefinition"],
            &[BASE, ENTITY_COMMON, TEXT_ATTRIBS, ATTDEF_ATTRIBS],
        ),
        EntitySchema::new(
            K::Insert,
            &[entity, "AcDbBlockReference"],
            &[BASE, ENTITY_COMMON, INSERT_ATTRIBS],
        ),
        EntitySchema::new(
            K::LwPolyline,
            &[entity, "AcDbPolyline"],
            &[BASE, ENTITY_COMMON, LWPOLYLINE_ATTRIBS],
        ),
        EntitySchema::new(K::Polyline, &[entity], &[BASE, ENTITY_COMMON]),
        EntitySchema::new(K::Vertex, &[entity], &[BASE, ENTITY_COMMON]),
        EntitySchema::new(K::SeqEnd, &[entity], &[BASE, ENTITY_COMMON]),
        EntitySchema::new(
            K::Dimension,
            &[entity, "AcDbDimension"],
            &[BASE, ENTITY_COMMON, DIMENSION_ATTRIBS],
        ),
        EntitySchema::new(
            K::Block,
            &[entity, "AcDbBlockBegin"],
            &[BASE, ENTITY_COMMON, BLOCK_ATTRIBS],
        ),
        EntitySchema::new(K::EndBlk, &[entity, "AcDbBlockEnd"], &[BASE, ENTITY_COMMON]),
        EntitySchema::new(K::TableHead, &["AcDbSymbolTable"], &[BASE, TABLE_HEAD_ATTRIBS]),
        EntitySchema::new(
            K::Layer,
            &[SYMBOL_RECORD, "AcDbLayerTableRecord"],
            &[BASE, LAYER_ATTRIBS],
        ),
        EntitySchema::new(
            K::LineType,
            &[SYMBOL_RECORD, "AcDbLinetypeTableRecord"],
            &[BASE, LTYPE_ATTRIBS],
        ),
        EntitySchema::new(
            K::TextStyle,
            &[SYMBOL_RECORD, "AcDbTextStyleTableRecord"],
            &[BASE, STYLE_ATTRIBS],
        ),
        EntitySchema::new(
            K::View,
            &[SYMBOL_RECORD, "AcDbViewTableRecord"],
            &[BASE, VIEW_ATTRIBS],
        ),
        EntitySchema::new(
            K::VPort,
            &[SYMBOL_RECORD, "AcDbViewportTableRecord"],
            &[BASE, VPORT_ATTRIBS],
        ),
        EntitySchema::new(K::Ucs, &[SYMBOL_RECORD, "AcDbUCSTableRecord"], &[BASE, UCS_ATTRIBS]),
        EntitySchema::new(
            K::AppId,
            &[SYMBOL_RECORD, "AcDbRegAppTableRecord"],
            &[BASE, APPID_ATTRIBS],
        ),
        EntitySchema::new(
            K::DimStyle,
            &[SYMBOL_RECORD, "AcDbDimStyleTableRecord"],
            &[DIMSTYLE_BASE, DIMSTYLE_ATTRIBS],
        ),
        EntitySchema::new(
            K::BlockRecord,
            &[SYMBOL_RECORD, "AcDbBlockTableRecord"],
            &[BASE, BLOCK_RECORD_ATTRIBS],
        ),
        EntitySchema::new(K::Class, &[], &[CLASS_ATTRIBS]),
        EntitySchema::new(K::Dictionary, &["AcDbDictionary"], &[BASE, DICTIONARY_ATTRIBS]),
        EntitySchema::new(
            K::Layout,
            &["AcDbPlotSettings", "AcDbLayout"],
            &[BASE, LAYOUT_ATTRIBS],
        ),
        EntitySchema::new(K::XRecord, &["AcDbXrecord"], &[BASE, XRECORD_ATTRIBS]),
        EntitySchema::new(K::Opaque, &[], &[BASE, OPAQUE_ATTRIBS]),
    ];
    schemas.into_iter().map(|s| (s.kind, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup() {
        assert_eq!(EntityKind::from_dxftype("LINE"), EntityKind::Line);
        assert_eq!(EntityKind::from_dxftype("3DSOLID"), EntityKind::Opaque);
        assert_eq!(EntityKind::from_dxftype("ACAD_PROXY_ENTITY"), EntityKind::Opaque);
        assert!(EntityKind::Layer.is_table_entry());
        assert!(EntityKind::SeqEnd.is_sub_entity());
    }

    #[test]
    fn test_find_by_subclass() {
        let schema = EntityKind::Layout.schema();
        let page = schema.find(Some("AcDbPlotSettings"), 1, false).unwrap();
        assert_eq!(page.name, "page_setup_name");
        let name = schema.find(Some("AcDbLayout"), 1, false).unwrap();
        assert_eq!(name.name, "name");
        assert!(schema.find(None, 1, false).is_none());
    }

    #[test]
    fn test_legacy_lookup_ignores_subclass() {
        let schema = EntityKind::Line.schema();
        assert_eq!(schema.find(None, 8, true).map(|d| d.name), Some("layer"));
        assert_eq!(schema.find(None, 11, true).map(|d| d.name), Some("end"));
    }

    #[test]
    fn test_dimstyle_handle_code() {
        assert_eq!(EntityKind::DimStyle.schema().handle_code(), Some(105));
        assert_eq!(EntityKind::Layer.schema().handle_code(), Some(5));
        assert_eq!(EntityKind::Class.schema().handle_code(), None);
    }

    #[test]
    fn test_every_kind_has_schema() {
        assert_eq!(EntityKind::Arc.schema().kind, EntityKind::Arc);
        assert_eq!(EntityKind::XRecord.schema().kind, EntityKind::XRecord);
        assert_eq!(EntityKind::Opaque.schema().markers.len(), 0);
    }
}
