//! Assembled DXF entities
//!
//! A [`DxfEntity`] is built from the [`ExtendedTags`] of one entity. Each
//! subclass keeps its tags as an ordered list of slots: tags matched by the
//! entity schema are bound to named attributes, all other tags stay raw in
//! their original position so that saving reproduces them unchanged.

pub mod schema;
pub mod space;

pub use schema::{AttribDef, AttribKind, EntityKind, EntitySchema};
pub use space::EntitySpace;

use crate::error::{DxfError, Result};
use crate::tags::extended::appdata_name;
use crate::tags::group_code::{
    is_translatable_pointer, PointerKind, APP_DATA_MARKER, STRUCTURE_MARKER, SUBCLASS_MARKER,
};
use crate::tags::{ExtendedTags, Tag, TagValue};
use crate::types::{DxfVersion, Handle, Vector3};
use crate::xdata::XData;
use indexmap::IndexMap;

/// One position inside a subclass
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Tag not covered by the schema, kept verbatim
    Tag(Tag),
    /// Bound attribute, value lives in the attribute namespace
    Attrib(&'static str),
    /// AppData group by index
    AppData(usize),
}

/// Tags of one subclass; the base class has no marker
#[derive(Debug, Clone, PartialEq)]
pub struct Subclass {
    pub marker: Option<String>,
    pub slots: Vec<Slot>,
}

impl Subclass {
    fn new(marker: Option<&str>) -> Self {
        Self {
            marker: marker.map(str::to_string),
            slots: Vec::new(),
        }
    }
}

/// A structured DXF entity, table entry or object
#[derive(Debug, Clone, PartialEq)]
pub struct DxfEntity {
    dxftype: String,
    kind: EntityKind,
    legacy: bool,
    subclasses: Vec<Subclass>,
    appdata: Vec<Vec<Tag>>,
    embedded_objects: Vec<Vec<Tag>>,
    /// XDATA lists by AppID
    pub xdata: XData,
    dxf: IndexMap<&'static str, TagValue>,
    alive: bool,
}

impl DxfEntity {
    /// New empty entity with the subclass layout of `dxftype`.
    pub fn new(dxftype: impl Into<String>, version: DxfVersion) -> Self {
        let dxftype = dxftype.into();
        let kind = EntityKind::from_dxftype(&dxftype);
        let legacy = version.is_legacy();
        let mut subclasses = vec![Subclass::new(None)];
        if !legacy {
            subclasses.extend(kind.schema().markers.iter().map(|m| Subclass::new(Some(m))));
        }
        Self {
            dxftype,
            kind,
            legacy,
            subclasses,
            appdata: Vec::new(),
            embedded_objects: Vec::new(),
            xdata: XData::new(),
            dxf: IndexMap::new(),
            alive: true,
        }
    }

    /// Assemble an entity from its split tags.
    ///
    /// Returns a structure error when an R13+ entity of a supported type
    /// lacks one of its mandatory subclasses.
    pub fn load(xtags: ExtendedTags, legacy: bool) -> Result<Self> {
        let dxftype = xtags.dxftype().to_string();
        let kind = EntityKind::from_dxftype(&dxftype);
        let schema = kind.schema();

        if !legacy {
            let present = xtags.subclass_markers();
            if let Some(missing) = schema.markers.iter().find(|m| !present.contains(m)) {
                return Err(DxfError::Structure(format!(
                    "{} entity without mandatory subclass {}",
                    dxftype, missing
                )));
            }
        }

        let ExtendedTags {
            subclasses: raw_subclasses,
            appdata,
            embedded_objects,
            xdata,
        } = xtags;

        let mut dxf = IndexMap::new();
        let mut subclasses = Vec::with_capacity(raw_subclasses.len());
        for (index, tags) in raw_subclasses.into_iter().enumerate() {
            let mut iter = tags.into_iter();
            // first tag is 0/TYPE or 100/marker
            let head = iter.next();
            let marker = if index == 0 {
                None
            } else {
                head.as_ref().and_then(|t| t.as_str()).map(str::to_string)
            };
            let mut subclass = Subclass {
                marker,
                slots: Vec::new(),
            };
            for tag in iter {
                if let (APP_DATA_MARKER, TagValue::Integer(i)) = (tag.code, &tag.value) {
                    subclass.slots.push(Slot::AppData(*i as usize));
                    continue;
                }
                let def = schema
                    .find(subclass.marker.as_deref(), tag.code, legacy)
                    .filter(|d| !dxf.contains_key(d.name) && kind_matches(d.kind, &tag.value));
                let slot = match def {
                    Some(def) => {
                        dxf.insert(def.name, tag.value);
                        Slot::Attrib(def.name)
                    }
                    None => Slot::Tag(tag),
                };
                subclass.slots.push(slot);
            }
            subclasses.push(subclass);
        }

        Ok(Self {
            dxftype,
            kind,
            legacy,
            subclasses,
            appdata,
            embedded_objects,
            xdata,
            dxf,
            alive: true,
        })
    }

    /// Assemble from a flat tag run.
    pub fn from_tags(tags: Vec<Tag>, legacy: bool) -> Result<Self> {
        Self::load(ExtendedTags::from_tags(tags, legacy)?, legacy)
    }

    pub fn dxftype(&self) -> &str {
        &self.dxftype
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.kind.schema()
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Mark as destroyed; containers skip it on iteration from now on.
    pub fn destroy(&mut self) {
        self.alive = false;
    }

    pub fn subclasses(&self) -> &[Subclass] {
        &self.subclasses
    }

    pub fn subclass_markers(&self) -> Vec<&str> {
        self.subclasses
            .iter()
            .filter_map(|s| s.marker.as_deref())
            .collect()
    }

    pub fn has_subclass(&self, marker: &str) -> bool {
        self.subclasses
            .iter()
            .any(|s| s.marker.as_deref() == Some(marker))
    }

    /// Append an empty subclass unless it exists.
    pub fn add_subclass(&mut self, marker: &str) {
        if !self.legacy && !self.has_subclass(marker) {
            self.subclasses.push(Subclass::new(Some(marker)));
        }
    }

    /// Subclass by marker, `None` selects the base class
    pub fn subclass_mut(&mut self, marker: Option<&str>) -> Option<&mut Subclass> {
        if marker.is_none() || self.legacy {
            return self.subclasses.first_mut();
        }
        self.subclasses
            .iter_mut()
            .find(|s| s.marker.as_deref() == marker)
    }

    // -- attribute namespace --

    pub fn is_supported(&self, name: &str) -> bool {
        self.schema().get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.dxf.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.dxf.get(name) {
            Some(TagValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.dxf.get(name) {
            Some(TagValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.dxf.get(name) {
            Some(TagValue::Double(v)) => Some(*v),
            Some(TagValue::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_point(&self, name: &str) -> Option<Vector3> {
        match self.dxf.get(name) {
            Some(TagValue::Point3(p)) => Some(*p),
            Some(TagValue::Point2(p)) => Some(p.to_3d()),
            _ => None,
        }
    }

    pub fn get_handle(&self, name: &str) -> Option<Handle> {
        self.get_str(name).and_then(|s| Handle::from_hex(s).ok())
    }

    /// Set an attribute, checked against the schema.
    pub fn set(&mut self, name: &str, value: impl Into<TagValue>) -> Result<()> {
        let def = *self
            .schema()
            .get(name)
            .ok_or_else(|| DxfError::UnknownAttribute {
                dxftype: self.dxftype.clone(),
                attrib: name.to_string(),
            })?;
        let value = coerce(def.kind, value.into()).map_err(|message| DxfError::InvalidValue {
            name: name.to_string(),
            message,
        })?;
        if !self.legacy {
            if let Some(marker) = def.subclass {
                if !self.has_subclass(marker) {
                    self.subclasses.push(Subclass::new(Some(marker)));
                }
            }
        }
        self.dxf.insert(def.name, value);
        Ok(())
    }

    /// Set an attribute known to be valid for this entity kind.
    pub(crate) fn put(&mut self, name: &str, value: impl Into<TagValue>) {
        if let Some(def) = self.schema().get(name).copied() {
            if let Some(marker) = def.subclass {
                self.add_subclass(marker);
            }
            self.dxf.insert(def.name, value.into());
        }
    }

    /// Remove an attribute value; the slot is dropped on save.
    pub fn discard(&mut self, name: &str) -> Option<TagValue> {
        self.dxf.shift_remove(name)
    }

    pub fn attribs(&self) -> impl Iterator<Item = (&'static str, &TagValue)> {
        self.dxf.iter().map(|(k, v)| (*k, v))
    }

    pub fn handle(&self) -> Option<Handle> {
        self.get_handle("handle").filter(|h| !h.is_null())
    }

    pub fn set_handle(&mut self, handle: Handle) -> Result<()> {
        self.set("handle", handle)
    }

    pub fn owner(&self) -> Option<Handle> {
        self.get_handle("owner").filter(|h| !h.is_null())
    }

    pub fn set_owner(&mut self, owner: Handle) -> Result<()> {
        self.set("owner", owner)
    }

    /// Layer name, "0" when unset
    pub fn layer(&self) -> &str {
        self.get_str("layer").unwrap_or("0")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn paperspace(&self) -> bool {
        self.get_int("paperspace").unwrap_or(0) != 0
    }

    // -- AppData --

    pub fn appdata(&self) -> &[Vec<Tag>] {
        &self.appdata
    }

    /// AppData group by application name, without the `{NAME`/`}` tags
    pub fn app_data(&self, name: &str) -> Option<&[Tag]> {
        self.appdata
            .iter()
            .find(|g| appdata_name(g) == Some(name))
            .map(|g| &g[1..g.len().saturating_sub(1)])
    }

    /// Replace or add an AppData group in the base class.
    pub fn set_app_data(&mut self, name: &str, tags: Vec<Tag>) {
        let mut group = Vec::with_capacity(tags.len() + 2);
        group.push(Tag::string(APP_DATA_MARKER, format!("{{{}", name)));
        group.extend(tags);
        group.push(Tag::string(APP_DATA_MARKER, "}"));
        if let Some(index) = self.appdata.iter().position(|g| appdata_name(g) == Some(name)) {
            self.appdata[index] = group;
            return;
        }
        let index = self.appdata.len();
        self.appdata.push(group);
        // after handle and other AppData, before the owner tag
        let base = &mut self.subclasses[0].slots;
        let at = base
            .iter()
            .position(|s| matches!(s, Slot::Attrib("owner")))
            .unwrap_or(base.len());
        base.insert(at, Slot::AppData(index));
    }

    pub fn reactors(&self) -> Vec<Handle> {
        self.app_data("ACAD_REACTORS")
            .map(|tags| tags.iter().filter_map(Tag::as_handle).collect())
            .unwrap_or_default()
    }

    pub fn extension_dict(&self) -> Option<Handle> {
        self.app_data("ACAD_XDICTIONARY")
            .and_then(|tags| tags.iter().find(|t| t.code == 360))
            .and_then(Tag::as_handle)
    }

    pub fn embedded_objects(&self) -> &[Vec<Tag>] {
        &self.embedded_objects
    }

    // -- raw tags --

    /// Raw tags of one subclass, `None` for the base class
    pub fn raw_tags<'a>(&'a self, marker: Option<&'a str>) -> impl Iterator<Item = &'a Tag> + 'a {
        self.subclasses
            .iter()
            .filter(move |s| s.marker.as_deref() == marker)
            .flat_map(|s| s.slots.iter())
            .filter_map(|slot| match slot {
                Slot::Tag(tag) => Some(tag),
                _ => None,
            })
    }

    /// Raw tags of all subclasses in order
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.subclasses
            .iter()
            .flat_map(|s| s.slots.iter())
            .filter_map(|slot| match slot {
                Slot::Tag(tag) => Some(tag),
                _ => None,
            })
    }

    /// Append a raw tag to a subclass, creating the subclass if needed.
    pub fn push_tag(&mut self, marker: Option<&str>, tag: Tag) {
        let index = match self
            .subclasses
            .iter()
            .position(|s| s.marker.as_deref() == marker)
        {
            Some(index) => index,
            None => {
                self.subclasses.push(Subclass::new(marker));
                self.subclasses.len() - 1
            }
        };
        self.subclasses[index].slots.push(Slot::Tag(tag));
    }

    /// Keep only raw tags matching `keep`
    pub fn retain_tags(&mut self, mut keep: impl FnMut(&Tag) -> bool) {
        for subclass in &mut self.subclasses {
            subclass.slots.retain(|slot| match slot {
                Slot::Tag(tag) => keep(tag),
                _ => true,
            });
        }
    }

    /// Every handle-valued pointer of the entity with its group code:
    /// attributes, raw tags, AppData, embedded objects and XDATA 1005.
    pub fn pointers(&self) -> Vec<(i32, Handle)> {
        let mut out = Vec::new();
        let schema = self.schema();
        for (name, value) in &self.dxf {
            if let (Some(def), TagValue::String(s)) = (schema.get(name), value) {
                if PointerKind::from_code(def.code).is_some() {
                    if let Ok(h) = Handle::from_hex(s) {
                        out.push((def.code, h));
                    }
                }
            }
        }
        let raw = self.tags();
        let nested = self.appdata.iter().chain(&self.embedded_objects).flatten();
        let xdata = self.xdata.iter().flat_map(|(_, tags)| tags.iter());
        for tag in raw.chain(nested).chain(xdata) {
            if PointerKind::from_code(tag.code).is_some() {
                if let Some(h) = tag.as_handle() {
                    out.push((tag.code, h));
                }
            }
        }
        out
    }

    /// Rewrite every translatable pointer through `map`; arbitrary
    /// pointers (320-329) stay unchanged.
    pub fn translate_pointers(&mut self, mut map: impl FnMut(Handle) -> Handle) {
        let mut translate = |tag: &mut Tag| {
            if !is_translatable_pointer(tag.code) {
                return;
            }
            if let Some(h) = tag.as_handle() {
                if !h.is_null() {
                    tag.value = TagValue::String(map(h).to_hex());
                }
            }
        };
        let schema = self.kind.schema();
        for (name, value) in self.dxf.iter_mut() {
            if let Some(def) = schema.get(name) {
                let mut tag = Tag {
                    code: def.code,
                    value: value.clone(),
                };
                translate(&mut tag);
                *value = tag.value;
            }
        }
        for subclass in &mut self.subclasses {
            for slot in &mut subclass.slots {
                if let Slot::Tag(tag) = slot {
                    translate(tag);
                }
            }
        }
        for tag in self
            .appdata
            .iter_mut()
            .chain(self.embedded_objects.iter_mut())
            .flatten()
        {
            translate(tag);
        }
        for (_, tags) in self.xdata.iter_mut() {
            tags.iter_mut().for_each(&mut translate);
        }
    }

    // -- export --

    /// Flat tag run for writing at `version`.
    ///
    /// Bound attributes replace their slot, newly set attributes follow at
    /// the end of their subclass. Writing an R13+ entity as R12 drops
    /// subclass markers, AppData and attributes newer than the target.
    pub fn export_tags(&self, version: DxfVersion) -> Vec<Tag> {
        let schema = self.schema();
        let downgrade = version.is_legacy() && !self.legacy;
        let mut out = vec![Tag::string(STRUCTURE_MARKER, self.dxftype.clone())];

        // bound attributes plus unbound ones already written
        let mut written: Vec<&str> = self
            .subclasses
            .iter()
            .flat_map(|s| s.slots.iter())
            .filter_map(|slot| match slot {
                Slot::Attrib(name) => Some(*name),
                _ => None,
            })
            .collect();

        let attrib_tag = |def: &AttribDef| -> Option<Tag> {
            self.dxf.get(def.name).map(|value| Tag {
                code: def.code,
                value: value.clone(),
            })
        };

        for (index, subclass) in self.subclasses.iter().enumerate() {
            if let Some(marker) = &subclass.marker {
                if !downgrade {
                    out.push(Tag::string(SUBCLASS_MARKER, marker.clone()));
                }
            }
            for slot in &subclass.slots {
                match slot {
                    Slot::Tag(tag) => out.push(tag.clone()),
                    Slot::Attrib(name) => {
                        if let Some(def) = schema.get(name) {
                            if downgrade && def.since > version {
                                continue;
                            }
                            out.extend(attrib_tag(def));
                        }
                    }
                    Slot::AppData(i) => {
                        if !downgrade {
                            if let Some(group) = self.appdata.get(*i) {
                                out.extend(group.iter().cloned());
                            }
                        }
                    }
                }
            }
            for def in schema.attribs.iter() {
                let belongs = if self.legacy {
                    index == 0
                } else {
                    def.subclass == subclass.marker.as_deref()
                };
                if belongs && def.since <= version && !written.contains(&def.name) {
                    if let Some(tag) = attrib_tag(def) {
                        out.push(tag);
                        written.push(def.name);
                    }
                }
            }
        }

        if !downgrade {
            for embedded in &self.embedded_objects {
                out.extend(embedded.iter().cloned());
            }
        }
        self.xdata.export_tags(&mut out);
        out
    }
}

fn kind_matches(kind: AttribKind, value: &TagValue) -> bool {
    matches!(
        (kind, value),
        (AttribKind::Str | AttribKind::Handle, TagValue::String(_))
            | (AttribKind::Int, TagValue::Integer(_))
            | (AttribKind::Double, TagValue::Double(_))
            | (AttribKind::Point, TagValue::Point2(_) | TagValue::Point3(_))
    )
}

fn coerce(kind: AttribKind, value: TagValue) -> std::result::Result<TagValue, String> {
    match (kind, value) {
        (AttribKind::Handle, TagValue::String(s)) => Handle::from_hex(&s)
            .map(|h| TagValue::String(h.to_hex()))
            .map_err(|_| format!("'{}' is not a handle", s)),
        (AttribKind::Double, TagValue::Integer(v)) => Ok(TagValue::Double(v as f64)),
        (kind, value) if kind_matches(kind, &value) => Ok(value),
        (kind, value) => Err(format!(
            "expected {:?} value, got {}",
            kind,
            value.kind_name()
        )),
    }
}
