//! Source feature abstraction consumed by the engine.
//!
//! The reader that decodes OSM or Natural Earth data lives outside this crate.
//! It hands features over through [`SourceFeature`]; [`SimpleFeature`] is the
//! plain-data implementation used by the batch driver and the tests.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use crate::error::GeometryError;
use crate::relation::RelationMembership;

/// True for values that must be read as "no value": empty, `-99`, `-`.
#[inline]
pub fn is_no_value(v: &str) -> bool {
    v.is_empty() || v == "-99" || v == "-"
}

/// Key/value tags of one feature. Lookups are always by explicit key.
pub trait Tags {
    /// The stored value, untouched.
    fn raw(&self, key: &str) -> Option<&str>;

    /// The stored value, with empty and sentinel values mapped to `None`.
    #[inline]
    fn value(&self, key: &str) -> Option<&str> {
        self.raw(key).filter(|v| !is_no_value(v))
    }

    #[inline]
    fn has_tag(&self, key: &str, value: &str) -> bool {
        self.value(key) == Some(value)
    }
}

impl Tags for HashMap<String, String> {
    fn raw(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl Tags for BTreeMap<String, String> {
    fn raw(&self, key: &str) -> Option<&str> {
        self.get(key).map(String::as_str)
    }
}

impl<T: Tags + ?Sized> Tags for &T {
    fn raw(&self, key: &str) -> Option<&str> {
        (**self).raw(key)
    }
}

/// Which output geometries a source feature can produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryFlags {
    pub point: bool,
    pub line: bool,
    pub polygon: bool,
}

impl GeometryFlags {
    pub const POINT: Self = Self { point: true, line: false, polygon: false };
    pub const LINE: Self = Self { point: false, line: true, polygon: false };
    pub const POLYGON: Self = Self { point: false, line: false, polygon: true };
}

/// A feature as delivered by the external reader.
pub trait SourceFeature: Tags {
    /// Stable identifier of the source element.
    fn id(&self) -> u64;

    /// Provenance, e.g. `ne`, `osm`, `osm_land`, `osm_water`.
    fn source(&self) -> &str;

    fn source_layer(&self) -> Option<&str>;

    fn geometry(&self) -> GeometryFlags;

    /// Area in world-normalised units (the world is 1x1).
    fn area(&self) -> Result<f64, GeometryError>;

    /// Centroid in world-normalised coordinates, Y growing southwards.
    fn centroid(&self) -> Result<[f64; 2], GeometryError>;

    /// Admin boundary memberships attached during relation preprocessing.
    fn relations(&self) -> &[RelationMembership];

    #[inline]
    fn is_point(&self) -> bool {
        self.geometry().point
    }

    #[inline]
    fn can_be_line(&self) -> bool {
        self.geometry().line
    }

    #[inline]
    fn can_be_polygon(&self) -> bool {
        self.geometry().polygon
    }
}

/// Geometry type reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryType {
    Point,
    Line,
    Polygon,
    /// A closed way: usable as a line or as a polygon.
    ClosedWay,
}

impl GeometryType {
    pub fn flags(self) -> GeometryFlags {
        match self {
            GeometryType::Point => GeometryFlags::POINT,
            GeometryType::Line => GeometryFlags::LINE,
            GeometryType::Polygon => GeometryFlags::POLYGON,
            GeometryType::ClosedWay => GeometryFlags { point: false, line: true, polygon: true },
        }
    }
}

/// Plain-data source feature with precomputed area and centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleFeature {
    pub id: u64,
    pub source: String,
    #[serde(default)]
    pub source_layer: Option<String>,
    #[serde(default, deserialize_with = "tags_from_json")]
    pub tags: HashMap<String, String>,
    pub geometry: GeometryType,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub centroid: Option<[f64; 2]>,
    #[serde(skip)]
    pub relations: Vec<RelationMembership>,
}

impl SimpleFeature {
    pub fn new(id: u64, source: impl Into<String>, geometry: GeometryType) -> Self {
        Self {
            id,
            source: source.into(),
            source_layer: None,
            tags: HashMap::new(),
            geometry,
            area: None,
            centroid: None,
            relations: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.source_layer = Some(layer.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_centroid(mut self, x: f64, y: f64) -> Self {
        self.centroid = Some([x, y]);
        self
    }

    pub fn with_relations(mut self, relations: impl IntoIterator<Item = RelationMembership>) -> Self {
        self.relations.extend(relations);
        self
    }
}

impl Tags for SimpleFeature {
    fn raw(&self, key: &str) -> Option<&str> {
        self.tags.raw(key)
    }
}

impl SourceFeature for SimpleFeature {
    fn id(&self) -> u64 {
        self.id
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn source_layer(&self) -> Option<&str> {
        self.source_layer.as_deref()
    }

    fn geometry(&self) -> GeometryFlags {
        self.geometry.flags()
    }

    fn area(&self) -> Result<f64, GeometryError> {
        match self.area {
            None => Err(GeometryError::Unavailable { id: self.id, what: "area" }),
            Some(a) if !a.is_finite() => Err(GeometryError::NonFinite { id: self.id, what: "area" }),
            Some(a) => Ok(a),
        }
    }

    fn centroid(&self) -> Result<[f64; 2], GeometryError> {
        match self.centroid {
            None => Err(GeometryError::Unavailable { id: self.id, what: "centroid" }),
            Some([x, y]) if !(x.is_finite() && y.is_finite()) => {
                Err(GeometryError::NonFinite { id: self.id, what: "centroid" })
            }
            Some(c) => Ok(c),
        }
    }

    fn relations(&self) -> &[RelationMembership] {
        &self.relations
    }
}

/// Shapefile attributes arrive as numbers and booleans as often as strings;
/// keep them all as their textual form and drop nulls.
fn tags_from_json<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: HashMap<String, serde_json::Value> = HashMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect())
}

/// A tag view with a few keys replaced or added, e.g. `_source_layer` for
/// rules that discriminate on the Natural Earth layer name.
pub struct TagOverlay<'a, T: Tags + ?Sized> {
    base: &'a T,
    overrides: SmallVec<[(&'static str, String); 2]>,
}

impl<'a, T: Tags + ?Sized> TagOverlay<'a, T> {
    pub fn new(base: &'a T) -> Self {
        Self { base, overrides: SmallVec::new() }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.overrides.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.overrides.push((key, value)),
        }
        self
    }
}

impl<T: Tags + ?Sized> Tags for TagOverlay<'_, T> {
    fn raw(&self, key: &str) -> Option<&str> {
        match self.overrides.iter().find(|(k, _)| *k == key) {
            Some((_, v)) => Some(v.as_str()),
            None => self.base.raw(key),
        }
    }
}
