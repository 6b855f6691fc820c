//! Output features handed to the external tile encoder.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::lod::{LodParams, ZoomRange, MAX_ZOOM};

/// Attribute value on an emitted feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<&String> for AttrValue {
    fn from(v: &String) -> Self {
        AttrValue::Str(v.clone())
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputGeometry {
    Polygon,
    Line,
    Point,
    /// A label point placed inside a polygon.
    PointOnSurface,
}

/// Attribute only written from `min_zoom` upwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoomedAttr {
    pub value: AttrValue,
    pub min_zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputFeature {
    pub layer: String,
    pub geometry: OutputGeometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub zoomed_attrs: BTreeMap<String, ZoomedAttr>,
    pub min_zoom: u8,
    pub max_zoom: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_pixels: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pixel_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<i64>,
}

impl OutputFeature {
    pub fn new(layer: &str, geometry: OutputGeometry) -> Self {
        Self {
            layer: layer.to_owned(),
            geometry,
            id: None,
            attrs: BTreeMap::new(),
            zoomed_attrs: BTreeMap::new(),
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
            pixel_tolerance: None,
            buffer_pixels: None,
            min_pixel_size: None,
            sort_key: None,
        }
    }

    pub fn set_id(&mut self, id: u64) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    /// Set when present, drop the attribute when `None`.
    pub fn set_attr_opt<V: Into<AttrValue>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        match value {
            Some(v) => {
                self.attrs.insert(key.to_owned(), v.into());
            }
            None => {
                self.attrs.remove(key);
            }
        }
        self
    }

    pub fn set_attr_with_min_zoom<V: Into<AttrValue>>(
        &mut self,
        key: &str,
        value: Option<V>,
        min_zoom: u8,
    ) -> &mut Self {
        match value {
            Some(v) => {
                self.zoomed_attrs
                    .insert(key.to_owned(), ZoomedAttr { value: v.into(), min_zoom });
            }
            None => {
                self.zoomed_attrs.remove(key);
            }
        }
        self
    }

    pub fn set_zoom_range(&mut self, min: u8, max: u8) -> &mut Self {
        self.min_zoom = min;
        self.max_zoom = max;
        self
    }

    pub fn set_min_zoom(&mut self, min: u8) -> &mut Self {
        self.min_zoom = min;
        self
    }

    pub fn set_pixel_tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.pixel_tolerance = Some(tolerance);
        self
    }

    pub fn set_buffer_pixels(&mut self, buffer: f64) -> &mut Self {
        self.buffer_pixels = Some(buffer);
        self
    }

    pub fn set_min_pixel_size(&mut self, size: f64) -> &mut Self {
        self.min_pixel_size = Some(size);
        self
    }

    pub fn set_sort_key(&mut self, key: i64) -> &mut Self {
        self.sort_key = Some(key);
        self
    }

    /// Copy the LOD parameters over; unset ones leave the feature untouched.
    pub fn apply_lod(&mut self, lod: &LodParams) -> &mut Self {
        self.set_zoom_range(lod.zoom.min, lod.zoom.max);
        if let Some(t) = lod.pixel_tolerance {
            self.set_pixel_tolerance(t);
        }
        if let Some(b) = lod.buffer_pixels {
            self.set_buffer_pixels(b);
        }
        if let Some(s) = lod.min_pixel_size {
            self.set_min_pixel_size(s);
        }
        if let Some(rank) = lod.sort_rank {
            self.set_attr("sort_rank", rank);
        }
        self
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange::new(self.min_zoom, self.max_zoom)
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Attribute as seen in a tile at `zoom`, zoom-gated ones included.
    pub fn attr_at(&self, key: &str, zoom: u8) -> Option<&AttrValue> {
        self.attrs.get(key).or_else(|| {
            self.zoomed_attrs
                .get(key)
                .filter(|z| zoom >= z.min_zoom)
                .map(|z| &z.value)
        })
    }
}

/// Collects the output features emitted for one source feature.
#[derive(Debug, Default)]
pub struct FeatureCollector {
    features: Vec<OutputFeature>,
}

impl FeatureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, layer: &str, geometry: OutputGeometry) -> &mut OutputFeature {
        self.features.push(OutputFeature::new(layer, geometry));
        let last = self.features.len() - 1;
        &mut self.features[last]
    }

    pub fn polygon(&mut self, layer: &str) -> &mut OutputFeature {
        self.push(layer, OutputGeometry::Polygon)
    }

    pub fn line(&mut self, layer: &str) -> &mut OutputFeature {
        self.push(layer, OutputGeometry::Line)
    }

    pub fn point(&mut self, layer: &str) -> &mut OutputFeature {
        self.push(layer, OutputGeometry::Point)
    }

    pub fn point_on_surface(&mut self, layer: &str) -> &mut OutputFeature {
        self.push(layer, OutputGeometry::PointOnSurface)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[OutputFeature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<OutputFeature> {
        self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::ResolutionTier;

    #[test]
    fn test_builder_chain() {
        let mut c = FeatureCollector::new();
        c.polygon("water")
            .set_id(9)
            .set_attr("kind", "lake")
            .set_attr_opt::<String>("kind_detail", None)
            .set_zoom_range(4, 5)
            .set_buffer_pixels(16.0);

        let f = &c.features()[0];
        assert_eq!(f.geometry, OutputGeometry::Polygon);
        assert_eq!(f.id, Some(9));
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("lake"));
        assert_eq!(f.attr("kind_detail"), None);
        assert_eq!(f.zoom_range(), ZoomRange::new(4, 5));
        assert_eq!(f.buffer_pixels, Some(16.0));
        assert_eq!(f.min_pixel_size, None);
    }

    #[test]
    fn test_zoomed_attr_visibility() {
        let mut f = OutputFeature::new("water", OutputGeometry::Line);
        f.set_attr_with_min_zoom("layer", Some(-1), 14)
            .set_attr_with_min_zoom::<String>("bridge", None, 14);

        assert_eq!(f.attr_at("layer", 13), None);
        assert_eq!(f.attr_at("layer", 14).and_then(AttrValue::as_int), Some(-1));
        assert!(!f.zoomed_attrs.contains_key("bridge"));
    }

    #[test]
    fn test_apply_lod() {
        let mut f = OutputFeature::new("admin_areas", OutputGeometry::Polygon);
        f.apply_lod(&LodParams::reference_polygon(ResolutionTier::Coarse, None, 198));

        assert_eq!(f.zoom_range(), ZoomRange::new(0, 3));
        assert_eq!(f.min_pixel_size, Some(1.0));
        assert_eq!(f.attr("sort_rank").and_then(AttrValue::as_int), Some(198));
    }

    #[test]
    fn test_serializes_plain_values() {
        let mut f = OutputFeature::new("admin_areas", OutputGeometry::Polygon);
        f.set_attr("kind", "country").set_attr("disputed", true).set_attr("kind_detail", 2);

        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["attrs"]["kind"], "country");
        assert_eq!(json["attrs"]["disputed"], true);
        assert_eq!(json["attrs"]["kind_detail"], 2);
        assert_eq!(json["geometry"], "polygon");
        assert!(json.get("sort_key").is_none());
    }
}
