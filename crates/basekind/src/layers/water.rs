use log::warn;

use crate::error::RuleError;
use crate::feature::{SourceFeature, TagOverlay, Tags};
use crate::layers::{names, Layer};
use crate::lod::{self, LodParams, ResolutionTier, WATER_SORT_RANK};
use crate::matcher::{MatchIndex, Predicate, Rule};
use crate::output::FeatureCollector;

pub const LAYER_NAME: &str = "water";
pub const PREPARED_SOURCE: &str = "osm_water";

/// Zoom from which bridge, tunnel and layer show up on water features.
const EXTRA_ATTR_MIN_ZOOM: u8 = 14;
const DEFAULT_LINE_MIN_ZOOM: i64 = 12;
const DEFAULT_POINT_MIN_ZOOM: i64 = 15;
const POLYGON_MIN_ZOOM: u8 = 6;
const LABEL_BUFFER: f64 = 128.0;

/// Natural Earth layers that carry water polygons.
const NE_WATER_LAYERS: [&str; 4] = ["ne_50m_ocean", "ne_50m_lakes", "ne_10m_ocean", "ne_10m_lakes"];

fn ne_rules() -> Vec<Rule> {
    let featurecla = |class: &str, kind: &str| {
        Rule::new()
            .when(Predicate::tag("featurecla", class))
            .from_tag("min_zoom", "min_zoom")
            .set("kind", kind)
    };

    vec![
        featurecla("Ocean", "ocean"),
        featurecla("Playa", "playa"),
        featurecla("Reservoir", "lake"),
        featurecla("Lake", "lake"),
        featurecla("Alkaline Lake", "lake"),
        Rule::new()
            .when(Predicate::missing_from("_source_layer", NE_WATER_LAYERS))
            .clear("kind"),
    ]
}

fn osm_rules() -> Vec<Rule> {
    let tag = Predicate::tag;
    let sea_polygon = || Rule::new().when(tag("place", "sea")).when(Predicate::Polygon);

    vec![
        Rule::new().when(tag("natural", "reef")).set("kind", "reef"),
        Rule::new()
            .when(tag("natural", "reef"))
            .when(Predicate::any_of("reef", ["coral", "rock", "sand"]))
            .from_tag("kind_detail", "reef"),
        Rule::new().when(tag("waterway", "drain")).set("kind", "drain").set("min_zoom", 15),
        Rule::new().when(tag("waterway", "ditch")).set("kind", "ditch").set("min_zoom", 15),
        Rule::new().when(tag("waterway", "stream")).set("kind", "stream").set("min_zoom", 11),
        Rule::new().when(tag("waterway", "river")).set("kind", "river").set("min_zoom", 7),
        Rule::new().when(tag("waterway", "canal")).set("kind", "canal").set("min_zoom", 9),
        Rule::new()
            .when(tag("waterway", "canal"))
            .when(tag("boat", "yes"))
            .set("kind", "canal")
            .set("min_zoom", 9),
        Rule::new().when(tag("amenity", "swimming_pool")).set("kind", "swimming_pool"),
        Rule::new().when(tag("leisure", "swimming_pool")).set("kind", "swimming_pool"),
        Rule::new().when(tag("landuse", "reservoir")).set("kind", "lake"),
        Rule::new().when(tag("landuse", "basin")).set("kind", "basin"),
        Rule::new()
            .when(Predicate::any_of("natural", ["fjord", "strait", "bay"]))
            .from_tag("kind", "natural")
            .set("keep_polygon", false),
        Rule::new().when(tag("natural", "water")).set("kind", "water"),
        Rule::new()
            .when(tag("natural", "water"))
            .when(Predicate::any_of(
                "water",
                ["basin", "canal", "ditch", "drain", "lake", "river", "stream"],
            ))
            .from_tag("kind_detail", "water"),
        Rule::new()
            .when(tag("natural", "water"))
            .when(Predicate::any_of(
                "water",
                ["lagoon", "oxbow", "pond", "reservoir", "wastewater"],
            ))
            .set("kind_detail", "lake"),
        Rule::new().when(tag("amenity", "fountain")).set("kind", "fountain"),
        Rule::new().when(tag("waterway", "dock")).set("kind", "dock"),
        Rule::new()
            .when(tag("waterway", "riverbank"))
            .set("kind", "riverbank")
            .set("min_zoom", 7),
        Rule::new().when(tag("covered", "yes")).clear("kind"),
        // Sea polygons are only labelled.
        sea_polygon().set("kind", "sea").set("keep_polygon", false),
        sea_polygon()
            .when(Predicate::any_of("name:en", ["North Sea", "Alboran Sea"]))
            .clear("kind"),
        sea_polygon()
            .when(Predicate::any_of(
                "name:en",
                [
                    "Caspian Sea",
                    "Red Sea",
                    "Persian Gulf",
                    "Sea of Oman",
                    "Gulf of Aden",
                    "Gulf of Thailand",
                    "Sea of Japan",
                ],
            ))
            .set("min_zoom", 5),
        sea_polygon()
            .when(Predicate::any_of("name:en", ["Arabian Sea", "Bay of Bengal", "Black Sea"]))
            .set("min_zoom", 3),
        Rule::new()
            .when(tag("place", "sea"))
            .when(Predicate::any_of(
                "name:en",
                ["North Sea", "Baltic Sea", "Black Sea", "Caspian Sea"],
            ))
            .from_tag("name_override", "name:en"),
        Rule::new()
            .when(tag("place", "sea"))
            .when(Predicate::Point)
            .set("kind", "sea")
            .set("min_zoom", 6),
        Rule::new()
            .when(tag("place", "sea"))
            .when(Predicate::Point)
            .when(Predicate::any_of(
                "name:en",
                [
                    "North Atlantic Ocean",
                    "South Atlantic Ocean",
                    "Caribbean Sea",
                    "Gulf of Mexico",
                    "Mediterranean Sea",
                    "North Sea",
                    "Philippine Sea",
                    "Tasman Sea",
                    "Fiji Sea",
                    "South China Sea",
                    "North Pacific Ocean",
                    "South Pacific Ocean",
                    "Scotia Sea",
                    "Weddell Sea",
                    "Indian Ocean",
                    "Bering Sea",
                    "Gulf of Alaska",
                    "Gulf of Guinea",
                ],
            ))
            .set("min_zoom", 3),
        Rule::new().when(tag("place", "ocean")).set("kind", "ocean").set("min_zoom", 0),
    ]
}

/// Oceans, lakes, rivers and their labels.
#[derive(Debug, Clone)]
pub struct Water {
    ne_index: MatchIndex,
    osm_index: MatchIndex,
}

impl Water {
    pub fn new() -> Result<Self, RuleError> {
        Ok(Self {
            ne_index: MatchIndex::new(ne_rules())?,
            osm_index: MatchIndex::new(osm_rules())?,
        })
    }
}

fn parse_layer<T: Tags + ?Sized>(tags: &T) -> Option<i64> {
    tags.value("layer").and_then(|v| v.trim().parse().ok())
}

impl Layer for Water {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn process_ne(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        let Some(source_layer) = sf.source_layer() else {
            return;
        };
        let tags = TagOverlay::new(sf).with("_source_layer", source_layer);
        let matches = self.ne_index.evaluate(&tags, sf.geometry());
        if matches.is_empty() {
            return;
        }
        let Some(kind) = matches.string("kind") else {
            return;
        };
        let Some(min_zoom) = matches.integer("min_zoom") else {
            return;
        };
        if !sf.can_be_polygon() {
            return;
        }

        let tier = ResolutionTier::from_source_layer(source_layer);
        features
            .polygon(LAYER_NAME)
            .set_attr("kind", kind.as_str())
            .apply_lod(&LodParams::reference_polygon(
                tier,
                Some(lod::clamp_zoom(min_zoom)),
                WATER_SORT_RANK,
            ))
            .set_buffer_pixels(lod::reference_water_buffer(&kind));
    }

    fn process_osm(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        let matches = self.osm_index.evaluate(sf, sf.geometry());
        if matches.is_empty() {
            return;
        }
        let Some(kind) = matches.string("kind") else {
            return;
        };

        let mut tags = TagOverlay::new(sf);
        if let Some(name) = matches.string("name_override") {
            tags = tags.with("name", name);
        }
        let kind_detail = matches.string("kind_detail");
        let keep_polygon = matches.boolean("keep_polygon").unwrap_or(true);
        let rule_min_zoom = matches.integer("min_zoom");
        let layer = parse_layer(sf);

        if sf.can_be_polygon() && keep_polygon {
            features
                .polygon(LAYER_NAME)
                .set_attr("kind", kind.as_str())
                .set_attr_opt("kind_detail", kind_detail.as_deref())
                .set_attr("sort_rank", WATER_SORT_RANK)
                .set_attr_with_min_zoom("bridge", sf.value("bridge"), EXTRA_ATTR_MIN_ZOOM)
                .set_attr_with_min_zoom("tunnel", sf.value("tunnel"), EXTRA_ATTR_MIN_ZOOM)
                .set_attr_with_min_zoom("layer", layer, EXTRA_ATTR_MIN_ZOOM)
                .set_pixel_tolerance(lod::water_polygon_tolerance(&kind))
                .set_min_zoom(POLYGON_MIN_ZOOM)
                .set_buffer_pixels(8.0)
                .set_min_pixel_size(lod::water_polygon_min_pixel_size(&kind));
        }

        if sf.can_be_line() && !sf.can_be_polygon() {
            let min_zoom = lod::clamp_zoom(rule_min_zoom.unwrap_or(DEFAULT_LINE_MIN_ZOOM));
            let line = features
                .line(LAYER_NAME)
                .set_id(sf.id())
                .set_attr("kind", kind.as_str())
                .set_attr("min_zoom", lod::client_min_zoom(min_zoom))
                .set_attr_with_min_zoom("layer", layer, EXTRA_ATTR_MIN_ZOOM)
                .set_attr("sort_rank", WATER_SORT_RANK)
                .set_sort_key(i64::from(min_zoom))
                .set_min_pixel_size(0.0)
                .set_pixel_tolerance(lod::water_line_tolerance(&kind))
                .set_buffer_pixels(lod::water_line_buffer(&kind, min_zoom))
                .set_min_zoom(min_zoom);
            names::set_osm_names(line, &tags);
        }

        if sf.is_point() {
            let min_zoom = lod::clamp_zoom(rule_min_zoom.unwrap_or(DEFAULT_POINT_MIN_ZOOM));
            let point = features
                .point(LAYER_NAME)
                .set_id(sf.id())
                .set_attr("kind", kind.as_str())
                .set_attr("min_zoom", lod::client_min_zoom(min_zoom))
                .set_sort_key(i64::from(min_zoom))
                .set_min_zoom(min_zoom);
            names::set_osm_names(point, &tags);
        }

        if tags.value("name").is_some() && sf.can_be_polygon() {
            let area_ratio = match sf.area() {
                Ok(area) => lod::area_ratio(area),
                Err(e) => {
                    warn!("way area unavailable, labelling at max zoom: {e}");
                    0.0
                }
            };
            let min_zoom = match rule_min_zoom {
                Some(z) => lod::clamp_zoom(z),
                None => lod::label_min_zoom(area_ratio),
            };

            let label = features
                .point_on_surface(LAYER_NAME)
                .set_attr("kind", kind.as_str())
                .set_attr_opt("kind_detail", kind_detail.as_deref())
                .set_attr("min_zoom", lod::client_min_zoom(min_zoom))
                .set_min_zoom(min_zoom)
                .set_attr("sort_rank", WATER_SORT_RANK)
                .set_sort_key(i64::from(min_zoom))
                .set_buffer_pixels(LABEL_BUFFER);
            names::set_osm_names(label, &tags);
        }
    }

    fn prepared_source(&self) -> Option<&'static str> {
        Some(PREPARED_SOURCE)
    }

    fn process_prepared_osm(&self, _sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        features
            .polygon(LAYER_NAME)
            .set_id(1)
            .set_attr("kind", "ocean")
            .set_attr("sort_rank", WATER_SORT_RANK)
            .set_pixel_tolerance(lod::PIXEL_TOLERANCE)
            .set_min_zoom(POLYGON_MIN_ZOOM)
            .set_buffer_pixels(8.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{GeometryType, SimpleFeature};
    use crate::lod::{ZoomRange, MAX_ZOOM};
    use crate::output::{AttrValue, OutputGeometry};

    fn water() -> Water {
        Water::new().unwrap()
    }

    fn run_osm(sf: &SimpleFeature) -> FeatureCollector {
        let mut c = FeatureCollector::new();
        water().process_osm(sf, &mut c);
        c
    }

    fn run_ne(sf: &SimpleFeature) -> FeatureCollector {
        let mut c = FeatureCollector::new();
        water().process_ne(sf, &mut c);
        c
    }

    fn kind(c: &FeatureCollector, geometry: OutputGeometry) -> Option<String> {
        c.features()
            .iter()
            .find(|f| f.geometry == geometry)
            .and_then(|f| f.attr("kind"))
            .and_then(AttrValue::as_str)
            .map(str::to_owned)
    }

    #[test]
    fn test_rule_lists_build() {
        let w = water();
        assert_eq!(w.ne_index.len(), 6);
        assert_eq!(w.osm_index.len(), 28);
    }

    #[test]
    fn test_ne_lake_tier_floor() {
        let sf = SimpleFeature::new(1, "ne", GeometryType::Polygon)
            .with_layer("ne_50m_lakes")
            .with_tag("featurecla", "Lake")
            .with_tag("min_zoom", "1.7");
        let c = run_ne(&sf);

        assert_eq!(c.len(), 1);
        let f = &c.features()[0];
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("lake"));
        assert_eq!(f.zoom_range(), ZoomRange::new(2, 3));
        assert_eq!(f.buffer_pixels, Some(16.0));
        assert_eq!(f.min_pixel_size, Some(1.0));
    }

    #[test]
    fn test_ne_ocean_fine_tier() {
        let sf = SimpleFeature::new(1, "ne", GeometryType::Polygon)
            .with_layer("ne_10m_ocean")
            .with_tag("featurecla", "Ocean")
            .with_tag("min_zoom", "0");
        let f = &run_ne(&sf).into_features()[0];
        assert_eq!(f.zoom_range(), ZoomRange::new(4, 5));
        assert_eq!(f.buffer_pixels, Some(8.0));
    }

    #[test]
    fn test_ne_other_layer_or_missing_min_zoom() {
        let sf = SimpleFeature::new(1, "ne", GeometryType::Polygon)
            .with_layer("ne_10m_rivers_lake_centerlines")
            .with_tag("featurecla", "Lake")
            .with_tag("min_zoom", "2");
        assert!(run_ne(&sf).is_empty());

        let sf = SimpleFeature::new(1, "ne", GeometryType::Polygon)
            .with_layer("ne_10m_lakes")
            .with_tag("featurecla", "Lake");
        assert!(run_ne(&sf).is_empty());
    }

    #[test]
    fn test_osm_river_line() {
        let sf = SimpleFeature::new(42, "osm", GeometryType::Line)
            .with_tag("waterway", "river")
            .with_tag("name", "Rhein")
            .with_tag("layer", "-1");
        let c = run_osm(&sf);

        assert_eq!(c.len(), 1);
        let f = &c.features()[0];
        assert_eq!(f.geometry, OutputGeometry::Line);
        assert_eq!(f.id, Some(42));
        assert_eq!(f.min_zoom, 7);
        assert_eq!(f.attr("min_zoom").and_then(AttrValue::as_int), Some(8));
        assert_eq!(f.sort_key, Some(7));
        assert_eq!(f.pixel_tolerance, Some(0.0));
        assert_eq!(f.buffer_pixels, Some(12.0));
        assert_eq!(f.attr_at("layer", 13), None);
        assert_eq!(f.attr_at("layer", 14).and_then(AttrValue::as_int), Some(-1));
        assert_eq!(f.attr("name").and_then(AttrValue::as_str), Some("Rhein"));
    }

    #[test]
    fn test_osm_unmatched_line_defaults() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Line).with_tag("natural", "water");
        let f = &run_osm(&sf).into_features()[0];
        assert_eq!(f.min_zoom, 12);
        assert_eq!(f.buffer_pixels, Some(4.0));
        assert_eq!(f.pixel_tolerance, Some(0.5));
    }

    #[test]
    fn test_river_polygon_never_area_filtered() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon).with_tag("waterway", "river");
        let c = run_osm(&sf);
        let f = &c.features()[0];
        assert_eq!(f.geometry, OutputGeometry::Polygon);
        assert_eq!(f.min_pixel_size, Some(0.0));
        assert_eq!(f.min_zoom, 6);

        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon).with_tag("waterway", "riverbank");
        let c = run_osm(&sf);
        let f = &c.features()[0];
        assert_eq!(f.min_pixel_size, Some(0.5));
        assert!((f.pixel_tolerance.unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_kind_detail_and_bridge() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::ClosedWay)
            .with_tag("natural", "water")
            .with_tag("water", "pond")
            .with_tag("bridge", "yes");
        let c = run_osm(&sf);

        // a closed way is polygon-capable, so no line is emitted
        assert_eq!(c.len(), 1);
        let f = &c.features()[0];
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("water"));
        assert_eq!(f.attr("kind_detail").and_then(AttrValue::as_str), Some("lake"));
        assert_eq!(f.attr_at("bridge", 14).and_then(AttrValue::as_str), Some("yes"));
        assert_eq!(f.attr_at("tunnel", 14), None);
    }

    #[test]
    fn test_covered_water_is_dropped() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "water")
            .with_tag("covered", "yes");
        assert!(run_osm(&sf).is_empty());
    }

    #[test]
    fn test_bay_is_label_only() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "bay")
            .with_tag("name", "Baie")
            .with_area(lod::world_area_for_70k_square_meters() * (4f64.powi(5) + 1.0));
        let c = run_osm(&sf);

        assert_eq!(c.len(), 1);
        let f = &c.features()[0];
        assert_eq!(f.geometry, OutputGeometry::PointOnSurface);
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("bay"));
        assert_eq!(f.min_zoom, 10);
        assert_eq!(f.attr("min_zoom").and_then(AttrValue::as_int), Some(11));
        assert_eq!(f.buffer_pixels, Some(128.0));
    }

    #[test]
    fn test_label_without_area_falls_back_to_max_zoom() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "water")
            .with_tag("name", "Teich");
        let c = run_osm(&sf);
        let label = c
            .features()
            .iter()
            .find(|f| f.geometry == OutputGeometry::PointOnSurface)
            .unwrap();
        assert_eq!(label.min_zoom, MAX_ZOOM);
        assert_eq!(label.sort_key, Some(i64::from(MAX_ZOOM)));
    }

    #[test]
    fn test_rule_min_zoom_overrides_label_area() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("waterway", "riverbank")
            .with_tag("name", "Ufer")
            .with_area(1.0);
        let c = run_osm(&sf);
        let label = c
            .features()
            .iter()
            .find(|f| f.geometry == OutputGeometry::PointOnSurface)
            .unwrap();
        assert_eq!(label.min_zoom, 7);
    }

    #[test]
    fn test_sea_polygons() {
        let north_sea = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("place", "sea")
            .with_tag("name", "Nordsee")
            .with_tag("name:en", "North Sea");
        assert!(run_osm(&north_sea).is_empty());

        let black_sea = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("place", "sea")
            .with_tag("name", "Чорне море")
            .with_tag("name:en", "Black Sea")
            .with_area(1.0);
        let c = run_osm(&black_sea);
        assert_eq!(c.len(), 1);
        assert_eq!(kind(&c, OutputGeometry::PointOnSurface).as_deref(), Some("sea"));
        let label = &c.features()[0];
        assert_eq!(label.min_zoom, 3);
        assert_eq!(label.attr("name").and_then(AttrValue::as_str), Some("Black Sea"));
    }

    #[test]
    fn test_sea_point_with_name_override() {
        let sf = SimpleFeature::new(9, "osm", GeometryType::Point)
            .with_tag("place", "sea")
            .with_tag("name", "Nordsee")
            .with_tag("name:en", "North Sea");
        let c = run_osm(&sf);

        assert_eq!(c.len(), 1);
        let f = &c.features()[0];
        assert_eq!(f.geometry, OutputGeometry::Point);
        assert_eq!(f.min_zoom, 3);
        assert_eq!(f.attr("min_zoom").and_then(AttrValue::as_int), Some(4));
        assert_eq!(f.attr("name").and_then(AttrValue::as_str), Some("North Sea"));
        assert_eq!(f.attr("name:en").and_then(AttrValue::as_str), Some("North Sea"));
    }

    #[test]
    fn test_other_sea_point_default_zoom() {
        let sf = SimpleFeature::new(9, "osm", GeometryType::Point)
            .with_tag("place", "sea")
            .with_tag("name", "Wattenmeer");
        let f = &run_osm(&sf).into_features()[0];
        assert_eq!(f.min_zoom, 6);
    }

    #[test]
    fn test_reef_kind_detail() {
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "reef")
            .with_tag("reef", "coral");
        let f = &run_osm(&sf).into_features()[0];
        assert_eq!(f.attr("kind_detail").and_then(AttrValue::as_str), Some("coral"));

        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "reef")
            .with_tag("reef", "mud");
        let f = &run_osm(&sf).into_features()[0];
        assert_eq!(f.attr("kind_detail"), None);

        // `reef=reef` adds nothing beyond the kind
        let sf = SimpleFeature::new(1, "osm", GeometryType::Polygon)
            .with_tag("natural", "reef")
            .with_tag("reef", "reef");
        let f = &run_osm(&sf).into_features()[0];
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("reef"));
        assert_eq!(f.attr("kind_detail"), None);
    }

    #[test]
    fn test_prepared_ocean() {
        let sf = SimpleFeature::new(0, PREPARED_SOURCE, GeometryType::Polygon);
        let mut c = FeatureCollector::new();
        water().process_prepared_osm(&sf, &mut c);

        let f = &c.features()[0];
        assert_eq!(f.id, Some(1));
        assert_eq!(f.attr("kind").and_then(AttrValue::as_str), Some("ocean"));
        assert_eq!(f.zoom_range(), ZoomRange::new(6, MAX_ZOOM));
    }
}
