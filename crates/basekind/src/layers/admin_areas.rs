use log::debug;

use crate::country;
use crate::feature::SourceFeature;
use crate::layers::Layer;
use crate::lod::{LodParams, ResolutionTier};
use crate::output::FeatureCollector;
use crate::relation::{self, OsmRelation, RelationMembership};

pub const LAYER_NAME: &str = "admin_areas";

/// Natural Earth layers this driver reads, with their kind and admin level.
const NE_LAYERS: [(&str, &str, i32); 3] = [
    ("ne_50m_admin_0_countries", "country", 2),
    ("ne_10m_admin_0_countries", "country", 2),
    ("ne_10m_admin_1_states_provinces", "region", 4),
];

/// Countries, regions, counties and localities from admin boundaries.
#[derive(Debug, Default)]
pub struct AdminAreas;

impl Layer for AdminAreas {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn process_ne(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        if !sf.can_be_polygon() {
            return;
        }
        let Some(source_layer) = sf.source_layer() else {
            return;
        };
        let Some(&(_, kind, admin_level)) = NE_LAYERS.iter().find(|(l, _, _)| *l == source_layer) else {
            return;
        };

        let tier = ResolutionTier::from_source_layer(source_layer);
        let name = sf.value("name");
        let code = country::resolve_reference(sf, name);

        features
            .polygon(LAYER_NAME)
            .set_id(sf.id())
            .set_attr("kind", kind)
            .set_attr("kind_detail", admin_level)
            .set_attr_opt("name", name)
            .apply_lod(&LodParams::reference_polygon(tier, None, relation::sort_rank(admin_level)))
            .set_attr_opt("iso_code", code.iso2)
            .set_attr_opt("iso_code3", code.iso3);
    }

    fn process_osm(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        if !sf.can_be_polygon() {
            return;
        }
        let Some(class) = relation::aggregate(sf.relations()) else {
            debug!("feature {} has no admin boundary membership", sf.id());
            return;
        };

        let name = sf.value("name");
        let polygon = features
            .polygon(LAYER_NAME)
            .set_id(sf.id())
            .set_attr("kind", class.theme().kind)
            .set_attr("kind_detail", class.admin_level)
            .apply_lod(&LodParams::osm_admin_polygon(class.admin_level))
            .set_attr_opt("name", name)
            .set_attr_opt("iso_code", country::resolve_osm(sf, name, class.admin_level));

        if class.disputed {
            polygon.set_attr("disputed", true);
        }
    }

    fn preprocess_osm_relation(&self, relation: &OsmRelation) -> Option<RelationMembership> {
        relation::preprocess(relation)
    }
}
