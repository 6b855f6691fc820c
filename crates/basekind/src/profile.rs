//! Routes source features to the layer drivers.

use log::debug;

use crate::error::RuleError;
use crate::feature::SourceFeature;
use crate::layers::{AdminAreas, Earth, Layer, Water};
use crate::merge::{MergePlan, MergePolicy};
use crate::output::{FeatureCollector, OutputFeature};
use crate::relation::{OsmRelation, RelationMembership};

pub const NE_SOURCE: &str = "ne";
pub const OSM_SOURCE: &str = "osm";

/// The basemap profile: the layer drivers plus the merge policy.
///
/// A profile is built once and shared read-only by every worker.
pub struct Profile {
    layers: Vec<Box<dyn Layer>>,
    merge: MergePolicy,
}

impl Profile {
    /// Build every driver with its rule lists; fails if a rule list is
    /// malformed.
    pub fn new() -> Result<Self, RuleError> {
        let layers: Vec<Box<dyn Layer>> = vec![Box::new(AdminAreas), Box::new(Water::new()?), Box::new(Earth)];
        Ok(Self { layers, merge: MergePolicy::default() })
    }

    pub fn with_merge_policy(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.layers.iter().map(|l| l.name())
    }

    pub fn merge_policy(&self) -> &MergePolicy {
        &self.merge
    }

    pub fn process_feature(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        match sf.source() {
            NE_SOURCE => self.layers.iter().for_each(|l| l.process_ne(sf, features)),
            OSM_SOURCE => self.layers.iter().for_each(|l| l.process_osm(sf, features)),
            source => {
                let mut handled = false;
                for layer in self.layers.iter().filter(|l| l.prepared_source() == Some(source)) {
                    layer.process_prepared_osm(sf, features);
                    handled = true;
                }
                if !handled {
                    debug!("feature {}: unknown source {source:?}", sf.id());
                }
            }
        }
    }

    /// Classify one feature into a fresh list of output features.
    pub fn classify(&self, sf: &dyn SourceFeature) -> Vec<OutputFeature> {
        let mut features = FeatureCollector::new();
        self.process_feature(sf, &mut features);
        features.into_features()
    }

    pub fn preprocess_osm_relation(&self, relation: &OsmRelation) -> Option<RelationMembership> {
        self.layers.iter().find_map(|l| l.preprocess_osm_relation(relation))
    }

    pub fn merge_plan(&self, layer: &str, zoom: u8) -> Option<MergePlan> {
        self.merge.layer(layer)?.plan_for(zoom)
    }
}
