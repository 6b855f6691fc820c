//! Thematic layer drivers.
//!
//! Each driver turns source features of one theme into output features. The
//! [`crate::profile::Profile`] calls every driver for every feature and lets it
//! decide whether the feature is relevant.

pub mod admin_areas;
pub mod earth;
pub mod names;
pub mod water;

use crate::feature::SourceFeature;
use crate::output::FeatureCollector;
use crate::relation::{OsmRelation, RelationMembership};

pub use admin_areas::AdminAreas;
pub use earth::Earth;
pub use water::Water;

pub trait Layer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Natural Earth features.
    fn process_ne(&self, _sf: &dyn SourceFeature, _features: &mut FeatureCollector) {}

    /// OSM features.
    fn process_osm(&self, _sf: &dyn SourceFeature, _features: &mut FeatureCollector) {}

    /// Source name of the pre-built OSM polygons (land, ocean) this layer
    /// consumes, if any.
    fn prepared_source(&self) -> Option<&'static str> {
        None
    }

    fn process_prepared_osm(&self, _sf: &dyn SourceFeature, _features: &mut FeatureCollector) {}

    fn preprocess_osm_relation(&self, _relation: &OsmRelation) -> Option<RelationMembership> {
        None
    }
}
