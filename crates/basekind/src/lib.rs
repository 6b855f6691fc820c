//! basekind: classify OSM and Natural Earth features into basemap kinds.
//!
//! - Tag rules: ordered predicate/action lists folded per feature
//!   ([`matcher::MatchIndex`]). Later rules override earlier ones, and an
//!   explicit clear drops an attribute.
//! - Admin boundaries: relations are reduced to membership records before
//!   ways are read ([`relation::preprocess`]); a way's memberships are folded
//!   into one admin class ([`relation::aggregate`]).
//! - Country codes: Natural Earth field chains and OSM ISO tags, with alpha-3
//!   and English-name fallbacks ([`country`]).
//! - Level of detail: zoom ranges, tolerances, buffers and label zooms per
//!   feature ([`lod`]), plus per-zoom merge parameters ([`merge`]).
//! - Layers: `admin_areas`, `water`, `earth` (with Antarctic glaciers on
//!   `landcover`), routed by source through [`profile::Profile`].
//!
//! Geometry and tile encoding are outside this crate. Features come in
//! through [`feature::SourceFeature`] and go out as
//! [`output::OutputFeature`]s collected per source feature.
//!
//! Sources:
//!   `ne`        : Natural Earth shapefile records (`source_layer` is the file)
//!   `osm`       : OSM nodes, ways and multipolygons
//!   `osm_land`  : pre-built land polygons
//!   `osm_water` : pre-built ocean polygons

pub mod country;
pub mod error;
pub mod feature;
pub mod layers;
pub mod lod;
pub mod matcher;
pub mod merge;
pub mod output;
pub mod profile;
pub mod relation;

pub use error::{GeometryError, MergeConfigError, RuleError};
pub use feature::{GeometryType, SimpleFeature, SourceFeature, Tags};
pub use merge::{MergeOp, MergePlan, MergePolicy};
pub use output::{AttrValue, FeatureCollector, OutputFeature, OutputGeometry};
pub use profile::Profile;
pub use relation::{OsmRelation, RelationMembership};
