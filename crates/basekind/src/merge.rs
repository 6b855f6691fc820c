//! Per-zoom parameters for the external merge stage.
//!
//! After tiles are assembled, each layer's features are merged once per zoom
//! level. The thresholds are tunable policy rather than derived values, so
//! they live in [`MergePolicy`], which can be loaded from JSON and is
//! validated before use.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::MergeConfigError;
use crate::lod::{BUFFER, MIN_AREA, PIXEL_TOLERANCE};

/// Which merge the external stage runs for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOp {
    /// Union polygons closer than `merge_distance`, dropping small ones.
    NearbyPolygons,
    /// Join touching line strings first, then merge nearby polygons.
    LinesThenNearbyPolygons,
    /// Union overlapping polygons, dropping those under `min_area`.
    OverlappingPolygons,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    pub pixel_tolerance: f64,
    pub min_area: f64,
    pub min_hole_area: f64,
    pub buffer: f64,
    pub merge_distance: f64,
    pub simplify_tolerance: f64,
}

impl MergeParams {
    fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("pixel_tolerance", self.pixel_tolerance),
            ("min_area", self.min_area),
            ("min_hole_area", self.min_hole_area),
            ("buffer", self.buffer),
            ("merge_distance", self.merge_distance),
            ("simplify_tolerance", self.simplify_tolerance),
        ]
    }
}

/// Parameters for every zoom up to and including `up_to_zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeBand {
    pub up_to_zoom: u8,
    #[serde(flatten)]
    pub params: MergeParams,
}

/// Zoom-banded merge settings of one layer. The first band covering a zoom
/// applies; the last band also covers every zoom above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMergePolicy {
    pub op: MergeOp,
    pub bands: Vec<MergeBand>,
}

/// What the merge stage receives for one layer at one zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MergePlan {
    pub zoom: u8,
    pub op: MergeOp,
    #[serde(flatten)]
    pub params: MergeParams,
}

impl LayerMergePolicy {
    pub fn params_for(&self, zoom: u8) -> Option<MergeParams> {
        self.bands
            .iter()
            .find(|b| zoom <= b.up_to_zoom)
            .or_else(|| self.bands.last())
            .map(|b| b.params)
    }

    pub fn plan_for(&self, zoom: u8) -> Option<MergePlan> {
        self.params_for(zoom).map(|params| MergePlan { zoom, op: self.op, params })
    }

    fn validate(&self, layer: &str) -> Result<(), MergeConfigError> {
        if self.bands.is_empty() {
            return Err(MergeConfigError::EmptyTable { layer: layer.to_owned() });
        }

        for pair in self.bands.windows(2) {
            if pair[1].up_to_zoom <= pair[0].up_to_zoom {
                return Err(MergeConfigError::UnorderedBands {
                    layer: layer.to_owned(),
                    previous: pair[0].up_to_zoom,
                    found: pair[1].up_to_zoom,
                });
            }
        }

        for band in &self.bands {
            for (field, value) in band.params.fields() {
                if !value.is_finite() || value < 0.0 {
                    return Err(MergeConfigError::BadValue { layer: layer.to_owned(), field, value });
                }
            }
        }

        Ok(())
    }

    /// Admin areas: nearby polygons, tighter distance below zoom 6.
    pub fn admin_areas() -> Self {
        let band = |up_to_zoom, merge_distance| MergeBand {
            up_to_zoom,
            params: MergeParams {
                pixel_tolerance: PIXEL_TOLERANCE,
                min_area: 0.0,
                min_hole_area: 0.0,
                buffer: 12.0,
                merge_distance,
                simplify_tolerance: 0.0,
            },
        };
        Self {
            op: MergeOp::NearbyPolygons,
            bands: vec![band(5, 0.2), band(u8::MAX, 0.4)],
        }
    }

    /// Water keeps more detail and wider buffers at low zooms so rivers do
    /// not break up.
    pub fn water() -> Self {
        let low = MergeParams {
            pixel_tolerance: 0.1,
            min_area: MIN_AREA * 0.5,
            min_hole_area: MIN_AREA * 0.5,
            buffer: BUFFER * 2.0,
            merge_distance: 0.25,
            simplify_tolerance: 1.0,
        };
        let mid = MergeParams {
            buffer: BUFFER * 1.5,
            merge_distance: 0.5,
            simplify_tolerance: 2.0,
            ..low
        };
        let high = MergeParams {
            pixel_tolerance: PIXEL_TOLERANCE,
            min_area: MIN_AREA,
            min_hole_area: MIN_AREA,
            buffer: BUFFER,
            ..mid
        };
        Self {
            op: MergeOp::LinesThenNearbyPolygons,
            bands: vec![
                MergeBand { up_to_zoom: 6, params: low },
                MergeBand { up_to_zoom: 8, params: mid },
                MergeBand { up_to_zoom: u8::MAX, params: high },
            ],
        }
    }

    pub fn earth() -> Self {
        Self {
            op: MergeOp::OverlappingPolygons,
            bands: vec![MergeBand {
                up_to_zoom: u8::MAX,
                params: MergeParams {
                    pixel_tolerance: PIXEL_TOLERANCE,
                    min_area: MIN_AREA,
                    min_hole_area: 0.0,
                    buffer: 0.0,
                    merge_distance: 0.0,
                    simplify_tolerance: 0.0,
                },
            }],
        }
    }
}

/// Merge settings of every layer. Missing layers in a config file keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergePolicy {
    #[serde(default = "LayerMergePolicy::admin_areas")]
    pub admin_areas: LayerMergePolicy,
    #[serde(default = "LayerMergePolicy::water")]
    pub water: LayerMergePolicy,
    #[serde(default = "LayerMergePolicy::earth")]
    pub earth: LayerMergePolicy,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            admin_areas: LayerMergePolicy::admin_areas(),
            water: LayerMergePolicy::water(),
            earth: LayerMergePolicy::earth(),
        }
    }
}

impl MergePolicy {
    pub fn from_json_str(s: &str) -> Result<Self, MergeConfigError> {
        let policy: Self = serde_json::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MergeConfigError> {
        let policy: Self = serde_json::from_reader(reader)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), MergeConfigError> {
        self.admin_areas.validate("admin_areas")?;
        self.water.validate("water")?;
        self.earth.validate("earth")
    }

    pub fn layer(&self, name: &str) -> Option<&LayerMergePolicy> {
        match name {
            "admin_areas" => Some(&self.admin_areas),
            "water" => Some(&self.water),
            "earth" => Some(&self.earth),
            _ => None,
        }
    }
}
