use log::warn;

use crate::feature::SourceFeature;
use crate::layers::Layer;
use crate::output::FeatureCollector;

pub const LAYER_NAME: &str = "earth";
pub const LANDCOVER_LAYER: &str = "landcover";
pub const PREPARED_SOURCE: &str = "osm_land";

/// World-normalised Y of roughly 60°S.
const ANTARCTICA_MIN_Y: f64 = 0.7;

/// Land polygons, plus Antarctic glaciers missing from the landcover source.
#[derive(Debug, Default)]
pub struct Earth;

impl Layer for Earth {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn process_ne(&self, sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        match sf.source_layer() {
            Some("ne_10m_land") => {
                features
                    .polygon(LAYER_NAME)
                    .set_zoom_range(0, 2)
                    .set_buffer_pixels(8.0)
                    .set_attr("kind", "earth");
            }
            // The landcover source stops near 80°S, so Antarctic glaciers
            // come from Natural Earth instead.
            Some("ne_10m_glaciated_areas") => match sf.centroid() {
                Ok([_, y]) if y > ANTARCTICA_MIN_Y => {
                    features
                        .polygon(LANDCOVER_LAYER)
                        .set_attr("kind", "glacier")
                        .set_zoom_range(0, 7)
                        .set_min_pixel_size(0.0);
                }
                Ok(_) => {}
                Err(e) => warn!("skipping glaciated area: {e}"),
            },
            _ => {}
        }
    }

    fn prepared_source(&self) -> Option<&'static str> {
        Some(PREPARED_SOURCE)
    }

    fn process_prepared_osm(&self, _sf: &dyn SourceFeature, features: &mut FeatureCollector) {
        features
            .polygon(LAYER_NAME)
            .set_zoom_range(3, 9)
            .set_buffer_pixels(12.0)
            .set_attr("kind", "earth");
        features
            .polygon(LAYER_NAME)
            .set_zoom_range(10, 15)
            .set_buffer_pixels(8.0)
            .set_attr("kind", "earth");
    }
}
