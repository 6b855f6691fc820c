//! Level-of-detail policy: zoom ranges, tolerances, buffers and label zooms.

use std::f64::consts::PI;

/// Default simplification tolerance in pixels.
pub const PIXEL_TOLERANCE: f64 = 0.2;
/// Default minimum polygon area (square pixels) kept by the merge stage.
pub const MIN_AREA: f64 = 1.0;
/// Default merge buffer in pixels.
pub const BUFFER: f64 = 0.0625;

/// Highest zoom the engine emits.
pub const MAX_ZOOM: u8 = 15;

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const TILE_SIZE_PX: f64 = 256.0;

/// Sort rank given to every water feature.
pub const WATER_SORT_RANK: i32 = 200;

/// Pixels covered by `meters` at the equator at `zoom`.
pub fn meters_to_pixel_at_equator(zoom: u8, meters: f64) -> f64 {
    meters / (2.0 * PI * EARTH_RADIUS_M) * TILE_SIZE_PX * 2f64.powi(i32::from(zoom))
}

/// World-normalised area of a 70 000 m² square at the equator.
pub fn world_area_for_70k_square_meters() -> f64 {
    (meters_to_pixel_at_equator(0, 70_000f64.sqrt()) / TILE_SIZE_PX).powi(2)
}

/// Feature area expressed in multiples of the 70 000 m² reference.
pub fn area_ratio(world_area: f64) -> f64 {
    world_area / world_area_for_70k_square_meters()
}

/// First zoom in 6..=14 at which the feature is large enough for a label:
/// the first zoom whose threshold `4^(15 - zoom)` the ratio exceeds. Small
/// features get [`MAX_ZOOM`].
pub fn label_min_zoom(area_ratio: f64) -> u8 {
    (6..MAX_ZOOM)
        .find(|&z| area_ratio > 4f64.powi(i32::from(MAX_ZOOM - z)))
        .unwrap_or(MAX_ZOOM)
}

/// The `min_zoom` attribute handed to clients is one above the engine's own
/// gate; client label collision depends on the offset.
#[inline]
pub fn client_min_zoom(min_zoom: u8) -> i64 {
    i64::from(min_zoom) + 1
}

/// Clamp an arbitrary integer zoom onto `0..=MAX_ZOOM`.
pub fn clamp_zoom(z: i64) -> u8 {
    z.clamp(0, i64::from(MAX_ZOOM)) as u8
}

/// Natural Earth resolution tier of a source layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// `ne_50m_*`: low zooms only.
    Coarse,
    /// `ne_10m_*` and anything else.
    Fine,
}

impl ResolutionTier {
    pub fn from_source_layer(layer: &str) -> Self {
        if layer.contains("_50m_") || layer.starts_with("ne_50m") {
            ResolutionTier::Coarse
        } else {
            ResolutionTier::Fine
        }
    }

    pub fn min_zoom(self) -> u8 {
        match self {
            ResolutionTier::Coarse => 0,
            ResolutionTier::Fine => 4,
        }
    }

    pub fn max_zoom(self) -> u8 {
        match self {
            ResolutionTier::Coarse => 3,
            ResolutionTier::Fine => 5,
        }
    }

    /// Tier range with an optional rule-provided floor, never past the tier's
    /// max zoom.
    pub fn zoom_range(self, explicit_min: Option<u8>) -> ZoomRange {
        let floor = explicit_min.map_or(self.min_zoom(), |z| z.max(self.min_zoom()));
        ZoomRange::new(floor.min(self.max_zoom()), self.max_zoom())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Open-ended range starting at `min`.
    pub fn starting_at(min: u8) -> Self {
        Self { min, max: MAX_ZOOM }
    }

    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }
}

/// Derived rendering parameters of one emitted geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodParams {
    pub zoom: ZoomRange,
    pub pixel_tolerance: Option<f64>,
    pub buffer_pixels: Option<f64>,
    pub min_pixel_size: Option<f64>,
    pub sort_rank: Option<i32>,
}

impl LodParams {
    /// Natural Earth polygon at a resolution tier.
    pub fn reference_polygon(tier: ResolutionTier, explicit_min: Option<u8>, sort_rank: i32) -> Self {
        Self {
            zoom: tier.zoom_range(explicit_min),
            pixel_tolerance: Some(PIXEL_TOLERANCE),
            buffer_pixels: Some(8.0),
            min_pixel_size: Some(1.0),
            sort_rank: Some(sort_rank),
        }
    }

    /// OSM admin polygon for an admin level; small polygons are never
    /// filtered.
    pub fn osm_admin_polygon(admin_level: i32) -> Self {
        let theme = crate::relation::AdminTheme::for_level(admin_level);
        Self {
            zoom: ZoomRange::starting_at(theme.min_zoom),
            pixel_tolerance: Some(PIXEL_TOLERANCE),
            buffer_pixels: Some(8.0),
            min_pixel_size: Some(0.0),
            sort_rank: Some(crate::relation::sort_rank(admin_level)),
        }
    }
}

/// Minimum pixel size of a water polygon; rivers get 0 so they are never
/// area-filtered.
pub fn water_polygon_min_pixel_size(kind: &str) -> f64 {
    match kind {
        "river" => 0.0,
        "riverbank" => 0.5,
        _ => 1.0,
    }
}

pub fn water_polygon_tolerance(kind: &str) -> f64 {
    if kind == "riverbank" {
        PIXEL_TOLERANCE * 0.75
    } else {
        PIXEL_TOLERANCE
    }
}

fn is_major_waterway(kind: &str) -> bool {
    matches!(kind, "river" | "canal")
}

pub fn water_line_tolerance(kind: &str) -> f64 {
    if is_major_waterway(kind) {
        0.0
    } else {
        0.5
    }
}

/// Rivers and canals get wider buffers, widest where they show at low zooms.
pub fn water_line_buffer(kind: &str, min_zoom: u8) -> f64 {
    match (is_major_waterway(kind), min_zoom <= 8) {
        (true, true) => 12.0,
        (true, false) => 8.0,
        _ => 4.0,
    }
}

pub fn reference_water_buffer(kind: &str) -> f64 {
    if matches!(kind, "river" | "lake") {
        16.0
    } else {
        8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_area() {
        // sqrt(70000) m ~ 264.6 m; the equator is ~40075 km
        let expected = (70_000f64.sqrt() / (2.0 * PI * EARTH_RADIUS_M)).powi(2);
        assert!((world_area_for_70k_square_meters() - expected).abs() < 1e-20);
        assert!((area_ratio(expected * 3.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_min_zoom_scan() {
        // above 4^5 but not 4^6 -> first satisfied zoom is 10
        assert_eq!(label_min_zoom(4f64.powi(5) + 1.0), 10);
        assert_eq!(label_min_zoom(4f64.powi(6)), 10);
        assert_eq!(label_min_zoom(4f64.powi(9) + 1.0), 6);
        assert_eq!(label_min_zoom(1e12), 6);
        assert_eq!(label_min_zoom(4.5), 14);
        assert_eq!(label_min_zoom(4.0), 15);
        assert_eq!(label_min_zoom(0.0), 15);
    }

    #[test]
    fn test_meters_to_pixel_scales_past_u32_shift() {
        let z0 = meters_to_pixel_at_equator(0, 1000.0);
        assert!((meters_to_pixel_at_equator(14, 1000.0) / z0 - 16384.0).abs() < 1e-6);
        let far = meters_to_pixel_at_equator(40, 1000.0);
        assert!(far.is_finite());
        assert!((far / z0 - 2f64.powi(40)).abs() / 2f64.powi(40) < 1e-12);
    }

    #[test]
    fn test_client_min_zoom_offset() {
        assert_eq!(client_min_zoom(0), 1);
        assert_eq!(client_min_zoom(12), 13);
    }

    #[test]
    fn test_tier_ranges() {
        assert_eq!(
            ResolutionTier::from_source_layer("ne_50m_admin_0_countries"),
            ResolutionTier::Coarse
        );
        assert_eq!(ResolutionTier::from_source_layer("ne_10m_lakes"), ResolutionTier::Fine);
        assert_eq!(ResolutionTier::Coarse.zoom_range(None), ZoomRange::new(0, 3));
        assert_eq!(ResolutionTier::Fine.zoom_range(None), ZoomRange::new(4, 5));
    }

    #[test]
    fn test_tier_explicit_floor() {
        assert_eq!(ResolutionTier::Coarse.zoom_range(Some(2)), ZoomRange::new(2, 3));
        assert_eq!(ResolutionTier::Fine.zoom_range(Some(1)), ZoomRange::new(4, 5));
        // a floor past the tier collapses to its last zoom
        assert_eq!(ResolutionTier::Coarse.zoom_range(Some(7)), ZoomRange::new(3, 3));
    }

    #[test]
    fn test_osm_admin_lod() {
        let lod = LodParams::osm_admin_polygon(6);
        assert_eq!(lod.zoom, ZoomRange::new(8, MAX_ZOOM));
        assert_eq!(lod.buffer_pixels, Some(8.0));
        assert_eq!(lod.min_pixel_size, Some(0.0));
        assert_eq!(lod.sort_rank, Some(194));
    }

    #[test]
    fn test_water_policies() {
        assert_eq!(water_polygon_min_pixel_size("river"), 0.0);
        assert_eq!(water_polygon_min_pixel_size("riverbank"), 0.5);
        assert_eq!(water_polygon_min_pixel_size("lake"), 1.0);
        assert!((water_polygon_tolerance("riverbank") - 0.15).abs() < 1e-12);
        assert_eq!(water_line_tolerance("canal"), 0.0);
        assert_eq!(water_line_tolerance("stream"), 0.5);
        assert_eq!(water_line_buffer("river", 7), 12.0);
        assert_eq!(water_line_buffer("canal", 9), 8.0);
        assert_eq!(water_line_buffer("stream", 7), 4.0);
        assert_eq!(reference_water_buffer("lake"), 16.0);
        assert_eq!(reference_water_buffer("ocean"), 8.0);
    }

    #[test]
    fn test_clamp_zoom() {
        assert_eq!(clamp_zoom(-3), 0);
        assert_eq!(clamp_zoom(7), 7);
        assert_eq!(clamp_zoom(40), MAX_ZOOM);
    }
}
