use crate::feature::Tags;
use crate::output::OutputFeature;

/// Name keys copied onto labelled features, in output order.
pub const NAME_KEYS: [&str; 18] = [
    "name",
    "name:ar",
    "name:de",
    "name:en",
    "name:es",
    "name:fr",
    "name:hi",
    "name:it",
    "name:ja",
    "name:ko",
    "name:nl",
    "name:pl",
    "name:pt",
    "name:ru",
    "name:sv",
    "name:tr",
    "name:uk",
    "name:zh",
];

/// Copy the OSM name and its translations.
pub fn set_osm_names<T: Tags + ?Sized>(feature: &mut OutputFeature, tags: &T) {
    for key in NAME_KEYS {
        if let Some(v) = tags.value(key) {
            feature.set_attr(key, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AttrValue, OutputGeometry};
    use std::collections::HashMap;

    #[test]
    fn test_copies_known_names_only() {
        let tags: HashMap<String, String> = [("name", "Bodensee"), ("name:en", "Lake Constance"), ("name:xx", "?")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut f = OutputFeature::new("water", OutputGeometry::PointOnSurface);
        set_osm_names(&mut f, &tags);

        assert_eq!(f.attr("name").and_then(AttrValue::as_str), Some("Bodensee"));
        assert_eq!(f.attr("name:en").and_then(AttrValue::as_str), Some("Lake Constance"));
        assert_eq!(f.attr("name:xx"), None);
    }
}
