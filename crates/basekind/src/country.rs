//! ISO 3166-1 country code resolution.
//!
//! Natural Earth records carry codes under several field names, some filled
//! with `-99`; OSM boundaries use a handful of tag spellings. Both paths fall
//! back to a small name table for major countries whose source records are
//! known to lack usable codes.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::feature::Tags;

/// Natural Earth fields that may hold an alpha-2 code, in lookup order.
pub const REFERENCE_ALPHA2_FIELDS: [&str; 7] =
    ["iso_a2", "ISO_A2", "ISO_A2_EH", "ISO3166-1", "ADM0_A2", "adm0_a2", "SOV_A2"];

/// Natural Earth fields that may hold an alpha-3 code, in lookup order.
pub const REFERENCE_ALPHA3_FIELDS: [&str; 3] = ["ADM0_A3", "BRK_A3", "ISO_A3"];

/// OSM tag spellings of the alpha-2 code, in lookup order.
pub const OSM_ALPHA2_TAGS: [&str; 4] = [
    "ISO3166-1:alpha2",
    "ISO3166-1",
    "country_code_iso3166_1_alpha_2",
    "iso3166-1:alpha2",
];

static NAME_TO_ISO2: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("France", "FR"),
        ("Germany", "DE"),
        ("Italy", "IT"),
        ("Spain", "ES"),
        ("United Kingdom", "GB"),
        ("United States of America", "US"),
        ("United States", "US"),
        ("Canada", "CA"),
        ("Brazil", "BR"),
        ("Russia", "RU"),
        ("Australia", "AU"),
        ("China", "CN"),
        ("Japan", "JP"),
        ("India", "IN"),
        ("Mexico", "MX"),
        ("South Africa", "ZA"),
    ])
});

static ISO3_TO_ISO2: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("FRA", "FR"),
        ("DEU", "DE"),
        ("ITA", "IT"),
        ("ESP", "ES"),
        ("GBR", "GB"),
        ("USA", "US"),
        ("CAN", "CA"),
        ("BRA", "BR"),
        ("RUS", "RU"),
        ("AUS", "AU"),
        ("CHN", "CN"),
        ("JPN", "JP"),
        ("IND", "IN"),
        ("MEX", "MX"),
        ("ZAF", "ZA"),
    ])
});

pub fn iso2_for_name(name: &str) -> Option<&'static str> {
    NAME_TO_ISO2.get(name).copied()
}

pub fn iso2_for_iso3(code: &str) -> Option<&'static str> {
    ISO3_TO_ISO2.get(code).copied()
}

/// Result of country code resolution for one feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCode {
    /// Alpha-2 code, written as `iso_code`.
    pub iso2: Option<String>,
    /// Raw alpha-3 code with no alpha-2 mapping, written as `iso_code3`.
    pub iso3: Option<String>,
}

/// Resolve a Natural Earth record: alpha-2 fields, then alpha-3 fields via
/// the ISO3 table, then the name table.
pub fn resolve_reference<T: Tags + ?Sized>(tags: &T, name: Option<&str>) -> CountryCode {
    let mut iso2 = REFERENCE_ALPHA2_FIELDS
        .iter()
        .filter_map(|field| tags.value(field))
        .find(|v| v.chars().count() == 2)
        .map(str::to_owned);
    let mut iso3 = None;

    if iso2.is_none() {
        for field in REFERENCE_ALPHA3_FIELDS {
            let Some(alpha3) = tags.value(field) else {
                continue;
            };
            if let Some(mapped) = iso2_for_iso3(alpha3) {
                iso2 = Some(mapped.to_owned());
                break;
            }
            iso3 = Some(alpha3.to_owned());
        }
    }

    if iso2.is_none() {
        iso2 = name.and_then(iso2_for_name).map(str::to_owned);
    }

    CountryCode { iso2, iso3 }
}

/// Resolve an OSM boundary: the first alpha-2 tag present is used when it is
/// two characters long; otherwise country-level boundaries fall back to the
/// name table.
pub fn resolve_osm<T: Tags + ?Sized>(tags: &T, name: Option<&str>, admin_level: i32) -> Option<String> {
    let tagged = OSM_ALPHA2_TAGS.iter().find_map(|key| tags.value(key));

    match tagged {
        Some(code) if code.chars().count() == 2 => Some(code.to_owned()),
        _ if admin_level == 2 => name.and_then(iso2_for_name).map(str::to_owned),
        _ => None,
    }
}
