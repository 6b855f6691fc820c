//! Administrative boundary relations.
//!
//! Relations are preprocessed once into compact [`RelationMembership`]
//! records which the reader attaches to every member way. A way shared by a
//! country and a region boundary carries both; [`aggregate`] reduces them to
//! one [`EffectiveAdminClass`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::feature::Tags;

/// Finest admin level this classification vocabulary covers.
pub const MAX_ADMIN_LEVEL: i32 = 8;

/// Level assumed for `boundary=disputed` relations without a usable level.
pub const DISPUTED_DEFAULT_LEVEL: i32 = 2;

/// An OSM relation as handed over by the reader, before preprocessing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsmRelation {
    pub id: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Ids of member ways.
    #[serde(default)]
    pub members: Vec<i64>,
}

impl OsmRelation {
    pub fn new(id: i64) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_member(mut self, way_id: i64) -> Self {
        self.members.push(way_id);
        self
    }
}

impl Tags for OsmRelation {
    fn raw(&self, key: &str) -> Option<&str> {
        self.tags.raw(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationMembership {
    pub relation_id: i64,
    pub admin_level: i32,
    pub disputed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveAdminClass {
    pub admin_level: i32,
    pub disputed: bool,
}

impl EffectiveAdminClass {
    pub fn theme(&self) -> AdminTheme {
        AdminTheme::for_level(self.admin_level)
    }

    pub fn sort_rank(&self) -> i32 {
        sort_rank(self.admin_level)
    }

    pub fn is_country(&self) -> bool {
        self.admin_level == 2
    }
}

fn parse_level(tags: &impl Tags) -> Option<i32> {
    tags.value("admin_level")?.trim().parse().ok()
}

/// Turn a relation into a membership record, or `None` when it is not an
/// admin boundary this system classifies.
///
/// `boundary=administrative` needs a parseable `admin_level`;
/// `boundary=disputed` defaults to country level. Either way anything finer
/// than [`MAX_ADMIN_LEVEL`] is dropped.
pub fn preprocess(relation: &OsmRelation) -> Option<RelationMembership> {
    let (admin_level, disputed) = if relation.has_tag("boundary", "administrative") {
        (parse_level(relation)?, false)
    } else if relation.has_tag("boundary", "disputed") {
        (parse_level(relation).unwrap_or(DISPUTED_DEFAULT_LEVEL), true)
    } else {
        return None;
    };

    if admin_level > MAX_ADMIN_LEVEL {
        return None;
    }

    Some(RelationMembership { relation_id: relation.id, admin_level, disputed })
}

/// Broadest level wins; any disputing relation marks the feature disputed.
pub fn aggregate(memberships: &[RelationMembership]) -> Option<EffectiveAdminClass> {
    let admin_level = memberships.iter().map(|m| m.admin_level).min()?;
    let disputed = memberships.iter().any(|m| m.disputed);
    Some(EffectiveAdminClass { admin_level, disputed })
}

/// Output kind and first visible zoom for an admin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminTheme {
    pub kind: &'static str,
    pub min_zoom: u8,
}

impl AdminTheme {
    pub fn for_level(level: i32) -> Self {
        let (kind, min_zoom) = match level {
            2 => ("country", 6),
            // 3: Colombia, Brazil, Kenya (historical)
            3 | 4 => ("region", 6),
            // 5: Colombia, Brazil
            5 | 6 => ("county", 8),
            _ => ("locality", 10),
        };
        Self { kind, min_zoom }
    }
}

/// Draw order hint: higher ranks draw later, i.e. above. Broader levels rank
/// higher than the finer areas inside them, so country edges sit on top.
#[inline]
pub fn sort_rank(admin_level: i32) -> i32 {
    200 - admin_level
}
