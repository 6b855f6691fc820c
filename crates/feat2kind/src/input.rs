use std::io::BufRead;

use anyhow::{Context, Result};
use basekind::{OsmRelation, Profile, RelationMembership, SimpleFeature};
use log::{debug, warn};
use nohash_hasher::BuildNoHashHasher;
use serde::de::DeserializeOwned;
use smallvec::SmallVec;

/// Way id -> admin memberships. Most ways sit on one or two boundaries.
pub type MembershipIndex = hashbrown::HashMap<i64, SmallVec<[RelationMembership; 2]>, BuildNoHashHasher<i64>>;

/// Read newline-delimited JSON. Blank lines are ignored; lines that fail to
/// parse are logged and skipped.
pub fn read_ndjson<T, R>(reader: R, what: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {what} line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(item) => items.push(item),
            Err(e) => warn!("{what} line {}: {e}; skipped", idx + 1),
        }
    }
    Ok(items)
}

/// Preprocess every relation and index the survivors by member way.
pub fn index_relations(profile: &Profile, relations: &[OsmRelation]) -> MembershipIndex {
    let mut index = MembershipIndex::with_hasher(BuildNoHashHasher::default());
    for relation in relations {
        let Some(membership) = profile.preprocess_osm_relation(relation) else {
            debug!("relation {} is not an admin boundary", relation.id);
            continue;
        };
        for &way in &relation.members {
            index.entry(way).or_default().push(membership);
        }
    }
    index
}

/// Hand each OSM way the memberships of the relations it belongs to.
pub fn attach_memberships(features: &mut [SimpleFeature], index: &MembershipIndex) -> usize {
    let mut attached = 0;
    for feature in features.iter_mut().filter(|f| f.source == "osm") {
        let Ok(way) = i64::try_from(feature.id) else {
            continue;
        };
        if let Some(memberships) = index.get(&way) {
            feature.relations.extend(memberships.iter().copied());
            attached += 1;
        }
    }
    attached
}
