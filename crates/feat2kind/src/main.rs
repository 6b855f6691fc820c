use anyhow::{Context, Result};
use basekind::{lod::MAX_ZOOM, MergePlan, MergePolicy, OsmRelation, OutputFeature, Profile, SimpleFeature};
use clap::Parser;
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

mod input;

#[derive(Parser, Debug, Clone)]
#[command(name = "feat2kind", version)]
struct Args {
    /// Source features, one JSON object per line.
    #[arg(long)]
    features: Option<PathBuf>,

    /// OSM relations, one JSON object per line; memberships are attached to
    /// member ways before classification.
    #[arg(long)]
    relations: Option<PathBuf>,

    /// Output file for the emitted features (NDJSON). Default: stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file overriding the per-layer merge tables
    #[arg(long)]
    merge_config: Option<PathBuf>,

    /// Print the merge plan of every layer and zoom, then exit.
    #[arg(long, default_value_t = false)]
    print_merge_table: bool,

    /// Highest zoom listed by --print-merge-table
    #[arg(long, default_value_t = MAX_ZOOM, value_parser = clap::value_parser!(u8).range(0..=15))]
    max_zoom: u8,
}

/// One output line: the emitted feature and the source feature it came from.
#[derive(Serialize)]
struct Record<'a> {
    source_id: u64,
    #[serde(flatten)]
    feature: &'a OutputFeature,
}

#[derive(Serialize)]
struct MergeRow<'a> {
    layer: &'a str,
    #[serde(flatten)]
    plan: MergePlan,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn load_merge_policy(path: &Path) -> Result<MergePolicy> {
    MergePolicy::from_reader(open(path)?).with_context(|| format!("merge config {}", path.display()))
}

fn write_merge_table<W: Write>(profile: &Profile, max_zoom: u8, out: &mut W) -> Result<()> {
    for layer in profile.layer_names() {
        for zoom in 0..=max_zoom {
            if let Some(plan) = profile.merge_plan(layer, zoom) {
                serde_json::to_writer(&mut *out, &MergeRow { layer, plan })?;
                out.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// Classify every feature in parallel; output keeps input order.
fn classify_all(profile: &Profile, features: &[SimpleFeature]) -> Vec<(u64, Vec<OutputFeature>)> {
    features
        .par_iter()
        .map(|f| (f.id, profile.classify(f)))
        .collect()
}

fn write_records<W: Write>(classified: &[(u64, Vec<OutputFeature>)], out: &mut W) -> Result<BTreeMap<String, usize>> {
    let mut per_layer: BTreeMap<String, usize> = BTreeMap::new();
    for (source_id, features) in classified {
        for feature in features {
            serde_json::to_writer(&mut *out, &Record { source_id: *source_id, feature })?;
            out.write_all(b"\n")?;
            *per_layer.entry(feature.layer.clone()).or_default() += 1;
        }
    }
    Ok(per_layer)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut profile = Profile::new().context("building layer rules")?;
    if let Some(path) = &args.merge_config {
        profile = profile.with_merge_policy(load_merge_policy(path)?);
        info!("Merge policy loaded from {}", path.display());
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.print_merge_table {
        write_merge_table(&profile, args.max_zoom, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    let features_path = args
        .features
        .as_deref()
        .context("--features is required unless --print-merge-table is given")?;

    let t0 = Instant::now();
    let mut features: Vec<SimpleFeature> = input::read_ndjson(open(features_path)?, "feature")?;
    info!("Read {} features from {}", features.len(), features_path.display());

    if let Some(path) = &args.relations {
        let relations: Vec<OsmRelation> = input::read_ndjson(open(path)?, "relation")?;
        let index = input::index_relations(&profile, &relations);
        let attached = input::attach_memberships(&mut features, &index);
        info!(
            "{} relations -> {} boundary ways; {} features carry memberships",
            relations.len(),
            index.len(),
            attached
        );
    }

    let classified = classify_all(&profile, &features);
    let per_layer = write_records(&classified, &mut out)?;
    out.flush()?;

    for (layer, count) in &per_layer {
        info!("{layer}: {count} features");
    }
    info!("Done in {:.2?}", t0.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basekind::GeometryType;

    #[test]
    fn test_merge_table_rows() {
        let profile = Profile::new().unwrap();
        let mut buf = Vec::new();
        write_merge_table(&profile, 2, &mut buf).unwrap();

        let rows: Vec<serde_json::Value> = String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        // three layers, zooms 0..=2
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[0]["layer"], "admin_areas");
        assert_eq!(rows[0]["op"], "nearby_polygons");
        assert_eq!(rows[3]["layer"], "water");
        assert_eq!(rows[3]["zoom"], 0);
    }

    #[test]
    fn test_classify_and_write_keeps_order() {
        let profile = Profile::new().unwrap();
        let features = vec![
            SimpleFeature::new(1, "osm_land", GeometryType::Polygon),
            SimpleFeature::new(2, "osm", GeometryType::Line).with_tag("waterway", "stream"),
            SimpleFeature::new(3, "osm", GeometryType::Line).with_tag("highway", "path"),
        ];
        let classified = classify_all(&profile, &features);
        let mut buf = Vec::new();
        let per_layer = write_records(&classified, &mut buf).unwrap();

        assert_eq!(per_layer.get("earth"), Some(&2));
        assert_eq!(per_layer.get("water"), Some(&1));

        let text = String::from_utf8(buf).unwrap();
        let ids: Vec<u64> = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["source_id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 1, 2]);
    }
}
