//! Raw dataset reorganization.
//!
//! Converts the raw `data/{SPECIES}/{HEALTH_STATUS}/` layout into the
//! canonical `{category}/{subcategory}/{csv,json,images,sets}/` tree:
//! images and per-image JSON sidecars are copied, per-image CSVs are derived
//! from the JSON, a labelmap is written per category, and category-level
//! split files are generated with a seeded shuffle so runs are reproducible.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::boxes::{self, BoundingBox};
use crate::error::PlantcocoError;
use crate::labelmap;
use crate::perimage::PerImageDocument;

/// Uppercase species directory name → lowercase plural category name.
const SPECIES_TO_CATEGORY: [(&str, &str); 8] = [
    ("APPLE", "apples"),
    ("APRICOT", "apricots"),
    ("CHERRY", "cherries"),
    ("CRANBERRY", "cranberries"),
    ("GRAPES", "grapes"),
    ("PEACH", "peaches"),
    ("PEAR", "pears"),
    ("WALNUT", "walnuts"),
];

/// Uppercase health status → lowercase subcategory name.
const HEALTH_TO_SUBCATEGORY: [(&str, &str); 2] = [("DISEASED", "diseased"), ("HEALTHY", "healthy")];

const TRAIN_RATIO: f64 = 0.7;
const VAL_RATIO: f64 = 0.15;

/// Seed for the split shuffle; fixed so reorganization is reproducible.
const SPLIT_SEED: u64 = 42;

/// Reorganizes `data_dir` into the canonical tree under `output_dir`.
///
/// Unknown species or health-status directories are skipped with a warning.
pub fn run_reorganize(data_dir: &Path, output_dir: &Path) -> Result<(), PlantcocoError> {
    let mut subcategories_per_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut stems_per_category: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for species_dir in sorted_dirs(data_dir)? {
        let species_name = dir_name(&species_dir);
        let Some(category) = lookup(&SPECIES_TO_CATEGORY, &species_name) else {
            warn!("Unknown species {species_name}, skipping");
            continue;
        };

        for health_dir in sorted_dirs(&species_dir)? {
            let health_name = dir_name(&health_dir);
            let Some(subcategory) = lookup(&HEALTH_TO_SUBCATEGORY, &health_name) else {
                warn!("Unknown health status {health_name}, skipping");
                continue;
            };

            let subcategories = subcategories_per_category
                .entry(category.to_string())
                .or_default();
            if !subcategories.contains(&subcategory.to_string()) {
                subcategories.push(subcategory.to_string());
            }

            let count = reorganize_leaf(
                &health_dir,
                output_dir,
                category,
                subcategory,
                stems_per_category.entry(category.to_string()).or_default(),
            )?;
            info!("Processed {category}/{subcategory}: {count} images");
        }
    }

    for (category, subcategories) in &subcategories_per_category {
        labelmap::write(
            &output_dir.join(category).join("labelmap.json"),
            subcategories,
        )?;

        let stems = stems_per_category.remove(category).unwrap_or_default();
        write_category_splits(&output_dir.join(category).join("sets"), stems)?;
    }

    Ok(())
}

/// Copies one `SPECIES/HEALTH` leaf into `{category}/{subcategory}/`,
/// deriving the per-image CSVs, and records the image stems.
fn reorganize_leaf(
    health_dir: &Path,
    output_dir: &Path,
    category: &str,
    subcategory: &str,
    stems: &mut Vec<String>,
) -> Result<usize, PlantcocoError> {
    let base_dir = output_dir.join(category).join(subcategory);
    for subdir in ["csv", "json", "images", "sets"] {
        fs::create_dir_all(base_dir.join(subdir)).map_err(PlantcocoError::Io)?;
    }

    let mut count = 0;
    let mut entries: Vec<PathBuf> = fs::read_dir(health_dir)
        .map_err(PlantcocoError::Io)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if !is_image_path(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(file_name) = path.file_name() else {
            continue;
        };

        fs::copy(&path, base_dir.join("images").join(file_name)).map_err(PlantcocoError::Io)?;

        let json_path = first_existing(&[
            health_dir.join(format!("{stem}.json")),
            health_dir.join(format!("{stem}.JSON")),
        ]);
        match json_path {
            Some(json_path) => {
                let json_name = json_path.file_name().unwrap_or_default();
                fs::copy(&json_path, base_dir.join("json").join(json_name))
                    .map_err(PlantcocoError::Io)?;
                derive_csv_from_json(&json_path, &base_dir.join("csv").join(format!("{stem}.csv")))?;
            }
            None => warn!("JSON file not found for {}", path.display()),
        }

        stems.push(stem.to_string());
        count += 1;
    }

    Ok(count)
}

/// Derives a per-image CSV from a per-image JSON sidecar.
///
/// The sidecar carries at most one full-image annotation; only the first is
/// taken. An unreadable sidecar or one without annotations yields a
/// header-only CSV.
pub fn derive_csv_from_json(json_path: &Path, csv_path: &Path) -> Result<(), PlantcocoError> {
    let boxes = match read_sidecar_boxes(json_path) {
        Ok(boxes) => boxes,
        Err(err) => {
            warn!("Error converting {} to CSV: {}", json_path.display(), err);
            Vec::new()
        }
    };
    boxes::write_box_csv(csv_path, &boxes)
}

fn read_sidecar_boxes(json_path: &Path) -> Result<Vec<BoundingBox>, PlantcocoError> {
    let content = fs::read_to_string(json_path).map_err(PlantcocoError::Io)?;
    let document: PerImageDocument =
        serde_json::from_str(&content).map_err(|source| PlantcocoError::PerImageJsonParse {
            path: json_path.to_path_buf(),
            source,
        })?;

    Ok(document
        .annotations
        .first()
        .map(|ann| {
            vec![BoundingBox {
                x: ann.bbox[0],
                y: ann.bbox[1],
                width: ann.bbox[2],
                height: ann.bbox[3],
                label: ann.category_id,
            }]
        })
        .unwrap_or_default())
}

/// Writes the five category-level split files from a seeded shuffle of the
/// deduplicated stems: 70% train, 15% val, the remainder test, plus `all`
/// and `train_val`.
fn write_category_splits(sets_dir: &Path, stems: Vec<String>) -> Result<(), PlantcocoError> {
    fs::create_dir_all(sets_dir).map_err(PlantcocoError::Io)?;

    let mut unique: Vec<String> = stems;
    unique.sort();
    unique.dedup();
    let all = unique.clone();

    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    unique.shuffle(&mut rng);

    let total = unique.len();
    let train_end = (total as f64 * TRAIN_RATIO) as usize;
    let val_end = train_end + (total as f64 * VAL_RATIO) as usize;

    let train = &unique[..train_end];
    let val = &unique[train_end..val_end];
    let test = &unique[val_end..];
    let train_val: Vec<String> = train.iter().chain(val.iter()).cloned().collect();

    write_split_file(&sets_dir.join("train.txt"), train)?;
    write_split_file(&sets_dir.join("val.txt"), val)?;
    write_split_file(&sets_dir.join("test.txt"), test)?;
    write_split_file(&sets_dir.join("all.txt"), &all)?;
    write_split_file(&sets_dir.join("train_val.txt"), &train_val)?;

    info!(
        "Created splits under {}: train={}, val={}, test={}",
        sets_dir.display(),
        train.len(),
        val.len(),
        test.len()
    );
    Ok(())
}

fn write_split_file(path: &Path, stems: &[String]) -> Result<(), PlantcocoError> {
    let mut content = stems.join("\n");
    content.push('\n');
    fs::write(path, content).map_err(PlantcocoError::Io)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>, PlantcocoError> {
    let mut dirs = Vec::new();
    if !dir.is_dir() {
        return Ok(dirs);
    }
    for entry in fs::read_dir(dir).map_err(PlantcocoError::Io)? {
        let path = entry.map_err(PlantcocoError::Io)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(from, _)| *from == key)
        .map(|(_, to)| *to)
}

fn is_image_path(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                crate::splits::IMAGE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.exists()).cloned()
}
