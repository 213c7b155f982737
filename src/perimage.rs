//! Per-image JSON sidecar generation.
//!
//! Walks a `data/{supercategory}/{category}/` tree and writes one COCO-style
//! JSON document per image holding a single full-image bounding box. Ids are
//! 10-digit values (7 random digits plus a 3-digit timestamp) drawn from an
//! explicit [`IdAllocator`] rather than process-wide state, so concurrent or
//! repeated generations cannot collide within one run.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::boxes;
use crate::coco::{CocoAnnotation, CocoCategory};
use crate::error::PlantcocoError;

/// A per-image sidecar document. All fields default on read so partially
/// populated sidecars still parse.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PerImageDocument {
    #[serde(default)]
    pub info: PerImageInfo,

    #[serde(default)]
    pub images: Vec<PerImageImage>,

    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PerImageInfo {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub year: u32,

    #[serde(default)]
    pub contributor: String,

    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub license: PerImageLicense,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PerImageLicense {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub url: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PerImageImage {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub file_name: String,

    /// File size in bytes.
    #[serde(default)]
    pub size: u64,

    /// Uppercase extension, e.g. "JPG".
    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub hash: String,

    #[serde(default)]
    pub status: String,
}

/// Allocates unique 10-digit image ids: a 7-digit random part followed by a
/// 3-digit timestamp part. Owns its RNG and used-id set.
pub struct IdAllocator {
    rng: StdRng,
    used: HashSet<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            used: HashSet::new(),
        }
    }

    /// Seeded construction for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            used: HashSet::new(),
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let time_part = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() % 1000)
            .unwrap_or(0);
        loop {
            let rand_part: u64 = self.rng.random_range(1_000_000..=9_999_999);
            let id = rand_part * 1000 + time_part;
            if self.used.insert(id) {
                return id;
            }
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a sidecar JSON next to every image under
/// `data_dir/{supercategory}/{category}/`.
///
/// Category ids are assigned over the sorted (supercategory, category)
/// pairs, starting at 1. Unreadable images are skipped with a warning.
pub fn run_gen_json(data_dir: &Path) -> Result<(), PlantcocoError> {
    let category_ids = build_category_id_map(data_dir)?;
    let mut ids = IdAllocator::new();

    for ((supercategory, category), category_id) in &category_ids {
        let category_dir = data_dir.join(supercategory).join(category);
        let mut image_paths: Vec<_> = fs::read_dir(&category_dir)
            .map_err(PlantcocoError::Io)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_image_path(p))
            .collect();
        image_paths.sort();

        for image_path in image_paths {
            write_sidecar(&image_path, *category_id, category, supercategory, &mut ids)?;
        }
    }

    Ok(())
}

/// Assigns sequential category ids over the sorted (supercategory, category)
/// directory pairs.
pub fn build_category_id_map(
    data_dir: &Path,
) -> Result<BTreeMap<(String, String), u64>, PlantcocoError> {
    let mut pairs = Vec::new();
    for super_dir in sorted_dirs(data_dir)? {
        for category_dir in sorted_dirs(&super_dir)? {
            pairs.push((dir_name(&super_dir), dir_name(&category_dir)));
        }
    }

    Ok(pairs
        .into_iter()
        .enumerate()
        .map(|(idx, pair)| (pair, (idx + 1) as u64))
        .collect())
}

/// Writes the sidecar document for one image. The single annotation spans
/// the full image.
pub fn write_sidecar(
    image_path: &Path,
    category_id: u64,
    category: &str,
    supercategory: &str,
    ids: &mut IdAllocator,
) -> Result<(), PlantcocoError> {
    let Some((width, height)) = boxes::image_dimensions(image_path) else {
        warn!("Skipping unreadable image {}", image_path.display());
        return Ok(());
    };

    let size = fs::metadata(image_path).map_err(PlantcocoError::Io)?.len();
    let format = image_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_uppercase();
    let file_name = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let image_id = ids.next_id();
    let document = PerImageDocument {
        info: PerImageInfo {
            description: "data".to_string(),
            version: "1.0".to_string(),
            year: 2025,
            contributor: "search engine".to_string(),
            source: "augmented".to_string(),
            license: PerImageLicense {
                name: "Creative Commons Attribution 4.0 International".to_string(),
                url: "https://creativecommons.org/licenses/by/4.0/".to_string(),
            },
        },
        images: vec![PerImageImage {
            id: image_id,
            width,
            height,
            file_name,
            size,
            format,
            url: String::new(),
            hash: String::new(),
            status: "success".to_string(),
        }],
        annotations: vec![CocoAnnotation {
            id: image_id,
            image_id,
            category_id,
            bbox: [0.0, 0.0, width as f64, height as f64],
            area: width as f64 * height as f64,
            iscrowd: 0,
        }],
        categories: vec![CocoCategory {
            id: category_id,
            name: category.to_string(),
            supercategory: supercategory.to_string(),
        }],
    };

    let json_path = image_path.with_extension("json");
    let file = fs::File::create(&json_path).map_err(PlantcocoError::Io)?;
    serde_json::to_writer_pretty(file, &document).map_err(|source| PlantcocoError::JsonWrite {
        path: json_path,
        source,
    })
}

fn sorted_dirs(dir: &Path) -> Result<Vec<std::path::PathBuf>, PlantcocoError> {
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
