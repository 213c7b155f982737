//! Split-aware COCO annotation assembly for one category root.
//!
//! This is the orchestration core: it composes split resolution
//! ([`crate::splits`]), the label catalog ([`crate::labelmap`]) and the
//! per-image annotation source ([`crate::boxes`]) into ordered image and
//! annotation records with sequential ids.
//!
//! # Determinism
//!
//! Stems are processed in lexicographic order, and subcategory directories
//! are probed in lexicographic order. When the same stem exists under more
//! than one subcategory only the first match is used; the enumeration order
//! makes that choice reproducible, but the overlap itself is an ambiguity in
//! the source layout that is deliberately not papered over.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::boxes;
use crate::coco::{CocoAnnotation, CocoCategory, CocoImage};
use crate::error::PlantcocoError;
use crate::labelmap;
use crate::splits;

/// Probe priority for locating `<stem>.<ext>` under an `images/` directory.
/// First hit wins, so the order matters when duplicate stems exist with
/// different extensions.
const PROBE_EXTENSIONS: [&str; 6] = ["png", "jpg", "JPG", "PNG", "jpeg", "JPEG"];

/// Owns the monotonic id counters for one document (or, when shared across
/// categories, one combined dataset). Counter state lives here rather than
/// in process-wide globals, so parallel or repeated assemblies cannot
/// interfere.
#[derive(Debug)]
pub struct AssemblyContext {
    next_image_id: u64,
    next_annotation_id: u64,
}

impl AssemblyContext {
    /// Creates a fresh context with both counters starting at 1.
    pub fn new() -> Self {
        Self {
            next_image_id: 1,
            next_annotation_id: 1,
        }
    }

    fn allocate_image_id(&mut self) -> u64 {
        let id = self.next_image_id;
        self.next_image_id += 1;
        id
    }

    fn allocate_annotation_id(&mut self) -> u64 {
        let id = self.next_annotation_id;
        self.next_annotation_id += 1;
        id
    }
}

impl Default for AssemblyContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The assembled output for one (category, split) pair.
#[derive(Clone, Debug)]
pub struct CategoryBatch {
    /// The category's directory name.
    pub category: String,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

/// Assembles images, annotations and categories for one category root and
/// one split.
///
/// Ids are allocated from `ctx`; pass a fresh context for a standalone
/// document, or a shared one when the output feeds a combined merge (image
/// ids must then stay globally unique).
///
/// # Errors
/// Returns an error on a malformed labelmap or on filesystem failures while
/// enumerating directories. Per-stem problems (missing image, unreadable
/// image, malformed CSV rows) are absorbed with warnings.
pub fn assemble_category(
    category_root: &Path,
    split_name: &str,
    ctx: &mut AssemblyContext,
) -> Result<CategoryBatch, PlantcocoError> {
    let category = category_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let stems = splits::resolve(category_root, split_name)?;
    let subcategory_dirs = splits::subcategory_dirs(category_root)?;

    // Labelmap if present, otherwise categories synthesized from the sorted
    // subcategory directory names with ids from 1.
    let (name_to_id, categories) = match labelmap::load(category_root, &category)? {
        Some(catalog) => (catalog.name_to_id, catalog.categories),
        None => synthesize_categories(&subcategory_dirs, &category),
    };

    let mut images = Vec::new();
    let mut annotations = Vec::new();

    for stem in &stems {
        let Some(hit) = probe_subcategories(&subcategory_dirs, stem) else {
            // Stem not present under any subcategory: skipped entirely.
            continue;
        };

        let Some((width, height)) = boxes::image_dimensions(&hit.image_path) else {
            continue;
        };
        if width == 0 || height == 0 {
            warn!("Skipping invalid image {}", hit.image_path.display());
            continue;
        }

        let image_id = ctx.allocate_image_id();
        let file_name = format!(
            "{}/{}/images/{}",
            category,
            hit.subcategory,
            hit.image_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
        );
        images.push(CocoImage {
            id: image_id,
            file_name,
            width,
            height,
        });

        for bbox in boxes::read_box_csv(&hit.csv_path)? {
            // Subcategory-level labeling takes precedence over the row's
            // label value when a mapping exists.
            let category_id = name_to_id
                .get(&hit.subcategory)
                .copied()
                .unwrap_or(bbox.label);

            annotations.push(CocoAnnotation {
                id: ctx.allocate_annotation_id(),
                image_id,
                category_id,
                area: bbox.area(),
                bbox: [bbox.x, bbox.y, bbox.width, bbox.height],
                iscrowd: 0,
            });
        }
    }

    Ok(CategoryBatch {
        category,
        images,
        annotations,
        categories,
    })
}

struct ProbeHit {
    subcategory: String,
    image_path: PathBuf,
    csv_path: PathBuf,
}

/// First-match probe across subcategory directories for `<stem>.<ext>`.
fn probe_subcategories(subcategory_dirs: &[PathBuf], stem: &str) -> Option<ProbeHit> {
    for dir in subcategory_dirs {
        let images_dir = dir.join("images");
        for ext in PROBE_EXTENSIONS {
            let candidate = images_dir.join(format!("{stem}.{ext}"));
            if candidate.exists() {
                return Some(ProbeHit {
                    subcategory: dir
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_string(),
                    image_path: candidate,
                    csv_path: dir.join("csv").join(format!("{stem}.csv")),
                });
            }
        }
    }
    None
}

/// Fallback when no labelmap exists: sequential ids over the
/// lexicographically sorted subcategory names, plus the matching name→id
/// mapping so downstream logic is uniform.
fn synthesize_categories(
    subcategory_dirs: &[PathBuf],
    supercategory: &str,
) -> (BTreeMap<String, u64>, Vec<CocoCategory>) {
    let mut names: Vec<String> = subcategory_dirs
        .iter()
        .filter_map(|dir| dir.file_name().and_then(|n| n.to_str()))
        .map(str::to_string)
        .collect();
    names.sort();

    let mut name_to_id = BTreeMap::new();
    let mut categories = Vec::new();
    for (idx, name) in names.into_iter().enumerate() {
        let id = (idx + 1) as u64;
        name_to_id.insert(name.clone(), id);
        categories.push(CocoCategory {
            id,
            name,
            supercategory: supercategory.to_string(),
        });
    }
    (name_to_id, categories)
}
