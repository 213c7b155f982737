//! Conversion orchestration: categories × splits → COCO JSON files.
//!
//! Per-category mode writes one `<category>_instances_<split>.json` per
//! (category, split) pair, each with ids starting at 1. Combined mode
//! assembles every category with a shared id context, merges the outputs
//! into one flat category namespace and re-partitions the result per split
//! into `combined_instances_<split>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::assemble::{assemble_category, AssemblyContext};
use crate::coco;
use crate::error::PlantcocoError;
use crate::merge::{self, CategoryOutput, SplitMatch};
use crate::splits;

/// Options for one conversion run.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Dataset root containing the category directories.
    pub root: PathBuf,

    /// Output directory; defaults to `<root>/annotations` when `None`.
    pub out: Option<PathBuf>,

    /// Categories to convert; all categories with a labelmap when `None`.
    pub categories: Option<Vec<String>>,

    /// Splits to generate.
    pub splits: Vec<String>,

    /// Merge all categories into combined per-split documents.
    pub combined: bool,

    /// Stem matching mode for combined re-partitioning.
    pub split_match: SplitMatch,
}

/// Runs a full conversion.
///
/// # Errors
/// Fails when no category is resolvable (the only fatal condition), on a
/// malformed labelmap, or on output write failures. Missing category
/// directories are skipped with a warning.
pub fn run_convert(opts: &ConvertOptions) -> Result<(), PlantcocoError> {
    let out_dir = opts
        .out
        .clone()
        .unwrap_or_else(|| opts.root.join("annotations"));

    let categories = match &opts.categories {
        Some(names) => names.clone(),
        None => discover_categories(&opts.root)?,
    };
    if categories.is_empty() {
        return Err(PlantcocoError::NoCategories {
            root: opts.root.clone(),
        });
    }

    fs::create_dir_all(&out_dir).map_err(PlantcocoError::Io)?;

    if opts.combined {
        convert_combined(opts, &categories, &out_dir)
    } else {
        convert_per_category(opts, &categories, &out_dir)
    }
}

/// Categories are directories under the root that carry a labelmap.
fn discover_categories(root: &Path) -> Result<Vec<String>, PlantcocoError> {
    let mut names = Vec::new();
    if !root.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(root).map_err(PlantcocoError::Io)? {
        let path = entry.map_err(PlantcocoError::Io)?.path();
        if path.is_dir() && path.join("labelmap.json").exists() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn convert_per_category(
    opts: &ConvertOptions,
    categories: &[String],
    out_dir: &Path,
) -> Result<(), PlantcocoError> {
    for category in categories {
        let category_root = opts.root.join(category);
        if !category_root.is_dir() {
            warn!(
                "Category directory {} does not exist, skipping",
                category_root.display()
            );
            continue;
        }

        for split in &opts.splits {
            let mut ctx = AssemblyContext::new();
            let batch = assemble_category(&category_root, split, &mut ctx)?;

            let description = format!("PlantaeK {category} {split} split");
            let document = coco::build_document(
                batch.images,
                batch.annotations,
                batch.categories,
                &description,
            );
            let out_path = out_dir.join(format!("{category}_instances_{split}.json"));
            coco::write_coco_json(&out_path, &document)?;
            info!(
                "Generated: {} ({} images, {} annotations)",
                out_path.display(),
                document.images.len(),
                document.annotations.len()
            );
        }
    }

    Ok(())
}

fn convert_combined(
    opts: &ConvertOptions,
    categories: &[String],
    out_dir: &Path,
) -> Result<(), PlantcocoError> {
    // One shared context across every assembly keeps image and annotation
    // ids globally unique, which the merge relies on.
    let mut ctx = AssemblyContext::new();
    let mut outputs: Vec<CategoryOutput> = Vec::new();
    let mut present_categories: Vec<String> = Vec::new();

    for category in categories {
        let category_root = opts.root.join(category);
        if !category_root.is_dir() {
            warn!(
                "Category directory {} does not exist, skipping",
                category_root.display()
            );
            continue;
        }
        present_categories.push(category.clone());

        let mut output = CategoryOutput {
            name: category.clone(),
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Vec::new(),
        };
        for split in &opts.splits {
            let batch = assemble_category(&category_root, split, &mut ctx)?;
            // The category list comes from the labelmap, not the stems, so
            // one copy per category is enough.
            if output.categories.is_empty() {
                output.categories = batch.categories;
            }
            output.images.extend(batch.images);
            output.annotations.extend(batch.annotations);
        }
        outputs.push(output);
    }

    let merged = merge::merge(outputs);

    for split in &opts.splits {
        let mut split_stems = Vec::with_capacity(present_categories.len());
        for category in &present_categories {
            split_stems.push(splits::resolve(&opts.root.join(category), split)?);
        }

        let (images, annotations) =
            merge::partition_by_split(&merged, &split_stems, opts.split_match);

        let description = format!("PlantaeK combined {split} split");
        let document =
            coco::build_document(images, annotations, merged.categories.clone(), &description);
        let out_path = out_dir.join(format!("combined_instances_{split}.json"));
        coco::write_coco_json(&out_path, &document)?;
        info!(
            "Generated: {} ({} images, {} annotations)",
            out_path.display(),
            document.images.len(),
            document.annotations.len()
        );
    }

    Ok(())
}
