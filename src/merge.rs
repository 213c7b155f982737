//! Cross-category merging and split re-partitioning.
//!
//! Combined datasets concatenate per-category outputs into one flat category
//! namespace: each category block receives a strictly increasing global id
//! starting at 1, and every annotation's category reference is rewritten
//! through its source block's old→new map. Image ids are NOT renumbered —
//! assemblies feeding a merge share one [`crate::assemble::AssemblyContext`],
//! which makes them globally unique by construction.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::coco::{CocoAnnotation, CocoCategory, CocoImage};

/// Per-category assembly output destined for a combined merge.
#[derive(Clone, Debug)]
pub struct CategoryOutput {
    /// The category's directory name.
    pub name: String,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

/// The merged cross-category dataset.
#[derive(Clone, Debug, Default)]
pub struct MergedDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

/// How split re-partitioning matches a stem against an image path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMatch {
    /// The stem appears anywhere in the recorded relative path.
    /// Over-matches when one stem is a substring of another.
    #[default]
    Substring,

    /// The stem equals the path's file stem exactly.
    Exact,
}

/// Merges per-category outputs, renumbering category ids into a single
/// global namespace and rewriting annotation references accordingly.
///
/// Outputs are processed in the order given; the originals are consumed, not
/// aliased.
pub fn merge(outputs: Vec<CategoryOutput>) -> MergedDataset {
    let mut merged = MergedDataset::default();
    let mut next_category_id: u64 = 1;

    for output in outputs {
        let mut id_map: HashMap<u64, u64> = HashMap::new();
        for mut category in output.categories {
            let new_id = next_category_id;
            next_category_id += 1;
            id_map.insert(category.id, new_id);
            category.id = new_id;
            merged.categories.push(category);
        }

        for mut ann in output.annotations {
            // Labels outside the block's category list pass through unchanged.
            if let Some(&new_id) = id_map.get(&ann.category_id) {
                ann.category_id = new_id;
            }
            merged.annotations.push(ann);
        }

        merged.images.extend(output.images);
    }

    merged
}

/// Selects the merged images and annotations belonging to one split.
///
/// `split_stems` holds the stem set resolved per source category for the
/// target split. An image is selected when any stem matches its recorded
/// relative path under `mode`; annotations follow their selected image.
pub fn partition_by_split(
    merged: &MergedDataset,
    split_stems: &[std::collections::BTreeSet<String>],
    mode: SplitMatch,
) -> (Vec<CocoImage>, Vec<CocoAnnotation>) {
    let mut images = Vec::new();
    let mut selected_ids: HashSet<u64> = HashSet::new();

    for stems in split_stems {
        for image in &merged.images {
            if selected_ids.contains(&image.id) {
                continue;
            }
            if stems.iter().any(|stem| stem_matches(stem, &image.file_name, mode)) {
                selected_ids.insert(image.id);
                images.push(image.clone());
            }
        }
    }

    let annotations = merged
        .annotations
        .iter()
        .filter(|ann| selected_ids.contains(&ann.image_id))
        .cloned()
        .collect();

    (images, annotations)
}

fn stem_matches(stem: &str, file_name: &str, mode: SplitMatch) -> bool {
    match mode {
        SplitMatch::Substring => file_name.contains(stem),
        SplitMatch::Exact => Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|file_stem| file_stem == stem),
    }
}
