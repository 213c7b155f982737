//! Split list distribution into subcategory directories.
//!
//! Category-level `sets/` files list stems across subcategories. This pass
//! routes each stem to its subcategory by filename-prefix heuristic
//! (`apple_d001` → diseased, `apple_h001` → healthy) and writes
//! per-subcategory `sets/` files. Stems that cannot be classified are
//! reported and left out; removing the category-level `sets/` directory
//! afterwards is opt-in.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::error::PlantcocoError;
use crate::splits::{self, KNOWN_SPLIT_FILES};

/// Directories under the root that are never treated as categories.
const NON_CATEGORY_DIRS: [&str; 3] = ["annotations", "data", "scripts"];

/// Distributes every category's `sets/` files into its subcategories.
///
/// Categories are directories under `root` that carry a `sets/` directory.
/// With `prune`, the category-level `sets/` directory is removed after
/// distribution.
pub fn run_distribute(root: &Path, prune: bool) -> Result<(), PlantcocoError> {
    let mut handled = 0;
    for entry in fs::read_dir(root).map_err(PlantcocoError::Io)? {
        let path = entry.map_err(PlantcocoError::Io)?.path();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if !path.is_dir() || NON_CATEGORY_DIRS.contains(&name.as_str()) {
            continue;
        }
        if !path.join("sets").is_dir() {
            continue;
        }

        distribute_category(&path, &name, prune)?;
        handled += 1;
    }

    if handled == 0 {
        warn!("No categories with a sets directory under {}", root.display());
    }
    Ok(())
}

/// Distributes one category's split files.
pub fn distribute_category(
    category_root: &Path,
    category: &str,
    prune: bool,
) -> Result<(), PlantcocoError> {
    let sets_dir = category_root.join("sets");
    let subcategories: Vec<String> = splits::subcategory_dirs(category_root)?
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .map(str::to_string)
        .collect();
    if subcategories.is_empty() {
        warn!("{category} has no subcategory directories");
        return Ok(());
    }

    for set_file in KNOWN_SPLIT_FILES {
        let source = sets_dir.join(set_file);
        let stems = splits::read_split_list(&source)?;
        if stems.is_empty() {
            continue;
        }

        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut unknown = Vec::new();
        for stem in stems {
            match subcategory_for_stem(&stem, category) {
                Some(subcat) if subcategories.iter().any(|s| s == subcat) => {
                    grouped.entry(subcat).or_default().push(stem);
                }
                _ => unknown.push(stem),
            }
        }

        for (subcat, mut entries) in grouped {
            entries.sort();
            let target_dir = category_root.join(subcat).join("sets");
            fs::create_dir_all(&target_dir).map_err(PlantcocoError::Io)?;

            let mut content = entries.join("\n");
            content.push('\n');
            fs::write(target_dir.join(set_file), content).map_err(PlantcocoError::Io)?;
            info!("{category}/{subcat}: {} entries in {set_file}", entries.len());
        }

        if !unknown.is_empty() {
            warn!(
                "{category}/{set_file}: {} entries could not be classified: {:?}",
                unknown.len(),
                &unknown[..unknown.len().min(5)]
            );
        }
    }

    if prune {
        info!("Removing {}", sets_dir.display());
        fs::remove_dir_all(&sets_dir).map_err(PlantcocoError::Io)?;
    }
    Ok(())
}

/// Classifies a stem by the letter following the `<category>_` prefix:
/// `d` → diseased, `h` → healthy, anything else is unclassified.
fn subcategory_for_stem(stem: &str, category: &str) -> Option<&'static str> {
    let name = stem
        .strip_prefix(&format!("{category}_"))
        .unwrap_or(stem);
    if name.starts_with('d') {
        Some("diseased")
    } else if name.starts_with('h') {
        Some("healthy")
    } else {
        None
    }
}
