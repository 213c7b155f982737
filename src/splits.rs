//! Split list resolution.
//!
//! A split is a newline-delimited list of image stems under
//! `<category>/sets/<split>.txt`. A missing split file is not an error: the
//! documented fallback enumerates every image under the category's
//! subcategory directories instead.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::PlantcocoError;

/// Image extensions recognized when enumerating images, matched
/// case-insensitively against the file extension.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Split files recognized by the distributor, in processing order.
pub const KNOWN_SPLIT_FILES: [&str; 5] = [
    "train.txt",
    "val.txt",
    "test.txt",
    "all.txt",
    "train_val.txt",
];

/// Reads stems from a split file: trimmed, non-empty lines.
///
/// Returns an empty list when the file does not exist.
pub fn read_split_list(path: &Path) -> Result<Vec<String>, PlantcocoError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(PlantcocoError::Io)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Resolves the stem set for `split_name` under `category_root`.
///
/// When `sets/<split_name>.txt` is missing or empty, falls back to the union
/// of the stems of every image found under each subcategory's `images/`
/// directory (`sets` excluded).
pub fn resolve(category_root: &Path, split_name: &str) -> Result<BTreeSet<String>, PlantcocoError> {
    let split_file = category_root.join("sets").join(format!("{split_name}.txt"));
    let stems: BTreeSet<String> = read_split_list(&split_file)?.into_iter().collect();
    if !stems.is_empty() {
        return Ok(stems);
    }

    let mut all_stems = BTreeSet::new();
    for subcategory_dir in subcategory_dirs(category_root)? {
        let images_dir = subcategory_dir.join("images");
        if !images_dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&images_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if is_image_file(path) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    all_stems.insert(stem.to_string());
                }
            }
        }
    }

    Ok(all_stems)
}

/// Subcategory directories of a category root, lexicographically sorted so
/// the first-match probe order is deterministic. `sets` is excluded.
pub fn subcategory_dirs(category_root: &Path) -> Result<Vec<std::path::PathBuf>, PlantcocoError> {
    let mut dirs = Vec::new();
    if !category_root.is_dir() {
        return Ok(dirs);
    }
    for entry in fs::read_dir(category_root).map_err(PlantcocoError::Io)? {
        let path = entry.map_err(PlantcocoError::Io)?.path();
        if path.is_dir() && path.file_name().is_some_and(|n| n != "sets") {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn is_image_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn split_file_lines_are_trimmed_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let sets = dir.path().join("sets");
        fs::create_dir_all(&sets).unwrap();
        fs::write(sets.join("train.txt"), "a001\n  a002  \n\n\na003\n").unwrap();

        let stems = resolve(dir.path(), "train").expect("resolve failed");
        let expected: BTreeSet<String> =
            ["a001", "a002", "a003"].iter().map(|s| s.to_string()).collect();
        assert_eq!(stems, expected);
    }

    #[test]
    fn missing_split_falls_back_to_image_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        for (subcat, name) in [
            ("healthy", "apple_h001.jpg"),
            ("healthy", "apple_h002.PNG"),
            ("diseased", "apple_d001.JPEG"),
        ] {
            let images = dir.path().join(subcat).join("images");
            fs::create_dir_all(&images).unwrap();
            fs::write(images.join(name), b"").unwrap();
        }
        // Non-image files and the sets directory are ignored.
        fs::write(
            dir.path().join("healthy").join("images").join("notes.txt"),
            b"",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("sets")).unwrap();

        let stems = resolve(dir.path(), "train").expect("resolve failed");
        let expected: BTreeSet<String> = ["apple_h001", "apple_h002", "apple_d001"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(stems, expected);
    }

    #[test]
    fn subcategory_dirs_sorted_and_sets_excluded() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["healthy", "diseased", "sets"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("labelmap.json"), "[]").unwrap();

        let dirs = subcategory_dirs(dir.path()).expect("enumeration failed");
        let names: Vec<_> = dirs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["diseased", "healthy"]);
    }
}
