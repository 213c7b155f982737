//! Labelmap catalog loading.
//!
//! A `labelmap.json` is an ordered array of label entries. Entry id 0 is
//! reserved for the background class and is excluded from both the name→id
//! mapping and the emitted category list, without halting the parse.
//!
//! Arbitrary key presence in the on-disk format is handled with an explicit
//! schema struct with documented defaults rather than duck-typed access.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coco::CocoCategory;
use crate::error::PlantcocoError;

/// A single entry in `labelmap.json`.
///
/// `object_id` defaults to 0 (background) when absent; `label_id` and
/// `keyboard_shortcut` are carried for round-tripping but not interpreted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(default)]
    pub object_id: i64,

    #[serde(default)]
    pub label_id: i64,

    #[serde(default)]
    pub keyboard_shortcut: String,

    pub object_name: String,
}

/// The loaded label catalog for one category root.
#[derive(Clone, Debug, Default)]
pub struct LabelCatalog {
    /// Subcategory name → category id, background excluded.
    pub name_to_id: BTreeMap<String, u64>,

    /// Category list in labelmap order, background excluded.
    pub categories: Vec<CocoCategory>,
}

/// Loads the catalog from `<category_root>/labelmap.json`.
///
/// Returns `Ok(None)` when the file is absent — the caller then synthesizes
/// categories from the subcategory directories. A present but unparseable
/// labelmap is an error.
///
/// `supercategory` is the owning category's directory name and is recorded
/// on every emitted category entry.
pub fn load(
    category_root: &Path,
    supercategory: &str,
) -> Result<Option<LabelCatalog>, PlantcocoError> {
    let path = category_root.join("labelmap.json");
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(&path).map_err(PlantcocoError::Io)?;
    let reader = BufReader::new(file);

    let entries: Vec<LabelEntry> =
        serde_json::from_reader(reader).map_err(|source| PlantcocoError::LabelmapParse {
            path: path.clone(),
            source,
        })?;

    let mut catalog = LabelCatalog::default();
    for entry in entries {
        // Entries with id <= 0 are background.
        if entry.object_id <= 0 {
            continue;
        }
        let id = entry.object_id as u64;
        catalog.name_to_id.insert(entry.object_name.clone(), id);
        catalog.categories.push(CocoCategory {
            id,
            name: entry.object_name,
            supercategory: supercategory.to_string(),
        });
    }

    Ok(Some(catalog))
}

/// Writes a labelmap for `subcategories` (sorted, ids from 1) plus the
/// background entry, in the on-disk entry shape.
pub fn write(path: &Path, subcategories: &[String]) -> Result<(), PlantcocoError> {
    let mut entries = vec![LabelEntry {
        object_id: 0,
        label_id: 0,
        keyboard_shortcut: "0".to_string(),
        object_name: "background".to_string(),
    }];

    let mut sorted: Vec<&String> = subcategories.iter().collect();
    sorted.sort();
    for (idx, name) in sorted.into_iter().enumerate() {
        let id = (idx + 1) as i64;
        entries.push(LabelEntry {
            object_id: id,
            label_id: id,
            keyboard_shortcut: id.to_string(),
            object_name: name.clone(),
        });
    }

    let file = File::create(path).map_err(PlantcocoError::Io)?;
    serde_json::to_writer_pretty(file, &entries).map_err(|source| PlantcocoError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_labelmap(dir: &Path, json: &str) {
        fs::write(dir.join("labelmap.json"), json).expect("write labelmap");
    }

    #[test]
    fn absent_labelmap_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load(dir.path(), "apples").expect("load failed");
        assert!(catalog.is_none());
    }

    #[test]
    fn background_entry_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write_labelmap(
            dir.path(),
            r#"[
                {"object_id": 0, "object_name": "background"},
                {"object_id": 1, "object_name": "healthy"},
                {"object_id": 2, "object_name": "diseased"}
            ]"#,
        );

        let catalog = load(dir.path(), "apples")
            .expect("load failed")
            .expect("labelmap present");

        assert_eq!(catalog.name_to_id.len(), 2);
        assert_eq!(catalog.name_to_id.get("healthy"), Some(&1));
        assert_eq!(catalog.name_to_id.get("diseased"), Some(&2));
        assert!(!catalog.name_to_id.contains_key("background"));

        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.categories[0].name, "healthy");
        assert_eq!(catalog.categories[0].supercategory, "apples");
    }

    #[test]
    fn missing_object_id_defaults_to_background() {
        let dir = tempfile::tempdir().unwrap();
        write_labelmap(
            dir.path(),
            r#"[
                {"object_name": "mystery"},
                {"object_id": 1, "object_name": "healthy"}
            ]"#,
        );

        let catalog = load(dir.path(), "apples").unwrap().unwrap();
        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.categories[0].name, "healthy");
    }

    #[test]
    fn malformed_labelmap_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_labelmap(dir.path(), "{not json");

        let err = load(dir.path(), "apples").unwrap_err();
        assert!(matches!(err, PlantcocoError::LabelmapParse { .. }));
    }

    #[test]
    fn write_emits_background_and_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labelmap.json");
        write(
            &path,
            &["healthy".to_string(), "diseased".to_string()],
        )
        .expect("write failed");

        let entries: Vec<LabelEntry> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].object_name, "background");
        assert_eq!(entries[0].object_id, 0);
        assert_eq!(entries[1].object_name, "diseased");
        assert_eq!(entries[1].object_id, 1);
        assert_eq!(entries[2].object_name, "healthy");
        assert_eq!(entries[2].object_id, 2);
    }
}
