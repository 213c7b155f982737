//! COCO instances schema types and writer.
//!
//! This module defines the exact document shape emitted for the PlantaeK
//! dataset and serializes it with 2-space indentation. Field order within
//! each record is fixed by struct declaration order so the output stays
//! stable across runs.
//!
//! # COCO Format Reference
//!
//! COCO bounding boxes use `[x, y, width, height]` format where `(x, y)` is
//! the top-left corner in absolute pixel coordinates. Upstream components
//! guarantee referential integrity (every `image_id` and `category_id`
//! resolves within the same document); the writer performs no validation of
//! its own.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlantcocoError;

/// Year recorded in the `info` block of every emitted document.
pub const DATASET_YEAR: u32 = 2019;

/// Version recorded in the `info` block of every emitted document.
pub const DATASET_VERSION: &str = "1.0.0";

/// Upstream source of the PlantaeK dataset.
pub const DATASET_URL: &str = "https://data.mendeley.com/datasets/t6j2h22jpx/1";

/// Top-level COCO document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoDocument {
    pub info: CocoInfo,
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
    /// Always empty for this dataset.
    pub licenses: Vec<CocoLicense>,
}

/// COCO dataset info block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoInfo {
    pub year: u32,
    pub version: String,
    pub description: String,
    pub url: String,
}

/// COCO image entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

/// COCO annotation entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner.
    pub bbox: [f64; 4],

    pub area: f64,

    /// Always 0 in this domain (no crowd annotations).
    pub iscrowd: u8,
}

/// COCO category entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,

    /// The owning category's directory name (e.g. "apples").
    pub supercategory: String,
}

/// COCO license entry. Present for schema completeness; the licenses list
/// is always empty in emitted documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoLicense {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Wraps assembled records into a complete document with the fixed PlantaeK
/// metadata block and the caller-supplied description.
pub fn build_document(
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
    description: &str,
) -> CocoDocument {
    CocoDocument {
        info: CocoInfo {
            year: DATASET_YEAR,
            version: DATASET_VERSION.to_string(),
            description: description.to_string(),
            url: DATASET_URL.to_string(),
        },
        images,
        annotations,
        categories,
        licenses: vec![],
    }
}

/// Writes a document to `path` as 2-space-indented JSON.
///
/// # Errors
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_coco_json(path: &Path, document: &CocoDocument) -> Result<(), PlantcocoError> {
    let file = File::create(path).map_err(PlantcocoError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, document).map_err(|source| PlantcocoError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes a document to a JSON string.
///
/// Useful for testing without file I/O.
pub fn to_coco_string(document: &CocoDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}
