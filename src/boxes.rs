//! Per-image bounding-box CSV reading and image dimension probing.
//!
//! # CSV Format Reference
//!
//! One CSV per image stem under `<subcategory>/csv/<stem>.csv`:
//!
//! ```text
//! #item,x,y,width,height,label
//! 0,10,10,40,30,1
//! ```
//!
//! Coordinates are absolute pixels with `(x, y)` as the top-left corner.
//! `label` defaults to 1 and `#item` to 0 when absent. A malformed row
//! (non-numeric fields, missing columns) is dropped with a warning; it is
//! never fatal to the rest of the file. Boxes with non-positive width or
//! height are discarded.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::PlantcocoError;

/// A single bounding box parsed from a per-image CSV.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Row-level label; overridden by the subcategory mapping when one
    /// is available.
    pub label: u64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// On-disk CSV row shape with documented defaults.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "#item", default)]
    item: u64,

    #[serde(default)]
    x: f64,

    #[serde(default)]
    y: f64,

    #[serde(default)]
    width: f64,

    #[serde(default)]
    height: f64,

    #[serde(default = "default_label")]
    label: u64,
}

fn default_label() -> u64 {
    1
}

/// Reads bounding boxes from a per-image CSV file.
///
/// Returns an empty list when the file does not exist. Malformed rows and
/// zero-extent boxes are dropped, not errors.
pub fn read_box_csv(path: &Path) -> Result<Vec<BoundingBox>, PlantcocoError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(PlantcocoError::Io)?;
    let reader = BufReader::new(file);

    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let mut boxes = Vec::new();
    for result in csv_reader.deserialize::<CsvRow>() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!("Dropping malformed row in {}: {}", path.display(), err);
                continue;
            }
        };

        if row.width <= 0.0 || row.height <= 0.0 {
            continue;
        }

        boxes.push(BoundingBox {
            x: row.x,
            y: row.y,
            width: row.width,
            height: row.height,
            label: row.label,
        });
    }

    Ok(boxes)
}

/// Writes a per-image CSV holding the given boxes, header included.
pub fn write_box_csv(path: &Path, boxes: &[BoundingBox]) -> Result<(), PlantcocoError> {
    let file = File::create(path).map_err(PlantcocoError::Io)?;
    let writer = BufWriter::new(file);

    let mut csv_writer = csv::Writer::from_writer(writer);
    if boxes.is_empty() {
        // Header-only file; serde only emits headers alongside a record.
        csv_writer
            .write_record(["#item", "x", "y", "width", "height", "label"])
            .map_err(|source| PlantcocoError::CsvWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    for (item, bbox) in boxes.iter().enumerate() {
        csv_writer
            .serialize(CsvRow {
                item: item as u64,
                x: bbox.x,
                y: bbox.y,
                width: bbox.width,
                height: bbox.height,
                label: bbox.label,
            })
            .map_err(|source| PlantcocoError::CsvWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }

    csv_writer
        .into_inner()
        .map_err(|e| PlantcocoError::Io(e.into_error()))?
        .flush()
        .map_err(PlantcocoError::Io)?;

    Ok(())
}

/// Probes an image file for its pixel dimensions.
///
/// Returns `None` with a warning when the file cannot be decoded; callers
/// additionally skip zero-dimension images.
pub fn image_dimensions(path: &Path) -> Option<(u32, u32)> {
    match imagesize::size(path) {
        Ok(size) => Some((size.width as u32, size.height as u32)),
        Err(err) => {
            warn!("Cannot read image {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_csv_str(content: &str) -> Vec<BoundingBox> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a001.csv");
        fs::write(&path, content).unwrap();
        read_box_csv(&path).expect("read failed")
    }

    #[test]
    fn missing_file_yields_empty_list() {
        let boxes = read_box_csv(Path::new("/nonexistent/a001.csv")).unwrap();
        assert!(boxes.is_empty());
    }

    #[test]
    fn parses_header_and_rows() {
        let boxes = read_csv_str("#item,x,y,width,height,label\n0,10,10,40,30,1\n1,5,5,20,10,2\n");
        assert_eq!(boxes.len(), 2);
        assert_eq!(
            boxes[0],
            BoundingBox {
                x: 10.0,
                y: 10.0,
                width: 40.0,
                height: 30.0,
                label: 1
            }
        );
        assert_eq!(boxes[1].label, 2);
        assert_eq!(boxes[0].area(), 1200.0);
    }

    #[test]
    fn zero_extent_boxes_are_discarded() {
        let boxes = read_csv_str(
            "#item,x,y,width,height,label\n0,10,10,0,30,1\n1,10,10,40,0,1\n2,1,1,2,2,1\n",
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].width, 2.0);
    }

    #[test]
    fn malformed_rows_are_dropped_not_fatal() {
        let boxes = read_csv_str(
            "#item,x,y,width,height,label\n0,abc,10,40,30,1\n1,10,10,40,30,1\n",
        );
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x, 10.0);
    }

    #[test]
    fn label_defaults_to_one_when_column_absent() {
        let boxes = read_csv_str("#item,x,y,width,height\n0,10,10,40,30\n");
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, 1);
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a001.csv");
        let boxes = vec![BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 80.0,
            label: 2,
        }];
        write_box_csv(&path, &boxes).expect("write failed");

        let restored = read_box_csv(&path).expect("read failed");
        assert_eq!(restored, boxes);
    }

    #[test]
    fn empty_write_emits_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a001.csv");
        write_box_csv(&path, &[]).expect("write failed");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "#item,x,y,width,height,label");
        assert!(read_box_csv(&path).unwrap().is_empty());
    }
}
