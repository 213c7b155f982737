mod common;

use assert_cmd::Command;

use common::{write_file, write_image};

const LABELMAP: &str = r#"[
    {"object_id": 0, "object_name": "background"},
    {"object_id": 1, "object_name": "healthy"},
    {"object_id": 2, "object_name": "diseased"}
]"#;

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("plantcoco"));
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("plantcoco 0.1.0\n");
}

// Convert subcommand tests

#[test]
fn convert_without_categories_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["convert", "--root"]).arg(dir.path());
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("No categories found"));
}

#[test]
fn convert_writes_instances_files() {
    let dir = tempfile::tempdir().unwrap();
    let apples = dir.path().join("apples");
    write_file(&apples.join("labelmap.json"), LABELMAP);
    write_image(&apples.join("healthy/images/a001.jpg"), 100, 80);
    write_file(
        &apples.join("healthy/csv/a001.csv"),
        "#item,x,y,width,height,label\n0,10,10,40,30,1\n",
    );
    write_file(&apples.join("sets/train.txt"), "a001\n");

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["convert", "--splits", "train", "--root"]).arg(dir.path());
    cmd.assert().success();

    let out_path = dir
        .path()
        .join("annotations")
        .join("apples_instances_train.json");
    assert!(out_path.exists());

    let content = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed["images"][0]["file_name"], "apples/healthy/images/a001.jpg");
    assert_eq!(parsed["annotations"][0]["category_id"], 1);
}

#[test]
fn convert_combined_writes_combined_files() {
    let dir = tempfile::tempdir().unwrap();
    for category in ["apples", "pears"] {
        let root = dir.path().join(category);
        write_file(&root.join("labelmap.json"), LABELMAP);
        write_image(&root.join(format!("healthy/images/{category}_h001.jpg")), 40, 40);
        write_file(&root.join("sets/train.txt"), &format!("{category}_h001\n"));
    }

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["convert", "--combined", "--splits", "train", "--root"])
        .arg(dir.path());
    cmd.assert().success();

    let out_path = dir
        .path()
        .join("annotations")
        .join("combined_instances_train.json");
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(parsed["categories"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["images"].as_array().unwrap().len(), 2);
}

// Distribute subcommand tests

#[test]
fn distribute_routes_split_entries() {
    let dir = tempfile::tempdir().unwrap();
    let apples = dir.path().join("apples");
    std::fs::create_dir_all(apples.join("healthy")).unwrap();
    std::fs::create_dir_all(apples.join("diseased")).unwrap();
    write_file(
        &apples.join("sets/train.txt"),
        "apples_h001\napples_d001\n",
    );

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["distribute", "--root"]).arg(dir.path());
    cmd.assert().success();

    assert!(apples.join("healthy/sets/train.txt").exists());
    assert!(apples.join("diseased/sets/train.txt").exists());
    // Without --prune the source stays.
    assert!(apples.join("sets/train.txt").exists());
}

// Reorganize subcommand tests

#[test]
fn reorganize_builds_canonical_layout() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let leaf = data.path().join("APPLE/HEALTHY");
    write_image(&leaf.join("apple_h001.jpg"), 40, 40);
    write_file(
        &leaf.join("apple_h001.json"),
        r#"{"annotations": [{"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 40, 40], "area": 1600, "iscrowd": 0}]}"#,
    );

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["reorganize", "--data-dir"])
        .arg(data.path())
        .arg("--output-dir")
        .arg(out.path());
    cmd.assert().success();

    assert!(out.path().join("apples/healthy/images/apple_h001.jpg").exists());
    assert!(out.path().join("apples/healthy/csv/apple_h001.csv").exists());
    assert!(out.path().join("apples/labelmap.json").exists());
    assert!(out.path().join("apples/sets/train.txt").exists());
}

// Gen-json subcommand tests

#[test]
fn gen_json_writes_sidecars() {
    let data = tempfile::tempdir().unwrap();
    write_image(&data.path().join("apple/healthy/img001.jpg"), 32, 16);

    let mut cmd = Command::cargo_bin("plantcoco").unwrap();
    cmd.args(["gen-json", "--data-dir"]).arg(data.path());
    cmd.assert().success();

    let sidecar = data.path().join("apple/healthy/img001.json");
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&sidecar).unwrap()).unwrap();
    assert_eq!(parsed["images"][0]["width"], 32);
    assert_eq!(parsed["annotations"][0]["bbox"][2], 32.0);
    assert_eq!(parsed["categories"][0]["supercategory"], "apple");
}
