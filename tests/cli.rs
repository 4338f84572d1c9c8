// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PREPROC_FILES: &[&str] = &[
    "eddy_corrected.nii.gz",
    "eddy_corrected.eddy_rotated_bvecs",
    "dwi.bval",
    "eddy_corrected_avg_b0.nii.gz",
    "eddy_corrected_roi_mask.nii.gz",
];

/// Command isolated from the user's settings and environment
fn tractify(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tractify").unwrap();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("TRACTIFY_GEN5TT_ALGO")
        .env_remove("TRACTIFY_NUM_TRACTS")
        .env_remove("TRACTIFY_SETTINGS")
        .env_remove("TRACTIFY_FREESURFER_DIR");
    cmd
}

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "").unwrap();
}

fn build_args(dir: &Path) -> Vec<String> {
    [
        "T1w.nii.gz",
        "eddy.nii.gz",
        "dwi.bvec",
        "dwi.bval",
        "template.nii.gz",
        "atlas.nii.gz",
        "out",
    ]
    .iter()
    .map(|f| dir.join(f).display().to_string())
    .collect()
}

/// sub-01 with preprocessing, sub-02 without
fn dataset(dir: &Path) {
    touch(&dir.join("bids/dataset_description.json"));
    touch(&dir.join("bids/sub-01/anat/sub-01_T1w.nii.gz"));
    touch(&dir.join("bids/sub-02/anat/sub-02_T1w.nii.gz"));
    for f in PREPROC_FILES {
        touch(&dir.join("prep/sub-01/ses-01/dwi").join(f));
    }
}

#[test]
fn test_build_dry_run() {
    let dir = TempDir::new().unwrap();
    tractify(dir.path())
        .arg("build")
        .args(build_args(dir.path()))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("sub_001_ses_01_tract_wf"))
        .stdout(predicate::str::contains("Dry run"));

    assert!(!dir.path().join("out/scratch").exists());
}

#[test]
fn test_build_writes_graph_files() {
    let dir = TempDir::new().unwrap();
    tractify(dir.path())
        .arg("build")
        .args(build_args(dir.path()))
        .args(["--participant-label", "sub-07"])
        .assert()
        .success();

    let graph_dir = dir.path().join("out/scratch/sub_07_ses_01_tract_wf");
    let json = std::fs::read_to_string(graph_dir.join("graph.json")).unwrap();
    assert!(json.contains("\"name\": \"sub_07_ses_01_tract_wf\""));
    assert!(graph_dir.join("graph.dot").is_file());
}

#[test]
fn test_unknown_algorithm_fails() {
    let dir = TempDir::new().unwrap();
    tractify(dir.path())
        .arg("build")
        .args(build_args(dir.path()))
        .args(["--gen5tt-algo", "pet_scan", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pet_scan"));
}

#[test]
fn test_freesurfer_requires_segmentation_file() {
    let dir = TempDir::new().unwrap();
    tractify(dir.path())
        .arg("build")
        .args(build_args(dir.path()))
        .args(["--gen5tt-algo", "freesurfer", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fs-file"));
}

#[test]
fn test_graph_mermaid() {
    let dir = TempDir::new().unwrap();
    tractify(dir.path())
        .arg("graph")
        .args(build_args(dir.path()))
        .args(["--format", "mermaid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("tckgen"));
}

#[test]
fn test_participants_lists_subjects() {
    let dir = TempDir::new().unwrap();
    dataset(dir.path());
    tractify(dir.path())
        .arg("participants")
        .arg(dir.path().join("bids"))
        .assert()
        .success()
        .stdout(predicate::str::contains("sub-01"))
        .stdout(predicate::str::contains("sub-02"));
}

#[test]
fn test_participants_strict_missing_label() {
    let dir = TempDir::new().unwrap();
    dataset(dir.path());
    tractify(dir.path())
        .arg("participants")
        .arg(dir.path().join("bids"))
        .args(["--participant-label", "01", "--participant-label", "sub-09", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("09"));
}

#[test]
fn test_participants_requires_description() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("bids/sub-01/anat/sub-01_T1w.nii.gz"));

    tractify(dir.path())
        .arg("participants")
        .arg(dir.path().join("bids"))
        .assert()
        .failure();

    tractify(dir.path())
        .arg("participants")
        .arg(dir.path().join("bids"))
        .arg("--skip-bids-validation")
        .assert()
        .success()
        .stdout(predicate::str::contains("sub-01"));
}

#[test]
fn test_batch_reports_skipped_session() {
    let dir = TempDir::new().unwrap();
    dataset(dir.path());
    let root = dir.path();

    tractify(root)
        .arg("batch")
        .arg(root.join("bids"))
        .arg(root.join("prep"))
        .arg(root.join("template.nii.gz"))
        .arg(root.join("atlas.nii.gz"))
        .arg(root.join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped sessions"))
        .stdout(predicate::str::contains("sub-02 ses-01"));

    let json = std::fs::read_to_string(root.join("out/scratch/tractify_wf/graph.json")).unwrap();
    assert!(json.contains("single_subject_01_wf"));
    assert!(!json.contains("single_subject_02_wf"));
}

#[test]
fn test_gradients_full_sphere() {
    let dir = TempDir::new().unwrap();
    let bvec = dir.path().join("dwi.bvec");
    let bval = dir.path().join("dwi.bval");
    std::fs::write(&bvec, "0 1 -1 0 0 0 0\n0 0 0 1 -1 0 0\n0 0 0 0 0 1 -1\n").unwrap();
    std::fs::write(&bval, "0 1000 1000 1000 1000 1000 1000\n").unwrap();

    tractify(dir.path())
        .arg("gradients")
        .arg(&bvec)
        .arg(&bval)
        .assert()
        .success()
        .stdout(predicate::str::contains("full sphere"));
}

#[test]
fn test_gradients_hemispherical_json() {
    let dir = TempDir::new().unwrap();
    let bvec = dir.path().join("dwi.bvec");
    let bval = dir.path().join("dwi.bval");
    std::fs::write(&bvec, "0 1 0.6 0.6\n0 0 0.8 0\n0 0 0 0.8\n").unwrap();
    std::fs::write(&bval, "0 1000 1000 1000\n").unwrap();

    tractify(dir.path())
        .arg("gradients")
        .arg(&bvec)
        .arg(&bval)
        .args(["--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_hemispherical\": true"))
        .stdout(predicate::str::contains("\"b0_volumes\": 1"));
}

#[test]
fn test_gradients_mismatched_columns() {
    let dir = TempDir::new().unwrap();
    let bvec = dir.path().join("dwi.bvec");
    let bval = dir.path().join("dwi.bval");
    std::fs::write(&bvec, "0 1\n0 0\n0 0\n").unwrap();
    std::fs::write(&bval, "0 1000 1000\n").unwrap();

    tractify(dir.path())
        .arg("gradients")
        .arg(&bvec)
        .arg(&bval)
        .assert()
        .failure();
}
