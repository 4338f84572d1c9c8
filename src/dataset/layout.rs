// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! BIDS directory layout index

use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{DatasetIndex, Entities, FileQuery};
use crate::errors::{TractifyError, TractifyResult};

const DESCRIPTION_FILE: &str = "dataset_description.json";
const ENTITY_PATTERN: &str = r"^([a-zA-Z0-9]+)-([a-zA-Z0-9]+)$";

/// Long names for the entity keys used in file names
fn entity_name(key: &str) -> &str {
    match key {
        "sub" => "subject",
        "ses" => "session",
        "acq" => "acquisition",
        "rec" => "reconstruction",
        "dir" => "direction",
        "desc" => "description",
        other => other,
    }
}

/// Index built by walking `sub-*` directories once
#[derive(Debug)]
pub struct BidsLayout {
    root: PathBuf,
    subjects: Vec<String>,
    files: Vec<(PathBuf, Entities)>,
    entity_pattern: Regex,
}

impl BidsLayout {
    /// Index the dataset at `root`
    ///
    /// With `validate`, the root must exist and hold a
    /// `dataset_description.json`.
    pub fn open(root: impl Into<PathBuf>, validate: bool) -> TractifyResult<Self> {
        let root = root.into();

        if validate {
            if !root.is_dir() {
                return Err(TractifyError::dataset(&root, "Dataset root does not exist"));
            }
            if !root.join(DESCRIPTION_FILE).is_file() {
                return Err(TractifyError::Dataset {
                    root,
                    message: format!("Missing {}", DESCRIPTION_FILE),
                    help: Some("Add the file or pass --skip-bids-validation".into()),
                });
            }
        }

        let entity_pattern =
            Regex::new(ENTITY_PATTERN).map_err(|e| TractifyError::dataset(&root, e.to_string()))?;

        let mut layout = Self {
            root,
            subjects: Vec::new(),
            files: Vec::new(),
            entity_pattern,
        };
        layout.scan()?;

        debug!(
            root = %layout.root.display(),
            subjects = layout.subjects.len(),
            files = layout.files.len(),
            "indexed dataset"
        );
        Ok(layout)
    }

    fn scan(&mut self) -> TractifyResult<()> {
        let escaped = glob::Pattern::escape(&self.root.to_string_lossy());

        for entry in glob::glob(&format!("{}/sub-*", escaped))? {
            let path = entry.map_err(|e| TractifyError::Io {
                message: e.to_string(),
            })?;
            if let Some(label) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("sub-"))
                .filter(|_| path.is_dir())
            {
                self.subjects.push(label.to_string());
            }
        }
        self.subjects.sort();
        self.subjects.dedup();

        for entry in glob::glob(&format!("{}/sub-*/**/*", escaped))? {
            let path = entry.map_err(|e| TractifyError::Io {
                message: e.to_string(),
            })?;
            if path.is_file() {
                let entities = self.parse_entities(&path);
                self.files.push((path, entities));
            }
        }
        self.files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(())
    }

    fn read_json(&self, path: &Path) -> TractifyResult<Map<String, JsonValue>> {
        let content = std::fs::read_to_string(path).map_err(|e| TractifyError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        match serde_json::from_str(&content)? {
            JsonValue::Object(map) => Ok(map),
            _ => Err(TractifyError::dataset(
                &self.root,
                format!("Sidecar {} is not a JSON object", path.display()),
            )),
        }
    }
}

/// Split `name.ext1.ext2` into `("name", Some(".ext1.ext2"))`
fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.find('.') {
        Some(0) | None => (file_name, None),
        Some(i) => (&file_name[..i], Some(&file_name[i..])),
    }
}

impl DatasetIndex for BidsLayout {
    fn root(&self) -> &Path {
        &self.root
    }

    fn subjects(&self) -> Vec<String> {
        self.subjects.clone()
    }

    fn files(&self, query: &FileQuery) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|(_, entities)| query.matches(entities))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn parse_entities(&self, path: &Path) -> Entities {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let (stem, extension) = split_extension(file_name);

        let mut entities = BTreeMap::new();
        let mut suffix = None;
        for part in stem.split('_') {
            match self.entity_pattern.captures(part) {
                Some(caps) => {
                    entities.insert(entity_name(&caps[1]).to_string(), caps[2].to_string());
                }
                None if !part.is_empty() => suffix = Some(part.to_string()),
                None => {}
            }
        }

        Entities {
            entities,
            suffix,
            extension: extension.map(str::to_string),
        }
    }

    /// Dataset-level `<suffix>.json` overlaid by the file's own sidecar
    fn metadata(&self, path: &Path) -> TractifyResult<Map<String, JsonValue>> {
        let mut metadata = Map::new();
        let entities = self.parse_entities(path);

        if let Some(suffix) = &entities.suffix {
            let top_level = self.root.join(format!("{}.json", suffix));
            if top_level.is_file() {
                metadata.extend(self.read_json(&top_level)?);
            }
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let (stem, _) = split_extension(file_name);
        let sidecar = path.with_file_name(format!("{}.json", stem));
        if sidecar.is_file() && sidecar != path {
            metadata.extend(self.read_json(&sidecar)?);
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn dataset() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "dataset_description.json", r#"{"Name": "test", "BIDSVersion": "1.4.0"}"#);
        touch(root, "T1w.json", r#"{"MagneticFieldStrength": 3, "Manufacturer": "Acme"}"#);
        touch(root, "sub-01/ses-01/anat/sub-01_ses-01_T1w.nii.gz", "");
        touch(root, "sub-01/ses-01/anat/sub-01_ses-01_T1w.json", r#"{"Manufacturer": "Siemens"}"#);
        touch(root, "sub-01/ses-02/anat/sub-01_ses-02_T1w.nii", "");
        touch(root, "sub-02/anat/sub-02_T1w.nii.gz", "");
        touch(root, "sub-02/dwi/sub-02_dwi.nii.gz", "");
        touch(root, "participants.tsv", "participant_id\nsub-01\nsub-02\n");
        dir
    }

    #[test]
    fn test_subjects_without_prefix() {
        let dir = dataset();
        let layout = BidsLayout::open(dir.path(), true).unwrap();
        assert_eq!(layout.subjects(), vec!["01", "02"]);
    }

    #[test]
    fn test_file_query() {
        let dir = dataset();
        let layout = BidsLayout::open(dir.path(), true).unwrap();

        let t1 = layout.files(
            &FileQuery::new()
                .subject("01")
                .suffix("T1w")
                .extensions(&[".nii", ".nii.gz"]),
        );
        assert_eq!(t1.len(), 2);
        assert!(t1[0].ends_with("sub-01_ses-01_T1w.nii.gz"));

        let dwi = layout.files(&FileQuery::new().suffix("dwi"));
        assert_eq!(dwi.len(), 1);
    }

    #[test]
    fn test_parse_entities() {
        let dir = dataset();
        let layout = BidsLayout::open(dir.path(), true).unwrap();

        let e = layout.parse_entities(Path::new("sub-01_ses-02_acq-hires_T1w.nii.gz"));
        assert_eq!(e.subject(), Some("01"));
        assert_eq!(e.session(), Some("02"));
        assert_eq!(e.get("acquisition"), Some("hires"));
        assert_eq!(e.suffix.as_deref(), Some("T1w"));
        assert_eq!(e.extension.as_deref(), Some(".nii.gz"));

        let e = layout.parse_entities(Path::new("sub-02_T1w.nii"));
        assert_eq!(e.session(), None);
    }

    #[test]
    fn test_metadata_sidecar_overrides_top_level() {
        let dir = dataset();
        let layout = BidsLayout::open(dir.path(), true).unwrap();

        let t1 = dir.path().join("sub-01/ses-01/anat/sub-01_ses-01_T1w.nii.gz");
        let meta = layout.metadata(&t1).unwrap();
        assert_eq!(meta["Manufacturer"], "Siemens");
        assert_eq!(meta["MagneticFieldStrength"], 3);

        let t1 = dir.path().join("sub-02/anat/sub-02_T1w.nii.gz");
        assert_eq!(layout.metadata(&t1).unwrap()["Manufacturer"], "Acme");
    }

    #[test]
    fn test_validation() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "sub-01/anat/sub-01_T1w.nii.gz", "");

        let err = BidsLayout::open(dir.path(), true).unwrap_err();
        assert!(matches!(err, TractifyError::Dataset { .. }));

        let layout = BidsLayout::open(dir.path(), false).unwrap();
        assert_eq!(layout.subjects(), vec!["01"]);

        let missing = dir.path().join("nope");
        assert!(BidsLayout::open(&missing, true).is_err());
        assert!(BidsLayout::open(&missing, false).unwrap().subjects().is_empty());
    }
}
