// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Imaging dataset access
//!
//! A read-only index over a BIDS directory tree, participant selection
//! against it, and lookup of the dmripreproc outputs tractography starts
//! from.

mod layout;
mod participants;
mod preproc;

pub use layout::BidsLayout;
pub use participants::{strip_subject_prefix, ParticipantResolver, ParticipantSelection};
pub use preproc::DmriPreprocOutputs;

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::TractifyResult;

/// Entities parsed from a BIDS file name
///
/// `sub-01_ses-02_T1w.nii.gz` has entities `subject=01`, `session=02`,
/// suffix `T1w` and extension `.nii.gz`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entities {
    pub entities: BTreeMap<String, String>,
    pub suffix: Option<String>,
    pub extension: Option<String>,
}

impl Entities {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entities.get(key).map(String::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("subject")
    }

    pub fn session(&self) -> Option<&str> {
        self.get("session")
    }
}

/// Filter for [`DatasetIndex::files`]
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub subject: Option<String>,
    pub session: Option<String>,
    pub suffix: Option<String>,
    /// Accepted extensions including the leading dot; empty accepts any
    pub extensions: Vec<String>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    /// Whether a file with these entities satisfies the query
    pub fn matches(&self, entities: &Entities) -> bool {
        let field = |want: &Option<String>, have: Option<&str>| match want {
            Some(w) => have == Some(w.as_str()),
            None => true,
        };

        field(&self.subject, entities.subject())
            && field(&self.session, entities.session())
            && field(&self.suffix, entities.suffix.as_deref())
            && (self.extensions.is_empty()
                || entities
                    .extension
                    .as_deref()
                    .is_some_and(|ext| self.extensions.iter().any(|e| e == ext)))
    }
}

/// Queryable, read-only index over a structured imaging dataset
pub trait DatasetIndex: Send + Sync {
    /// Dataset root directory
    fn root(&self) -> &Path;

    /// Subject labels without the `sub-` prefix, sorted
    fn subjects(&self) -> Vec<String>;

    /// Files matching `query`, sorted by path
    fn files(&self, query: &FileQuery) -> Vec<PathBuf>;

    /// Entities of a file name
    fn parse_entities(&self, path: &Path) -> Entities;

    /// Sidecar metadata for a file
    fn metadata(&self, path: &Path) -> TractifyResult<Map<String, JsonValue>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t1_entities() -> Entities {
        Entities {
            entities: BTreeMap::from([
                ("subject".to_string(), "01".to_string()),
                ("session".to_string(), "02".to_string()),
            ]),
            suffix: Some("T1w".into()),
            extension: Some(".nii.gz".into()),
        }
    }

    #[test]
    fn test_query_matching() {
        let e = t1_entities();

        assert!(FileQuery::new().matches(&e));
        assert!(FileQuery::new()
            .subject("01")
            .suffix("T1w")
            .extensions(&[".nii", ".nii.gz"])
            .matches(&e));
        assert!(!FileQuery::new().subject("02").matches(&e));
        assert!(!FileQuery::new().extensions(&[".nii"]).matches(&e));
        assert!(!FileQuery::new().session("01").matches(&e));
    }
}
