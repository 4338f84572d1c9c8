// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 tractify contributors

//! Participant selection

use std::collections::BTreeSet;
use tracing::warn;

use super::DatasetIndex;
use crate::errors::{TractifyError, TractifyResult};

/// `sub-02` and `02` name the same participant
pub fn strip_subject_prefix(label: &str) -> &str {
    label.strip_prefix("sub-").unwrap_or(label)
}

/// Participants confirmed present, plus requested labels that were not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantSelection {
    /// Sorted, de-duplicated
    pub participants: Vec<String>,
    /// Requested but absent (lenient resolution only), sorted
    pub missing: Vec<String>,
}

/// Resolves requested participant labels against a dataset
pub struct ParticipantResolver;

impl ParticipantResolver {
    /// Confirm `requested` labels against the subjects in `index`
    ///
    /// No labels selects every subject. Under `strict`, any missing label is
    /// an error; otherwise missing labels are logged and returned in
    /// [`ParticipantSelection::missing`].
    pub fn resolve<S: AsRef<str>>(
        index: &dyn DatasetIndex,
        requested: &[S],
        strict: bool,
    ) -> TractifyResult<ParticipantSelection> {
        let available: BTreeSet<String> = index.subjects().into_iter().collect();

        if available.is_empty() {
            return Err(TractifyError::Dataset {
                root: index.root().to_path_buf(),
                message: "Could not find participants".into(),
                help: Some(
                    "Make sure the BIDS data structure is present and correct; \
                     datasets can be checked with the BIDS Validator"
                        .into(),
                ),
            });
        }

        if requested.is_empty() {
            return Ok(ParticipantSelection {
                participants: available.into_iter().collect(),
                missing: Vec::new(),
            });
        }

        let requested: BTreeSet<String> = requested
            .iter()
            .map(|label| strip_subject_prefix(label.as_ref()).to_string())
            .collect();

        let found: Vec<String> = requested.intersection(&available).cloned().collect();
        if found.is_empty() {
            return Err(TractifyError::dataset(
                index.root(),
                format!(
                    "Could not find participants [{}]",
                    requested.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            ));
        }

        let missing: Vec<String> = requested.difference(&available).cloned().collect();
        if !missing.is_empty() {
            let message = format!("Some participants were not found: {}", missing.join(", "));
            if strict {
                return Err(TractifyError::dataset(index.root(), message));
            }
            warn!(root = %index.root().display(), "{}", message);
        }

        Ok(ParticipantSelection {
            participants: found,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Entities, FileQuery};
    use serde_json::{Map, Value as JsonValue};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    struct FixedIndex(Vec<&'static str>);

    impl DatasetIndex for FixedIndex {
        fn root(&self) -> &Path {
            Path::new("/data/bids")
        }

        fn subjects(&self) -> Vec<String> {
            self.0.iter().map(|s| s.to_string()).collect()
        }

        fn files(&self, _query: &FileQuery) -> Vec<PathBuf> {
            Vec::new()
        }

        fn parse_entities(&self, _path: &Path) -> Entities {
            Entities::default()
        }

        fn metadata(&self, _path: &Path) -> TractifyResult<Map<String, JsonValue>> {
            Ok(Map::new())
        }
    }

    const NONE: &[&str] = &[];

    #[test]
    fn test_all_participants_sorted() {
        let index = FixedIndex(vec!["03", "01", "02"]);
        let selection = ParticipantResolver::resolve(&index, NONE, false).unwrap();
        assert_eq!(selection.participants, vec!["01", "02", "03"]);
        assert!(selection.missing.is_empty());
    }

    #[test]
    fn test_lenient_drops_missing() {
        let index = FixedIndex(vec!["01", "02", "03"]);
        let selection = ParticipantResolver::resolve(&index, &["sub-02", "sub-04"], false).unwrap();
        assert_eq!(selection.participants, vec!["02"]);
        assert_eq!(selection.missing, vec!["04"]);
    }

    /// Log sink shared between the test and its subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_lenient_warns_about_missing() {
        let index = FixedIndex(vec!["01", "02", "03"]);
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let selection = tracing::subscriber::with_default(subscriber, || {
            ParticipantResolver::resolve(&index, &["sub-02", "sub-04", "05"], false)
        })
        .unwrap();
        assert_eq!(selection.missing, vec!["04", "05"]);

        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("Some participants were not found: 04, 05"));
        assert!(output.contains("/data/bids"));
    }

    #[test]
    fn test_complete_selection_is_silent() {
        let index = FixedIndex(vec!["01", "02"]);
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ParticipantResolver::resolve(&index, &["01", "sub-02"], false)
        })
        .unwrap();
        assert!(!logs.contents().contains("WARN"));
    }

    #[test]
    fn test_strict_fails_on_missing() {
        let index = FixedIndex(vec!["01", "02", "03"]);
        let err = ParticipantResolver::resolve(&index, &["sub-02", "sub-04"], true).unwrap_err();
        assert!(matches!(err, TractifyError::Dataset { .. }));
        assert!(err.to_string().contains("04"));
    }

    #[test]
    fn test_prefix_and_duplicates() {
        let index = FixedIndex(vec!["01", "02", "03"]);
        let selection =
            ParticipantResolver::resolve(&index, &["03", "sub-01", "01", "sub-03"], true).unwrap();
        assert_eq!(selection.participants, vec!["01", "03"]);
    }

    #[test]
    fn test_empty_dataset_and_no_match() {
        let empty = FixedIndex(vec![]);
        assert!(matches!(
            ParticipantResolver::resolve(&empty, NONE, false),
            Err(TractifyError::Dataset { .. })
        ));

        let index = FixedIndex(vec!["01"]);
        assert!(matches!(
            ParticipantResolver::resolve(&index, &["07"], false),
            Err(TractifyError::Dataset { .. })
        ));
    }
}
