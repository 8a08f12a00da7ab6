//! Input specifier parsing and classification.

use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Classification of an input specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    /// Raw XTC files or datasets.
    Xtc,
    /// Translated HDF5 files.
    Hdf5,
    /// Live shared-memory feed.
    Shmem,
    /// Indexed (random-access) datasets.
    Idx,
    /// Small-data companion datasets.
    Smd,
}

impl InputClass {
    /// Whether the master/worker layout applies to this class.
    #[must_use]
    pub fn supports_parallel(&self) -> bool {
        matches!(self, Self::Xtc | Self::Shmem)
    }
}

impl std::fmt::Display for InputClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Xtc => "xtc",
            Self::Hdf5 => "h5",
            Self::Shmem => "shmem",
            Self::Idx => "idx",
            Self::Smd => "smd",
        };
        f.write_str(name)
    }
}

/// One parsed input specifier: a file path or a dataset URI.
///
/// A specifier containing `=` is a dataset URI of colon-separated
/// `key[=value]` options (`exp=xpp12311:run=45:idx`); anything else is a
/// file path classified by extension.
#[derive(Debug, Clone)]
pub struct Dataset {
    raw: String,
    options: Option<HashMap<String, String>>,
}

impl Dataset {
    /// Parses a specifier; never fails — unknown forms classify as `None`.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let options = spec.contains('=').then(|| {
            spec.split(':')
                .map(|part| match part.split_once('=') {
                    Some((key, value)) => (key.to_owned(), value.to_owned()),
                    None => (part.to_owned(), String::new()),
                })
                .collect()
        });
        Self {
            raw: spec.to_owned(),
            options,
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns `true` for dataset URIs, `false` for plain paths.
    #[must_use]
    pub fn is_uri(&self) -> bool {
        self.options.is_some()
    }

    /// Value of a URI option, empty string for bare flags.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.as_ref()?.get(key).map(String::as_str)
    }

    /// Classification of this single specifier, `None` when undecidable.
    #[must_use]
    pub fn class(&self) -> Option<InputClass> {
        match &self.options {
            Some(options) => {
                if options.contains_key("shmem") {
                    Some(InputClass::Shmem)
                } else if options.contains_key("h5") {
                    Some(InputClass::Hdf5)
                } else if options.contains_key("idx") {
                    Some(InputClass::Idx)
                } else if options.contains_key("smd") {
                    Some(InputClass::Smd)
                } else {
                    // exp=/run=/dir= datasets read raw data by default
                    Some(InputClass::Xtc)
                }
            }
            None => match Path::new(&self.raw).extension().and_then(|e| e.to_str()) {
                Some("xtc") => Some(InputClass::Xtc),
                Some("h5" | "hdf5") => Some(InputClass::Hdf5),
                _ => None,
            },
        }
    }
}

/// Classifies a full input list.
///
/// Specifiers that cannot be classified are ignored; an empty classification
/// defaults to [`InputClass::Xtc`]. Two different classifications in one
/// list fail fast.
pub fn classify(datasets: &[Dataset]) -> Result<InputClass> {
    let mut class: Option<InputClass> = None;
    for dataset in datasets {
        let Some(this) = dataset.class() else {
            continue;
        };
        match class {
            None => class = Some(this),
            Some(seen) if seen != this => {
                return Err(Error::MixedInput(seen.to_string(), this.to_string()))
            }
            Some(_) => {}
        }
    }
    Ok(class.unwrap_or(InputClass::Xtc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(specs: &[&str]) -> Vec<Dataset> {
        specs.iter().map(|s| Dataset::parse(s)).collect()
    }

    #[test]
    fn paths_classify_by_extension() {
        assert_eq!(
            Dataset::parse("/data/e42-r0001-s00.xtc").class(),
            Some(InputClass::Xtc)
        );
        assert_eq!(Dataset::parse("run4.h5").class(), Some(InputClass::Hdf5));
        assert_eq!(Dataset::parse("run4.hdf5").class(), Some(InputClass::Hdf5));
        assert_eq!(Dataset::parse("notes.txt").class(), None);
    }

    #[test]
    fn uris_classify_by_options() {
        assert_eq!(
            Dataset::parse("exp=xpp12311:run=45").class(),
            Some(InputClass::Xtc)
        );
        assert_eq!(
            Dataset::parse("exp=xpp12311:run=45:idx").class(),
            Some(InputClass::Idx)
        );
        assert_eq!(
            Dataset::parse("exp=xpp12311:run=45:smd").class(),
            Some(InputClass::Smd)
        );
        assert_eq!(
            Dataset::parse("shmem=xana_shm:stop=no").class(),
            Some(InputClass::Shmem)
        );
        assert_eq!(
            Dataset::parse("exp=xpp12311:run=45:h5").class(),
            Some(InputClass::Hdf5)
        );
    }

    #[test]
    fn uri_options_accessible() {
        let ds = Dataset::parse("exp=xpp12311:run=45:idx");
        assert!(ds.is_uri());
        assert_eq!(ds.option("exp"), Some("xpp12311"));
        assert_eq!(ds.option("run"), Some("45"));
        assert_eq!(ds.option("idx"), Some(""));
        assert_eq!(ds.option("dir"), None);
    }

    #[test]
    fn empty_classification_defaults_to_xtc() {
        assert_eq!(classify(&parse_all(&["a.dat", "b.dat"])).unwrap(), InputClass::Xtc);
        assert_eq!(classify(&[]).unwrap(), InputClass::Xtc);
    }

    #[test]
    fn unknown_specifiers_do_not_poison_classification() {
        let class = classify(&parse_all(&["notes.txt", "run4.h5"])).unwrap();
        assert_eq!(class, InputClass::Hdf5);
    }

    #[test]
    fn mixed_classifications_fail_fast() {
        let err = classify(&parse_all(&["a.xtc", "b.h5"])).unwrap_err();
        assert!(matches!(err, Error::MixedInput(..)));
        assert!(err.to_string().contains("xtc"));
        assert!(err.to_string().contains("h5"));
    }

    #[test]
    fn parallel_support_is_limited() {
        assert!(InputClass::Xtc.supports_parallel());
        assert!(InputClass::Shmem.supports_parallel());
        assert!(!InputClass::Hdf5.supports_parallel());
        assert!(!InputClass::Idx.supports_parallel());
        assert!(!InputClass::Smd.supports_parallel());
    }
}
