//! Experiment-name providers.
//!
//! The environment resolves instrument and experiment names lazily through a
//! provider so that construction never touches the filesystem. Two providers
//! exist: one backed by explicit configuration, one that parses the `eNN-`
//! prefix convention of raw data file names.

use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Lazily resolved instrument/experiment names.
pub trait ExpNameProvider: Send + Sync {
    /// Instrument name, empty when unknown.
    fn instrument(&self) -> &str;

    /// Experiment name, empty when unknown.
    fn experiment(&self) -> &str;
}

/// Provider with names fixed at construction.
#[derive(Debug, Clone)]
pub struct ExpNameFromConfig {
    instr: String,
    exp: String,
}

impl ExpNameFromConfig {
    #[must_use]
    pub fn new(instr: impl Into<String>, exp: impl Into<String>) -> Self {
        Self {
            instr: instr.into(),
            exp: exp.into(),
        }
    }
}

impl ExpNameProvider for ExpNameFromConfig {
    fn instrument(&self) -> &str {
        &self.instr
    }

    fn experiment(&self) -> &str {
        &self.exp
    }
}

/// Provider that parses experiment tags out of input file names.
///
/// Raw data files follow the `e<NUM>-r<RUN>-...` naming convention; the
/// experiment tag is the `e<NUM>` prefix of the stem. Every input must carry
/// the same tag; on disagreement (or when no file matches the convention) the
/// provider resolves to empty names with a warning. The instrument is not
/// encoded in file names and resolves to the empty string.
pub struct ExpNameFromPath {
    files: Vec<String>,
    resolved: OnceLock<String>,
}

impl ExpNameFromPath {
    #[must_use]
    pub fn new(files: Vec<String>) -> Self {
        Self {
            files,
            resolved: OnceLock::new(),
        }
    }

    fn resolve(&self) -> &str {
        self.resolved.get_or_init(|| {
            let mut tag: Option<String> = None;
            for file in &self.files {
                let Some(file_tag) = exp_tag(file) else {
                    warn!(file, "input file name does not carry an experiment tag");
                    return String::new();
                };
                match &tag {
                    None => tag = Some(file_tag),
                    Some(seen) if *seen != file_tag => {
                        warn!(
                            first = %seen,
                            other = %file_tag,
                            "input files disagree on experiment tag"
                        );
                        return String::new();
                    }
                    Some(_) => {}
                }
            }
            tag.unwrap_or_default()
        })
    }
}

impl ExpNameProvider for ExpNameFromPath {
    fn instrument(&self) -> &str {
        ""
    }

    fn experiment(&self) -> &str {
        self.resolve()
    }
}

// `e123-r0045-s00.xtc` -> `e123`
fn exp_tag(path: &str) -> Option<String> {
    let stem = Path::new(path).file_stem()?.to_str()?;
    let head = stem.split('-').next()?;
    let digits = head.strip_prefix('e')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(head.to_owned())
}
