//! Per-data-source environment.

use crate::{ConfigStore, ExpNameProvider};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use xana_event::Src;

/// Map between detector aliases and source addresses.
///
/// Built by the data-source builder from configuration; the core defines no
/// operations beyond lookup in both directions.
#[derive(Debug, Default, Clone)]
pub struct AliasMap {
    by_alias: HashMap<String, Src>,
}

impl AliasMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alias for a source address, replacing any previous entry.
    pub fn insert(&mut self, alias: impl Into<String>, src: Src) {
        self.by_alias.insert(alias.into(), src);
    }

    /// Source address registered for an alias.
    #[must_use]
    pub fn src(&self, alias: &str) -> Option<&Src> {
        self.by_alias.get(alias)
    }

    /// Alias registered for a source address, if any.
    #[must_use]
    pub fn alias(&self, src: &Src) -> Option<&str> {
        self.by_alias
            .iter()
            .find(|(_, s)| *s == src)
            .map(|(a, _)| a.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }
}

/// Typed store for calibration data, keyed by calibration type name.
///
/// Populated by calibration-aware modules; the core only constructs it and
/// passes it around.
#[derive(Default)]
pub struct CalibStore {
    values: RwLock<HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
}

impl CalibStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a calibration object, replacing any previous one of the same
    /// type and key.
    pub fn put<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values
            .write()
            .insert((TypeId::of::<T>(), key.into()), Arc::new(value));
    }

    /// Fetches a calibration object.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.values
            .read()
            .get(&(TypeId::of::<T>(), key.to_owned()))
            .cloned()
            .and_then(|v| v.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for CalibStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibStore")
            .field("entries", &self.values.read().len())
            .finish()
    }
}

/// Process-wide context for one data source.
///
/// Constructed once by the builder and shared by the input module and every
/// user module. The core never mutates it after construction; modules reach
/// mutable state only through the config and calib stores.
pub struct Env {
    job_name: String,
    exp_name: Box<dyn ExpNameProvider>,
    calib_dir: String,
    config: Arc<ConfigStore>,
    calib_store: CalibStore,
    aliases: AliasMap,
    worker_id: i32,
}

impl Env {
    /// Builds the environment.
    ///
    /// `calib_dir` is a template that may contain `{instr}` and `{exp}`
    /// placeholders; `worker_id` is `-1` in the master or single-process
    /// case.
    #[must_use]
    pub fn new(
        job_name: impl Into<String>,
        exp_name: Box<dyn ExpNameProvider>,
        calib_dir: impl Into<String>,
        config: Arc<ConfigStore>,
        aliases: AliasMap,
        worker_id: i32,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            exp_name,
            calib_dir: calib_dir.into(),
            config,
            calib_store: CalibStore::new(),
            aliases,
            worker_id,
        }
    }

    #[must_use]
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    #[must_use]
    pub fn instrument(&self) -> &str {
        self.exp_name.instrument()
    }

    #[must_use]
    pub fn experiment(&self) -> &str {
        self.exp_name.experiment()
    }

    /// Calibration directory with `{instr}`/`{exp}` substituted.
    #[must_use]
    pub fn calib_dir(&self) -> String {
        self.calib_dir
            .replace("{instr}", self.instrument())
            .replace("{exp}", self.experiment())
    }

    /// The raw calibration directory template.
    #[must_use]
    pub fn calib_dir_template(&self) -> &str {
        &self.calib_dir
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    #[must_use]
    pub fn calib_store(&self) -> &CalibStore {
        &self.calib_store
    }

    #[must_use]
    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    /// Worker identifier: `-1` in the master or single-process case,
    /// otherwise the small non-negative id assigned at fork time.
    #[must_use]
    pub fn worker_id(&self) -> i32 {
        self.worker_id
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("job_name", &self.job_name)
            .field("instrument", &self.instrument())
            .field("experiment", &self.experiment())
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExpNameFromConfig;

    fn test_env() -> Env {
        Env::new(
            "job-1",
            Box::new(ExpNameFromConfig::new("AMO", "amo42")),
            "/calib/{instr}/{exp}",
            Arc::new(ConfigStore::new()),
            AliasMap::new(),
            -1,
        )
    }

    #[test]
    fn calib_dir_substitution() {
        let env = test_env();
        assert_eq!(env.calib_dir(), "/calib/AMO/amo42");
        assert_eq!(env.calib_dir_template(), "/calib/{instr}/{exp}");
    }

    #[test]
    fn worker_id_defaults_to_master() {
        assert_eq!(test_env().worker_id(), -1);
    }

    #[test]
    fn alias_round_trip() {
        let mut aliases = AliasMap::new();
        let src = Src::new("det.0:cam.0");
        aliases.insert("front", src.clone());

        assert_eq!(aliases.src("front"), Some(&src));
        assert_eq!(aliases.alias(&src), Some("front"));
        assert_eq!(aliases.src("back"), None);
    }

    #[test]
    fn calib_store_typed_access() {
        let env = test_env();
        env.calib_store().put("pedestals", vec![1.0f64, 2.0]);

        let peds = env.calib_store().get::<Vec<f64>>("pedestals").unwrap();
        assert_eq!(peds.len(), 2);
        assert!(env.calib_store().get::<Vec<f32>>("pedestals").is_none());
    }
}
