//! Resolution of module specifiers to Lua scripts.

use crate::{LuaError, LuaModule};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use xana_env::ConfigStore;
use xana_module::ModuleSpec;

/// Loads Lua modules from configured search paths.
///
/// For a specifier `Package.Class[:instance]` the loader probes, in search
/// path order:
///
/// 1. `{path}/{Package}/{Class}.lua` — package directory
/// 2. `{path}/{Package}.{Class}.lua` — flat file
///
/// The first match wins; a miss everywhere is a
/// [`LuaError::ScriptNotFound`] carrying every probed location.
#[derive(Debug, Clone)]
pub struct LuaLoader {
    search_paths: Vec<PathBuf>,
    store: Arc<ConfigStore>,
}

impl LuaLoader {
    #[must_use]
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            search_paths: Vec::new(),
            store,
        }
    }

    /// Adds a search path; paths are probed in insertion order.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Adds several search paths.
    #[must_use]
    pub fn with_paths(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        for path in paths {
            self.search_paths.push(path.into());
        }
        self
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Loads and constructs the module named by `spec`.
    ///
    /// # Errors
    ///
    /// [`LuaError::ScriptNotFound`] when no candidate file exists, or any
    /// construction error from [`LuaModule::from_script`].
    pub fn load(&self, spec: &ModuleSpec) -> Result<LuaModule, LuaError> {
        let mut searched = Vec::new();
        for path in &self.search_paths {
            let candidates = [
                path.join(spec.package()).join(format!("{}.lua", spec.class())),
                path.join(format!("{}.{}.lua", spec.package(), spec.class())),
            ];
            for candidate in candidates {
                if candidate.is_file() {
                    debug!(spec = %spec, path = %candidate.display(), "loading Lua module");
                    return LuaModule::from_file(
                        &spec.full_name(),
                        &candidate,
                        Arc::clone(&self.store),
                    );
                }
                searched.push(candidate.display().to_string());
            }
        }
        Err(LuaError::ScriptNotFound {
            spec: spec.full_name(),
            searched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCRIPT: &str = r#"
        return function(config)
            return { event = function(self, info) end }
        end
    "#;

    fn store() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new())
    }

    #[test]
    fn loads_from_package_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Scripts")).unwrap();
        fs::write(dir.path().join("Scripts/Probe.lua"), SCRIPT).unwrap();

        let loader = LuaLoader::new(store()).with_path(dir.path());
        let spec = ModuleSpec::parse("Scripts.Probe").unwrap();
        assert!(loader.load(&spec).is_ok());
    }

    #[test]
    fn loads_flat_file_form() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Scripts.Probe.lua"), SCRIPT).unwrap();

        let loader = LuaLoader::new(store()).with_path(dir.path());
        let spec = ModuleSpec::parse("Scripts.Probe:alt").unwrap();
        assert!(loader.load(&spec).is_ok());
    }

    #[test]
    fn miss_reports_all_probed_locations() {
        let dir = tempfile::tempdir().unwrap();
        let loader = LuaLoader::new(store()).with_path(dir.path());
        let spec = ModuleSpec::parse("Scripts.Ghost").unwrap();

        let err = loader.load(&spec).unwrap_err();
        match err {
            LuaError::ScriptNotFound { searched, .. } => assert_eq!(searched.len(), 2),
            other => panic!("expected script-not-found, got {other}"),
        }
    }

    #[test]
    fn earlier_path_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("Scripts.Probe.lua"), SCRIPT).unwrap();
        fs::write(
            second.path().join("Scripts.Probe.lua"),
            "return function(config) return { } end",
        )
        .unwrap();

        let loader = LuaLoader::new(store())
            .with_path(first.path())
            .with_path(second.path());
        let spec = ModuleSpec::parse("Scripts.Probe").unwrap();
        // the second copy is broken; loading must not reach it
        assert!(loader.load(&spec).is_ok());
    }
}
