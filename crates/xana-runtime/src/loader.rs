//! Native module loading and the builtin registry.

use crate::{modules, Error, Result};
use libloading::os::unix::{Library, Symbol, RTLD_GLOBAL, RTLD_NOW};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use xana_lua::{LuaError, LuaLoader};
use xana_module::{
    InputModule, InputModuleFactory, Module, ModuleFactory, ModuleSpec, DEFAULT_PACKAGE,
};

/// Loader for modules compiled into package libraries.
///
/// A specifier's package maps to `lib<Package>.so`, loaded once with
/// `RTLD_NOW | RTLD_GLOBAL` so later packages can resolve symbols against
/// it. The factory symbol is the fixed prefix (`_xana_module_` or
/// `_xana_input_module_`) concatenated with the class name; the factory
/// receives the full display name and returns the owned instance.
///
/// Classes in the default `xana` package resolve against the builtin
/// registry first, without touching the dynamic linker. Library handles stay
/// alive as long as any clone of the loader does, which every data source
/// built from it guarantees — a module must never outlive the library that
/// holds its code.
#[derive(Clone, Default)]
pub struct DynLoader {
    libs: Arc<Mutex<HashMap<String, Library>>>,
}

impl DynLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and constructs a user module.
    pub fn load_module(&self, spec: &ModuleSpec) -> Result<Box<dyn Module>> {
        if spec.package() == DEFAULT_PACKAGE {
            if let Some(factory) = modules::builtin_factory(spec.class()) {
                debug!(module = %spec, "constructing builtin module");
                return Ok(factory(&spec.full_name()));
            }
        }
        let factory: ModuleFactory = self.factory(spec, spec.module_symbol())?;
        Ok(factory(&spec.full_name()))
    }

    /// Loads and constructs an input module.
    pub fn load_input_module(&self, spec: &ModuleSpec) -> Result<Box<dyn InputModule>> {
        let factory: InputModuleFactory = self.factory(spec, spec.input_module_symbol())?;
        Ok(factory(&spec.full_name()))
    }

    fn factory<F: Copy>(&self, spec: &ModuleSpec, symbol: String) -> Result<F> {
        let lib_name = spec.lib_name();
        let mut libs = self.libs.lock();

        if !libs.contains_key(spec.package()) {
            debug!(lib = lib_name, "loading package library");
            let lib = unsafe { Library::open(Some(&lib_name), RTLD_NOW | RTLD_GLOBAL) }.map_err(
                |source| Error::LibraryLoad {
                    lib: lib_name.clone(),
                    source: source.into(),
                },
            )?;
            libs.insert(spec.package().to_owned(), lib);
        }

        let lib = &libs[spec.package()];
        let sym: Symbol<F> =
            unsafe { lib.get(symbol.as_bytes()) }.map_err(|_| Error::SymbolNotFound {
                symbol,
                lib: lib_name,
            })?;
        Ok(*sym)
    }
}

/// Loader routing a specifier to the native or the Lua host.
///
/// The native path (builtins included) is tried first; when the package
/// library does not resolve, the Lua search paths are probed. If neither
/// finds the module, the native diagnostic is reported, since a missing
/// library is the more likely mistake.
#[derive(Clone)]
pub struct GenericLoader {
    native: DynLoader,
    lua: LuaLoader,
}

impl GenericLoader {
    #[must_use]
    pub fn new(native: DynLoader, lua: LuaLoader) -> Self {
        Self { native, lua }
    }

    /// Resolves a raw specifier to a constructed module.
    pub fn load_module(&self, raw: &str) -> Result<Box<dyn Module>> {
        let spec = ModuleSpec::parse(raw)?;
        match self.native.load_module(&spec) {
            Err(native_err @ Error::LibraryLoad { .. }) => match self.lua.load(&spec) {
                Ok(module) => Ok(Box::new(module)),
                Err(LuaError::ScriptNotFound { .. }) => Err(native_err),
                Err(lua_err) => Err(lua_err.into()),
            },
            other => other,
        }
    }

    /// Resolves a raw specifier to a constructed input module.
    ///
    /// Input modules are always native; the scripting host does not produce
    /// transition streams.
    pub fn load_input_module(&self, raw: &str) -> Result<Box<dyn InputModule>> {
        let spec = ModuleSpec::parse(raw)?;
        self.native.load_input_module(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use xana_env::ConfigStore;

    fn generic(paths: &[&std::path::Path]) -> GenericLoader {
        let lua = LuaLoader::new(Arc::new(ConfigStore::new())).with_paths(paths.iter().copied());
        GenericLoader::new(DynLoader::new(), lua)
    }

    #[test]
    fn builtins_resolve_without_linker() {
        let loader = DynLoader::new();
        let spec = ModuleSpec::parse("PrintEventId").unwrap();
        let module = loader.load_module(&spec).unwrap();
        assert_eq!(module.name(), "xana.PrintEventId");
    }

    #[test]
    fn builtin_instances_keep_their_suffix() {
        let loader = DynLoader::new();
        let spec = ModuleSpec::parse("xana.PrintSeparator:thin").unwrap();
        let module = loader.load_module(&spec).unwrap();
        assert_eq!(module.name(), "xana.PrintSeparator:thin");
        assert_eq!(module.class_name(), "xana.PrintSeparator");
    }

    #[test]
    fn missing_library_reports_linker_diagnostic() {
        let loader = DynLoader::new();
        let spec = ModuleSpec::parse("NoSuchPkg.Filter").unwrap();
        let err = loader.load_module(&spec).unwrap_err();
        match err {
            Error::LibraryLoad { lib, .. } => assert!(lib.contains("NoSuchPkg")),
            other => panic!("expected library-load error, got {other}"),
        }
    }

    #[test]
    fn generic_loader_falls_back_to_lua() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Scripts.Probe.lua"),
            "return function(config) return { event = function(self, info) end } end",
        )
        .unwrap();

        let loader = generic(&[dir.path()]);
        let module = loader.load_module("Scripts.Probe").unwrap();
        assert_eq!(module.name(), "Scripts.Probe");
    }

    #[test]
    fn generic_loader_keeps_native_error_when_no_script() {
        let dir = tempfile::tempdir().unwrap();
        let loader = generic(&[dir.path()]);
        let err = loader.load_module("NoSuchPkg.Filter").unwrap_err();
        assert!(matches!(err, Error::LibraryLoad { .. }));
    }

    #[test]
    fn broken_script_error_wins_over_native() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Scripts.Broken.lua"), "return 42").unwrap();

        let loader = generic(&[dir.path()]);
        let err = loader.load_module("Scripts.Broken").unwrap_err();
        assert!(matches!(err, Error::Lua(LuaError::Load { .. })));
    }

    #[test]
    fn invalid_specifier_is_rejected_up_front() {
        let loader = generic(&[]);
        let err = loader.load_module("Bad..Name").unwrap_err();
        assert!(err.to_string().contains("invalid module name"));
    }
}
