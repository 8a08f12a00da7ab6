//! Framework construction and the data-source builder.

use crate::dataset::{classify, Dataset, InputClass};
use crate::mp::{self, MpTopology};
use crate::{DataSource, DynLoader, Error, GenericLoader, Result, FRAMEWORK_SECTION};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use xana_env::{
    AliasMap, ConfigStore, Env, ExpNameFromConfig, ExpNameFromPath, ExpNameProvider,
};
use xana_lua::LuaLoader;
use xana_module::Module;
use xana_event::Src;

/// Default calibration directory template.
pub const DEFAULT_CALIB_DIR: &str = "/data/{instr}/{exp}/calib";

/// The framework: configuration plus the loaded user-module chain.
///
/// Construction reads the configuration file, applies command-line
/// overrides, and instantiates every module named by the `modules` key of
/// the `[xana]` section. [`data_source`](Framework::data_source) then wires
/// the modules to an input chosen from the input list.
pub struct Framework {
    store: Arc<ConfigStore>,
    loader: GenericLoader,
    modules: Vec<Box<dyn Module>>,
}

impl Framework {
    /// Builds the framework.
    ///
    /// `options` are `(section.key, value)` overrides applied on top of the
    /// file; a key without a section dot lands in the `[xana]` section. The
    /// resulting store is also installed as the process-global one so that
    /// dynamically loaded module factories can find their configuration.
    ///
    /// # Errors
    ///
    /// Configuration file errors and module loading errors.
    pub fn new(config_file: Option<&Path>, options: &[(String, String)]) -> Result<Self> {
        let store = match config_file {
            Some(path) => ConfigStore::from_file(path)?,
            None => ConfigStore::new(),
        };
        let store = Arc::new(store);

        for (key, value) in options {
            let (section, key) = match key.rsplit_once('.') {
                Some((section, key)) => (section, key),
                None => (FRAMEWORK_SECTION, key.as_str()),
            };
            store.put(section, key, value.clone());
        }

        ConfigStore::init_global(Arc::clone(&store));

        let lua_paths = store.get_list_or(FRAMEWORK_SECTION, "lua-path", &[]);
        let lua = LuaLoader::new(Arc::clone(&store)).with_paths(lua_paths);
        let loader = GenericLoader::new(DynLoader::new(), lua);

        let mut modules = Vec::new();
        for spec in store.get_list_or(FRAMEWORK_SECTION, "modules", &[]) {
            let module = loader.load_module(&spec)?;
            debug!(module = module.name(), "loaded module");
            modules.push(module);
        }

        Ok(Self {
            store,
            loader,
            modules,
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Returns `true` when at least one user module is configured.
    #[must_use]
    pub fn has_modules(&self) -> bool {
        !self.modules.is_empty()
    }

    /// Display names of the loaded modules, in registration order.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name().to_owned()).collect()
    }

    /// Builds the data source for an input list.
    ///
    /// Follows the builder steps: classify the inputs, fork workers when
    /// parallel mode applies, choose the input-module class, publish the
    /// input list and pipe descriptors to its config section, construct the
    /// environment, and wire everything into a [`DataSource`]. In parallel
    /// mode the master keeps no user modules; the full chain runs inside the
    /// workers.
    ///
    /// # Errors
    ///
    /// [`Error::NoInput`] when neither the arguments nor the configuration
    /// name any input, [`Error::MixedInput`] on inconsistent input types,
    /// plus fork and input-module loading failures.
    pub fn data_source(mut self, inputs: &[String]) -> Result<DataSource> {
        let store = Arc::clone(&self.store);

        let mut input_list: Vec<String> = inputs.to_vec();
        if input_list.is_empty() {
            input_list = store.get_list_or(FRAMEWORK_SECTION, "input", &[]);
        }
        if input_list.is_empty() {
            input_list = store.get_list_or(FRAMEWORK_SECTION, "files", &[]);
        }
        if input_list.is_empty() {
            return Err(Error::NoInput);
        }

        let datasets: Vec<Dataset> = input_list.iter().map(|s| Dataset::parse(s)).collect();
        let class = classify(&datasets)?;
        debug!(%class, inputs = input_list.len(), "classified input");

        let mut parallel = store.get_or::<u32>(FRAMEWORK_SECTION, "parallel", 0)?;
        if parallel > 0 && !class.supports_parallel() {
            warn!(%class, "parallel mode is not supported for this input type; running in-process");
            parallel = 0;
        }
        let topology = mp::fork_workers(parallel)?;

        let input_class_name = input_module_class(class, &topology);
        store.put(input_class_name, "files", input_list.join(" "));
        topology.publish(&store, input_class_name);

        // The master distributes data; user computation runs in the workers.
        let modules = if topology.is_master() {
            debug!("master process runs no user modules");
            Vec::new()
        } else {
            std::mem::take(&mut self.modules)
        };

        let env = Arc::new(build_env(&store, &input_list, class, topology.worker_id()));
        info!(
            job = env.job_name(),
            instrument = env.instrument(),
            experiment = env.experiment(),
            worker = env.worker_id(),
            "environment ready"
        );

        let input = self.loader.load_input_module(input_class_name)?;

        let skip_events = store.get_or::<u64>(FRAMEWORK_SECTION, "skip-events", 0)?;
        if skip_events > 0 && !input.supports_skip_events() {
            warn!(
                input = input.name(),
                skip_events, "skip-events is configured but not supported by this input"
            );
        }

        Ok(DataSource::with_loader(input, modules, env, self.loader))
    }
}

// Input-module class table, keyed by classification and process role.
fn input_module_class(class: InputClass, topology: &MpTopology) -> &'static str {
    match class {
        InputClass::Xtc => match topology {
            MpTopology::Master { .. } => "XtcInput.XtcMasterInput",
            MpTopology::Worker { .. } => "XtcInput.XtcWorkerInput",
            MpTopology::Serial => "XtcInput.XtcInputModule",
        },
        InputClass::Shmem => match topology {
            MpTopology::Master { .. } => "ShmemInput.ShmemMasterInput",
            MpTopology::Worker { .. } => "ShmemInput.ShmemWorkerInput",
            MpTopology::Serial => "ShmemInput.ShmemInputModule",
        },
        InputClass::Hdf5 => "Hdf5Input.Hdf5InputModule",
        InputClass::Idx => "IdxInput.IdxInputModule",
        InputClass::Smd => "SmdInput.SmdInputModule",
    }
}

fn build_env(
    store: &Arc<ConfigStore>,
    input_list: &[String],
    class: InputClass,
    worker_id: i32,
) -> Env {
    let mut job_name = store.get_str_or(FRAMEWORK_SECTION, "job-name", "");
    if job_name.is_empty() {
        job_name = job_name_from_input(&input_list[0]);
    }

    let experiment = store.get_str_or(FRAMEWORK_SECTION, "experiment", "");
    let provider: Box<dyn ExpNameProvider> = if !experiment.is_empty() {
        let instrument = store.get_str_or(FRAMEWORK_SECTION, "instrument", "");
        Box::new(ExpNameFromConfig::new(instrument, experiment))
    } else if class == InputClass::Xtc {
        Box::new(ExpNameFromPath::new(input_list.to_vec()))
    } else {
        Box::new(ExpNameFromConfig::new("", ""))
    };

    let calib_dir = store.get_str_or(FRAMEWORK_SECTION, "calib-dir", DEFAULT_CALIB_DIR);

    let mut aliases = AliasMap::new();
    for alias in store.keys("aliases") {
        if let Ok(src) = store.get_str("aliases", &alias) {
            aliases.insert(alias, Src::new(src));
        }
    }

    Env::new(
        job_name,
        provider,
        calib_dir,
        Arc::clone(store),
        aliases,
        worker_id,
    )
}

// Job name defaults to the stem of the first input path.
fn job_name_from_input(input: &str) -> String {
    Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_from_path_stem() {
        assert_eq!(job_name_from_input("/data/e42-r0001-s00.xtc"), "e42-r0001-s00");
        assert_eq!(job_name_from_input("exp=xpp:run=4"), "exp=xpp:run=4");
    }

    #[test]
    fn input_class_table() {
        let serial = MpTopology::Serial;
        assert_eq!(
            input_module_class(InputClass::Xtc, &serial),
            "XtcInput.XtcInputModule"
        );
        assert_eq!(
            input_module_class(InputClass::Hdf5, &serial),
            "Hdf5Input.Hdf5InputModule"
        );
        assert_eq!(
            input_module_class(InputClass::Idx, &serial),
            "IdxInput.IdxInputModule"
        );

        let master = MpTopology::Master {
            ready_pipe_fd: 0,
            workers: Vec::new(),
        };
        assert_eq!(
            input_module_class(InputClass::Xtc, &master),
            "XtcInput.XtcMasterInput"
        );
        let worker = MpTopology::Worker {
            worker_id: 0,
            ready_pipe_fd: 0,
            data_pipe_fd: 0,
        };
        assert_eq!(
            input_module_class(InputClass::Shmem, &worker),
            "ShmemInput.ShmemWorkerInput"
        );
    }

    #[test]
    fn env_prefers_configured_experiment() {
        let store = Arc::new(ConfigStore::new());
        store.put(FRAMEWORK_SECTION, "experiment", "xpp12311");
        store.put(FRAMEWORK_SECTION, "instrument", "XPP");
        store.put("aliases", "front", "det.0:cam.0");

        let inputs = vec!["e42-r0001-s00.xtc".to_owned()];
        let env = build_env(&store, &inputs, InputClass::Xtc, -1);

        assert_eq!(env.experiment(), "xpp12311");
        assert_eq!(env.instrument(), "XPP");
        assert_eq!(env.job_name(), "e42-r0001-s00");
        assert!(env.aliases().src("front").is_some());
    }

    #[test]
    fn env_falls_back_to_path_provider_for_xtc() {
        let store = Arc::new(ConfigStore::new());
        let inputs = vec!["e42-r0001-s00.xtc".to_owned()];
        let env = build_env(&store, &inputs, InputClass::Xtc, 2);

        assert_eq!(env.experiment(), "e42");
        assert_eq!(env.worker_id(), 2);
        assert_eq!(env.calib_dir_template(), DEFAULT_CALIB_DIR);
    }

    #[test]
    fn framework_without_input_fails() {
        let fwk = Framework::new(None, &[]).unwrap();
        assert!(!fwk.has_modules());
        let err = fwk.data_source(&[]).unwrap_err();
        assert!(matches!(err, Error::NoInput));
    }

    #[test]
    fn options_land_in_sections() {
        let options = vec![
            ("events".to_owned(), "10".to_owned()),
            ("Dump.Printer.lines".to_owned(), "3".to_owned()),
        ];
        let fwk = Framework::new(None, &options).unwrap();
        assert_eq!(fwk.store().get::<u64>(FRAMEWORK_SECTION, "events").unwrap(), 10);
        assert_eq!(fwk.store().get::<u32>("Dump.Printer", "lines").unwrap(), 3);
    }

    #[test]
    fn builtin_modules_load_by_option() {
        let options = vec![("modules".to_owned(), "PrintEventId EventKeys".to_owned())];
        let fwk = Framework::new(None, &options).unwrap();
        assert!(fwk.has_modules());
        assert_eq!(
            fwk.module_names(),
            vec!["xana.PrintEventId", "xana.EventKeys"]
        );
    }
}
