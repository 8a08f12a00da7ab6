//! The adapter presenting a Lua instance as a framework module.

use crate::LuaError;
use mlua::{Lua, RegistryKey, Table, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use xana_env::{ConfigStore, Env};
use xana_event::Event;
use xana_module::{Module, ModuleCore, ModuleError};

// Hook names paired with their pre-rename spellings. Scripts using the old
// flat names are rejected at construction.
const LEGACY_HOOKS: &[(&str, &str)] = &[
    ("beginjob", "begin_job"),
    ("beginrun", "begin_run"),
    ("begincalibcycle", "begin_calib_cycle"),
    ("endcalibcycle", "end_calib_cycle"),
    ("endrun", "end_run"),
    ("endjob", "end_job"),
];

/// A user module implemented as a Lua script.
///
/// The script evaluates to a constructor function; the constructor is called
/// once with the module's configuration (full-name section over class
/// section, as a table of strings) and returns the instance table. `event`
/// must be present at construction time; every other hook is looked up per
/// invocation and absent hooks are silently skipped.
///
/// Callback return values map to verdicts (`nil`/`"ok"`, `"skip"`,
/// `"stop"`, `"abort"`); a Lua error inside a callback is fatal and
/// surfaces as a scripting error.
pub struct LuaModule {
    core: ModuleCore,
    lua: Mutex<Lua>,
    instance: RegistryKey,
    observe_all: bool,
}

impl std::fmt::Debug for LuaModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuaModule").field("name", &self.core.name()).finish_non_exhaustive()
    }
}

impl LuaModule {
    /// Builds a module from script text.
    ///
    /// # Errors
    ///
    /// Fails when the script does not evaluate to a constructor function,
    /// the constructor raises, the instance lacks `event`, or a legacy hook
    /// name is present.
    pub fn from_script(
        full_name: &str,
        script: &str,
        store: Arc<ConfigStore>,
    ) -> Result<Self, LuaError> {
        let load_err = |reason: String| LuaError::Load {
            spec: full_name.to_owned(),
            reason,
        };

        let core = ModuleCore::with_store(full_name, Arc::clone(&store));
        let lua = Lua::new();

        let ctor: Value = lua
            .load(script)
            .set_name(full_name)
            .eval()
            .map_err(|e| load_err(e.to_string()))?;
        let Value::Function(ctor) = ctor else {
            return Err(load_err("script must return a constructor function".into()));
        };

        // Configuration as named parameters: class section, overridden by
        // the full-name section.
        let config = lua.create_table()?;
        let class_name = core.class_name().to_owned();
        for section in [class_name.as_str(), full_name] {
            for key in store.keys(section) {
                if let Ok(value) = store.get_str(section, &key) {
                    config.set(key, value)?;
                }
            }
        }

        let instance: Value = ctor
            .call((config,))
            .map_err(|e| load_err(format!("constructor failed: {e}")))?;
        let Value::Table(instance) = instance else {
            return Err(load_err("constructor must return an instance table".into()));
        };

        for (legacy, expected) in LEGACY_HOOKS {
            if matches!(instance.get::<Value>(*legacy)?, Value::Function(_)) {
                return Err(LuaError::LegacyCallback {
                    spec: full_name.to_owned(),
                    found: (*legacy).to_owned(),
                    expected: (*expected).to_owned(),
                });
            }
        }

        if !matches!(instance.get::<Value>("event")?, Value::Function(_)) {
            return Err(LuaError::MissingCallback {
                spec: full_name.to_owned(),
                callback: "event".to_owned(),
            });
        }

        let observe_all = instance
            .get::<Option<bool>>("observe_all_events")?
            .unwrap_or(false);

        let instance = lua.create_registry_value(instance)?;
        debug!(module = full_name, observe_all, "loaded Lua module");

        Ok(Self {
            core,
            lua: Mutex::new(lua),
            instance,
            observe_all,
        })
    }

    /// Builds a module from a script file.
    pub fn from_file(
        full_name: &str,
        path: &std::path::Path,
        store: Arc<ConfigStore>,
    ) -> Result<Self, LuaError> {
        let script = std::fs::read_to_string(path).map_err(|e| LuaError::Load {
            spec: full_name.to_owned(),
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_script(full_name, &script, store)
    }

    // Invokes a hook on the instance; absent optional hooks are no-ops.
    // Returns the verdict string the callback produced, if any.
    fn call(
        &mut self,
        hook: &str,
        required: bool,
        evt: &Event,
        env: &Env,
    ) -> Result<(), ModuleError> {
        let scripting = |e: mlua::Error| ModuleError::Scripting(e.to_string());

        let verdict: Option<String> = {
            let lua = self.lua.lock();
            let instance: Table = lua.registry_value(&self.instance).map_err(scripting)?;
            let method: Value = instance.get(hook).map_err(scripting)?;
            let Value::Function(method) = method else {
                if required {
                    return Err(ModuleError::Scripting(format!(
                        "module {} lost its {hook}() callback",
                        self.core.name()
                    )));
                }
                return Ok(());
            };

            let info = lua.create_table().map_err(scripting)?;
            info.set("hook", hook).map_err(scripting)?;
            info.set("job", env.job_name()).map_err(scripting)?;
            info.set("instrument", env.instrument()).map_err(scripting)?;
            info.set("experiment", env.experiment()).map_err(scripting)?;
            info.set("worker", env.worker_id()).map_err(scripting)?;
            info.set("skipped", evt.is_skipped()).map_err(scripting)?;

            let ret: Value = method.call((instance, info)).map_err(|e| {
                ModuleError::Scripting(format!("{}.{hook}: {e}", self.core.name()))
            })?;
            match ret {
                Value::Nil => None,
                Value::String(s) => Some(s.to_string_lossy().to_string()),
                other => {
                    return Err(ModuleError::Scripting(format!(
                        "{}.{hook} returned {} instead of a verdict string",
                        self.core.name(),
                        other.type_name()
                    )))
                }
            }
        };

        match verdict.as_deref() {
            None | Some("ok") => {}
            Some("skip") => self.core.skip(),
            Some("stop") => self.core.stop(),
            Some("abort") => self.core.abort(),
            Some(other) => {
                return Err(ModuleError::Scripting(format!(
                    "{}.{hook} returned unknown verdict {other:?}",
                    self.core.name()
                )))
            }
        }
        Ok(())
    }
}

impl Module for LuaModule {
    fn core(&self) -> &ModuleCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModuleCore {
        &mut self.core
    }

    fn observe_all_events(&self) -> bool {
        self.observe_all
    }

    fn begin_job(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("begin_job", false, evt, env)
    }

    fn begin_run(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("begin_run", false, evt, env)
    }

    fn begin_calib_cycle(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("begin_calib_cycle", false, evt, env)
    }

    fn event(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("event", true, evt, env)
    }

    fn end_calib_cycle(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("end_calib_cycle", false, evt, env)
    }

    fn end_run(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("end_run", false, evt, env)
    }

    fn end_job(&mut self, evt: &mut Event, env: &Env) -> Result<(), ModuleError> {
        self.call("end_job", false, evt, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xana_module::testing::test_env;
    use xana_module::Verdict;

    fn store() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new())
    }

    const COUNTER: &str = r#"
        return function(config)
            local limit = tonumber(config.limit or "0")
            local count = 0
            return {
                event = function(self, info)
                    count = count + 1
                    if limit > 0 and count >= limit then
                        return "stop"
                    end
                end,
            }
        end
    "#;

    #[test]
    fn constructor_receives_config() {
        let store = store();
        store.put("Scripts.Counter", "limit", "2");
        let mut m = LuaModule::from_script("Scripts.Counter", COUNTER, store).unwrap();
        let env = test_env();
        let mut evt = Event::new();

        m.event(&mut evt, &env).unwrap();
        assert_eq!(m.verdict(), Verdict::Ok);
        m.reset();
        m.event(&mut evt, &env).unwrap();
        assert_eq!(m.verdict(), Verdict::Stop);
    }

    #[test]
    fn instance_section_overrides_class_section() {
        let store = store();
        store.put("Scripts.Counter", "limit", "5");
        store.put("Scripts.Counter:one", "limit", "1");
        let mut m = LuaModule::from_script("Scripts.Counter:one", COUNTER, store).unwrap();
        let env = test_env();
        let mut evt = Event::new();

        m.event(&mut evt, &env).unwrap();
        assert_eq!(m.verdict(), Verdict::Stop);
    }

    #[test]
    fn missing_event_is_fatal() {
        let script = "return function(config) return { } end";
        let err = LuaModule::from_script("Scripts.Empty", script, store()).unwrap_err();
        assert!(matches!(err, LuaError::MissingCallback { .. }));
    }

    #[test]
    fn legacy_hook_name_is_fatal() {
        let script = r#"
            return function(config)
                return {
                    event = function(self, info) end,
                    beginjob = function(self, info) end,
                }
            end
        "#;
        let err = LuaModule::from_script("Scripts.Old", script, store()).unwrap_err();
        match err {
            LuaError::LegacyCallback { found, expected, .. } => {
                assert_eq!(found, "beginjob");
                assert_eq!(expected, "begin_job");
            }
            other => panic!("expected legacy-callback error, got {other}"),
        }
    }

    #[test]
    fn non_constructor_script_is_fatal() {
        let err = LuaModule::from_script("Scripts.Busted", "return 42", store()).unwrap_err();
        assert!(matches!(err, LuaError::Load { .. }));
    }

    #[test]
    fn absent_optional_hooks_are_noops() {
        let store = store();
        let mut m = LuaModule::from_script("Scripts.Counter", COUNTER, store).unwrap();
        let env = test_env();
        let mut evt = Event::new();
        m.begin_run(&mut evt, &env).unwrap();
        m.end_job(&mut evt, &env).unwrap();
        assert_eq!(m.verdict(), Verdict::Ok);
    }

    #[test]
    fn callback_error_is_scripting_error() {
        let script = r#"
            return function(config)
                return {
                    event = function(self, info) error("detector on fire") end,
                }
            end
        "#;
        let mut m = LuaModule::from_script("Scripts.Fire", script, store()).unwrap();
        let env = test_env();
        let mut evt = Event::new();
        let err = m.event(&mut evt, &env).unwrap_err();
        assert!(matches!(err, ModuleError::Scripting(_)));
        assert!(err.to_string().contains("detector on fire"));
    }

    #[test]
    fn unknown_verdict_is_rejected() {
        let script = r#"
            return function(config)
                return { event = function(self, info) return "maybe" end }
            end
        "#;
        let mut m = LuaModule::from_script("Scripts.Maybe", script, store()).unwrap();
        let env = test_env();
        let mut evt = Event::new();
        let err = m.event(&mut evt, &env).unwrap_err();
        assert!(err.to_string().contains("unknown verdict"));
    }

    #[test]
    fn info_table_reports_skip_marker() {
        let script = r#"
            return function(config)
                return {
                    observe_all_events = true,
                    event = function(self, info)
                        if info.skipped then return "stop" end
                    end,
                }
            end
        "#;
        let mut m = LuaModule::from_script("Scripts.Watcher", script, store()).unwrap();
        assert!(m.observe_all_events());
        let env = test_env();
        let mut evt = Event::new();
        evt.mark_skipped();
        m.event(&mut evt, &env).unwrap();
        assert_eq!(m.verdict(), Verdict::Stop);
    }
}
