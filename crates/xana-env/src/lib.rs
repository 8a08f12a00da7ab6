//! Configuration store and per-data-source environment.
//!
//! Two concerns live here:
//!
//! - [`ConfigStore`] — the sectioned key/value store every configurable part
//!   of the framework reads from. Loaded from a TOML file, overridable at
//!   runtime, and available through a process-global slot for module
//!   factories that receive nothing but a name.
//! - [`Env`] — the per-data-source context shared by all modules: job name,
//!   instrument/experiment (resolved lazily), calibration directory template,
//!   alias map, calibration store, and the worker identifier in
//!   multi-process layouts.

mod config;
mod env;
mod exp_name;

pub use config::{ConfigError, ConfigStore};
pub use env::{AliasMap, CalibStore, Env};
pub use exp_name::{ExpNameFromConfig, ExpNameFromPath, ExpNameProvider};
