//! Event loop, iterators and data-source builder.
//!
//! This crate is the core of the framework: it drives an input module
//! through the hierarchical transition stream, dispatches each transition to
//! the user-module chain, and surfaces the stream as three nested lazy
//! iterators.
//!
//! # Usage
//!
//! ```no_run
//! use xana_runtime::Framework;
//!
//! # fn main() -> Result<(), xana_runtime::Error> {
//! let fwk = Framework::new(Some("xana.toml".as_ref()), &[])?;
//! let ds = fwk.data_source(&["e42-r0001-s00.xtc".to_owned()])?;
//!
//! let mut runs = ds.runs();
//! while let Some(run) = runs.next()? {
//!     let mut steps = run.steps();
//!     while let Some(step) = steps.next()? {
//!         let mut events = step.events();
//!         while let Some(evt) = events.next()? {
//!             // evt has been through the whole module chain
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Each pull advances the shared [`EventLoop`] by one transition; a
//! transition an inner iterator over-consumes is pushed back for the
//! enclosing one, so no transition is ever dropped.
//!
//! # Layout
//!
//! | Module | Content |
//! |--------|---------|
//! | `event_loop` | The dispatcher state machine |
//! | `iter` | [`EventIter`] / [`StepIter`] / [`RunIter`] and the [`Run`] / [`Step`] scopes |
//! | [`loader`] | Native module loading and the builtin registry |
//! | [`framework`] | [`Framework`] and [`DataSource`] construction |
//! | [`mp`] | Master/worker process topology |
//! | [`modules`] | Builtin example modules |

mod data_source;
mod dataset;
mod error;
mod event_loop;
pub mod framework;
mod iter;
pub mod loader;
pub mod modules;
pub mod mp;

pub use data_source::DataSource;
pub use dataset::{Dataset, InputClass};
pub use error::{Error, Result};
pub use event_loop::{EventLoop, SharedLoop, Transition};
pub use framework::Framework;
pub use iter::{EventIter, Run, RunIter, Step, StepIter};
pub use loader::{DynLoader, GenericLoader};

/// Name of the framework's own configuration section and default package.
pub const FRAMEWORK_SECTION: &str = "xana";
