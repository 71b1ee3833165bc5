//! patchform-core: repo-aware context selection and structured patch
//! application.
//!
//! The library is organized as four cooperating components around a shared
//! set of serde models:
//!
//! - [`snapshot`] walks a repository into an immutable file inventory.
//! - [`diff`] classifies two snapshots into added/removed/modified paths
//!   with rename hints and change aggregates.
//! - [`select`] ranks files against a natural-language goal and assembles a
//!   bounded context bundle for an external planner.
//! - [`patch`] validates and applies a planner-produced edit plan, with
//!   per-file failure isolation, backups, and dry runs.
//!
//! All entry points are synchronous and take explicit [`config::Settings`];
//! persistence of snapshots, diffs, and apply logs lives in [`store`].

pub mod config;
pub mod diff;
pub mod errors;
pub mod models;
pub mod patch;
pub mod select;
pub mod snapshot;
pub mod store;

pub use errors::{PatchformError, PatchformResult};
