// src/config/mod.rs

//! Inputs for a run.
//!
//! - [`model`]: step/sample tables and the TOML settings model.
//! - [`loader`]: tab-separated table parsing and settings loading.
//! - [`validate`]: table sanity (names, unknown parents, step cycles) and
//!   raw → validated settings.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    load_and_validate, load_sample_table, load_settings, load_step_table, parse_sample_table,
    parse_step_table,
};
pub use model::{
    QueueSection, RawSchedulerSection, RawSettings, SampleDef, SampleTable, SchedulerSettings,
    ScriptsSection, Settings, StepDef, StepTable,
};
pub use validate::{parse_duration, validate_tables};
