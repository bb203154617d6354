//! # besim-variants: Variant Generation and Provenance
//!
//! Produces N parameterized copies of a base deck from a scenario plan
//! (predefined template, parametric sample, optimization weights,
//! one-at-a-time sensitivity, or retrofit package), with every edit
//! recorded as a [`ModificationRecord`].
//!
//! The record list is a relation; the long and wide columnar exports are
//! two views over it and reconstruct each other losslessly. Dependency
//! rules may inject companion edits (noted on the record) or reject a
//! variant outright when mutually exclusive edits meet.

pub mod apply;
pub mod manifest;
pub mod plan;
pub mod provenance;
pub mod rules;
pub mod sampling;

pub use apply::{apply_scenario, ModificationRecord};
pub use manifest::{
    generate_variants, load_manifest, VariantArtifact, VariantGeneration, VariantManifest,
};
pub use plan::{
    expand_plan, load_plan_from_path, EditMethod, EditValue, ParameterEdit, ScenarioPlan,
    VariantScenario, TEMPLATE_NAMES,
};
pub use provenance::{
    export_modification_details, long_dataframe, long_to_wide, wide_dataframe, wide_to_long,
    WideCell, WideRow,
};
pub use rules::{DependencyRule, DependencyRuleEngine};
pub use sampling::{sample, SampledParameter, SamplingMethod};
