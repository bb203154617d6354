//! The archetype lookup store: a read-only nested table of parameter ranges
//! keyed by (scenario, stage, subsystem, function, sub-type, age range).
//!
//! The tree is purely tabular; nodes are either a leaf block or a branch map
//! and the fallback logic is a loop that pops keys. A missing key at any
//! level never raises: the walk falls back to the first available key at
//! that level and records the substitution, so a best-effort block comes
//! back even when every key was defaulted.

use anyhow::{Context, Result};
use besim_core::{AgeRange, BuildingFunction, CalibrationStage, ParameterRange, Subsystem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::patterns::{DayPatternSet, SetpointWindow};

/// Leaf payload: parameter ranges plus the discrete and schedule side-tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchetypeBlock {
    /// Numeric parameter ranges by canonical archetype parameter name.
    #[serde(default)]
    pub params: BTreeMap<String, ParameterRange>,
    /// Discrete choices (e.g. `system_type` -> "A").
    #[serde(default)]
    pub choices: BTreeMap<String, String>,
    /// Ranged day-patterns per schedule slot (e.g. `hvac_availability`).
    #[serde(default)]
    pub schedules: BTreeMap<String, DayPatternSet>,
    /// Day window for setpoint schedule synthesis.
    #[serde(default)]
    pub setpoint_window: Option<SetpointWindow>,
}

impl ArchetypeBlock {
    /// Merge `other` into `self`, with `other` winning on conflicts. Used to
    /// layer age-specific leaves over subsystem-wide bases.
    pub fn overlay(&mut self, other: &ArchetypeBlock) {
        for (k, v) in &other.params {
            self.params.insert(k.clone(), *v);
        }
        for (k, v) in &other.choices {
            self.choices.insert(k.clone(), v.clone());
        }
        for (k, v) in &other.schedules {
            self.schedules.insert(k.clone(), v.clone());
        }
        if other.setpoint_window.is_some() {
            self.setpoint_window = other.setpoint_window.clone();
        }
    }
}

/// One node of the lookup tree.
///
/// Serde note: `Leaf` is tried first and `ArchetypeBlock` denies unknown
/// fields, so branch maps (whose keys are scenario/sub-type strings) fall
/// through to `Branch` during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupNode {
    Leaf(ArchetypeBlock),
    Branch(BTreeMap<String, LookupNode>),
}

impl LookupNode {
    pub fn branch() -> LookupNode {
        LookupNode::Branch(BTreeMap::new())
    }

    /// Insert a leaf at `path`, creating intermediate branches.
    pub fn insert_leaf(&mut self, path: &[&str], block: ArchetypeBlock) {
        match self {
            LookupNode::Branch(map) => match path {
                [] => {
                    // Overwriting a branch root with a leaf is a modelling
                    // error in builtin data; keep the branch.
                    warn!("refusing to replace a branch with a leaf");
                }
                [last] => {
                    map.insert(last.to_string(), LookupNode::Leaf(block));
                }
                [head, rest @ ..] => {
                    map.entry(head.to_string())
                        .or_insert_with(LookupNode::branch)
                        .insert_leaf(rest, block);
                }
            },
            LookupNode::Leaf(_) => warn!("cannot descend into a leaf at {:?}", path),
        }
    }
}

/// Result of a block lookup: the resolved block plus every key substitution
/// made on the way down.
#[derive(Debug, Clone, Default)]
pub struct BlockResolution {
    pub block: ArchetypeBlock,
    /// Human-readable descriptions of each fallback taken.
    pub fallbacks: Vec<String>,
}

impl BlockResolution {
    pub fn fully_resolved(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// Read-only after load; freely shared across workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchetypeStore {
    root: LookupNode,
}

impl Default for ArchetypeStore {
    fn default() -> Self {
        crate::builtin::builtin_store()
    }
}

impl ArchetypeStore {
    pub fn empty() -> Self {
        ArchetypeStore {
            root: LookupNode::branch(),
        }
    }

    pub fn from_root(root: LookupNode) -> Self {
        ArchetypeStore { root }
    }

    /// Load a JSON lookup tree from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading archetype lookup '{}'", path.display()))?;
        let root: LookupNode =
            serde_json::from_str(&text).context("parsing archetype lookup JSON")?;
        Ok(ArchetypeStore { root })
    }

    pub fn insert_leaf(&mut self, path: &[&str], block: ArchetypeBlock) {
        self.root.insert_leaf(path, block);
    }

    /// Resolve the block for one subsystem query.
    ///
    /// The walk descends scenario → stage → subsystem → function → sub-type
    /// → age range. A leaf reached early wins (coarser tables are legal); a
    /// branch remaining after all keys are consumed keeps taking first keys
    /// until a leaf appears. Every substitution is logged and recorded.
    pub fn get_subsystem_block(
        &self,
        scenario: &str,
        stage: CalibrationStage,
        subsystem: Subsystem,
        function: BuildingFunction,
        sub_type: &str,
        age_range: AgeRange,
    ) -> BlockResolution {
        let stage_label = stage.label();
        let keys = [
            scenario,
            stage_label.as_str(),
            subsystem.as_str(),
            function.as_str(),
            sub_type,
            age_range.as_str(),
        ];
        let mut resolution = BlockResolution::default();
        let mut node = &self.root;
        let mut remaining = keys.as_slice();

        loop {
            match node {
                LookupNode::Leaf(block) => {
                    resolution.block = block.clone();
                    return resolution;
                }
                LookupNode::Branch(map) => {
                    if map.is_empty() {
                        let message = format!(
                            "archetype lookup exhausted before a leaf for \
                             {scenario}/{stage_label}/{subsystem}; returning empty block"
                        );
                        warn!("{message}");
                        resolution.fallbacks.push(message);
                        return resolution;
                    }
                    let (wanted, rest) = match remaining {
                        [head, rest @ ..] => (Some(*head), rest),
                        [] => (None, &[] as &[&str]),
                    };
                    let chosen = match wanted {
                        Some(key) if map.contains_key(key) => key.to_string(),
                        _ => {
                            let first = map
                                .keys()
                                .next()
                                .expect("non-empty branch has a first key")
                                .clone();
                            let message = match wanted {
                                Some(key) => {
                                    format!("archetype key '{key}' missing; falling back to '{first}'")
                                }
                                None => format!(
                                    "archetype tree deeper than query; descending into '{first}'"
                                ),
                            };
                            warn!("{message}");
                            resolution.fallbacks.push(message);
                            first
                        }
                    };
                    node = map.get(&chosen).expect("chosen key exists");
                    remaining = rest;
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.root)
            .context("serializing archetype lookup")?;
        fs::write(path, json)
            .with_context(|| format!("writing archetype lookup '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(param: &str, min: f64, max: f64) -> ArchetypeBlock {
        let mut block = ArchetypeBlock::default();
        block
            .params
            .insert(param.to_string(), ParameterRange::new(min, max));
        block
    }

    fn store_with_one_leaf() -> ArchetypeStore {
        let mut store = ArchetypeStore::empty();
        store.insert_leaf(
            &[
                "scenario1",
                "pre_calibration",
                "infiltration",
                "residential",
                "Corner House",
                "1992 - 2005",
            ],
            block_with("infiltration_base", 1.2, 1.4),
        );
        store
    }

    #[test]
    fn exact_path_resolves_without_fallbacks() {
        let store = store_with_one_leaf();
        let res = store.get_subsystem_block(
            "scenario1",
            CalibrationStage::PreCalibration,
            Subsystem::Infiltration,
            BuildingFunction::Residential,
            "Corner House",
            AgeRange::From1992To2005,
        );
        assert!(res.fully_resolved());
        assert_eq!(
            res.block.params["infiltration_base"],
            ParameterRange::new(1.2, 1.4)
        );
    }

    #[test]
    fn missing_keys_fall_back_to_first_available() {
        let store = store_with_one_leaf();
        let res = store.get_subsystem_block(
            "scenario9",
            CalibrationStage::PostCalibration,
            Subsystem::Infiltration,
            BuildingFunction::Residential,
            "Bungalow",
            AgeRange::Pre1945,
        );
        // Never raises; still lands on the only leaf.
        assert!(!res.fully_resolved());
        assert!(res.block.params.contains_key("infiltration_base"));
    }

    #[test]
    fn empty_store_returns_empty_block() {
        let store = ArchetypeStore::empty();
        let res = store.get_subsystem_block(
            "scenario1",
            CalibrationStage::PreCalibration,
            Subsystem::Hvac,
            BuildingFunction::Residential,
            "Corner House",
            AgeRange::Pre1945,
        );
        assert!(res.block.params.is_empty());
        assert_eq!(res.fallbacks.len(), 1);
    }

    #[test]
    fn early_leaf_wins_over_remaining_keys() {
        let mut store = ArchetypeStore::empty();
        store.insert_leaf(
            &["scenario1", "pre_calibration", "loads"],
            block_with("lighting_watts_per_m2", 8.0, 12.0),
        );
        let res = store.get_subsystem_block(
            "scenario1",
            CalibrationStage::PreCalibration,
            Subsystem::Loads,
            BuildingFunction::NonResidential,
            "Office Function",
            AgeRange::From2015,
        );
        assert!(res.fully_resolved());
        assert!(res.block.params.contains_key("lighting_watts_per_m2"));
    }

    #[test]
    fn lookup_tree_round_trips_through_json() {
        let store = store_with_one_leaf();
        let json = serde_json::to_string(&store).unwrap();
        let parsed: ArchetypeStore = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store);
    }
}
