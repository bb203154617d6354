//! Variant materialization: clone the base deck per scenario, apply edits,
//! write per-variant decks plus a manifest and the provenance exports.
//!
//! Output structure:
//!
//! ```text
//! out_dir/
//!   variant_manifest.json
//!   building_<id>_variant_<k>.idf
//!   modifications_detail_long.parquet
//!   modifications_detail_wide.parquet
//! ```

use anyhow::{Context, Result};
use besim_deck::{save_deck, Deck};
use besim_registry::ParameterRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::apply::{apply_scenario, ModificationRecord};
use crate::plan::VariantScenario;
use crate::provenance::export_modification_details;
use crate::rules::DependencyRuleEngine;

/// One materialized variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantArtifact {
    pub variant_id: usize,
    pub scenario_id: String,
    pub scenario_name: String,
    pub deck_file: String,
    pub edits_attempted: usize,
    pub edits_applied: usize,
}

/// Manifest written next to the variant decks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantManifest {
    pub created_at: DateTime<Utc>,
    pub building_id: u64,
    pub num_variants: usize,
    pub artifacts: Vec<VariantArtifact>,
}

/// Everything variant generation produced.
#[derive(Debug)]
pub struct VariantGeneration {
    pub artifacts: Vec<VariantArtifact>,
    pub records: Vec<ModificationRecord>,
    pub manifest_path: PathBuf,
}

/// Materialize variants for one building.
///
/// With `include_baseline`, variant 0 is the unmodified base deck and
/// scenario k becomes variant k+1; otherwise variant ids begin at 1 and
/// variant 0 is implied. A scenario whose edits conflict fails its variant
/// and is skipped; the remaining variants still materialize.
pub fn generate_variants(
    base: &Deck,
    scenarios: &[VariantScenario],
    building_id: u64,
    out_dir: &Path,
    registry: &ParameterRegistry,
    rules: &DependencyRuleEngine,
    include_baseline: bool,
) -> Result<VariantGeneration> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating variant directory '{}'", out_dir.display()))?;

    let mut artifacts = Vec::new();
    let mut records: Vec<ModificationRecord> = Vec::new();

    if include_baseline {
        let deck_file = deck_file_name(out_dir, building_id, 0);
        save_deck(base, &deck_file)?;
        artifacts.push(VariantArtifact {
            variant_id: 0,
            scenario_id: "baseline".into(),
            scenario_name: "Baseline".into(),
            deck_file: deck_file.display().to_string(),
            edits_attempted: 0,
            edits_applied: 0,
        });
    }

    for (index, scenario) in scenarios.iter().enumerate() {
        let variant_id = index + 1;
        let mut deck = base.clone();
        let variant_records = match apply_scenario(
            &mut deck,
            scenario,
            registry,
            rules,
            building_id,
            variant_id,
        ) {
            Ok(variant_records) => variant_records,
            Err(err) => {
                // Conflicting modifications abort this variant only.
                tracing::error!(
                    "variant {variant_id} ('{}') failed validation: {err}",
                    scenario.id
                );
                continue;
            }
        };
        let deck_file = deck_file_name(out_dir, building_id, variant_id);
        save_deck(&deck, &deck_file)?;
        let applied = variant_records.iter().filter(|r| r.success).count();
        info!(
            "variant {variant_id} ('{}'): {applied}/{} edits applied",
            scenario.id,
            variant_records.len()
        );
        artifacts.push(VariantArtifact {
            variant_id,
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            deck_file: deck_file.display().to_string(),
            edits_attempted: variant_records.len(),
            edits_applied: applied,
        });
        records.extend(variant_records);
    }

    let manifest = VariantManifest {
        created_at: Utc::now(),
        building_id,
        num_variants: artifacts.len(),
        artifacts: artifacts.clone(),
    };
    let manifest_path = out_dir.join("variant_manifest.json");
    write_manifest(&manifest_path, &manifest)?;

    if !records.is_empty() {
        export_modification_details(&records, out_dir)?;
    }

    Ok(VariantGeneration {
        artifacts,
        records,
        manifest_path,
    })
}

fn deck_file_name(out_dir: &Path, building_id: u64, variant_id: usize) -> PathBuf {
    out_dir.join(format!("building_{building_id}_variant_{variant_id}.idf"))
}

pub fn write_manifest(path: &Path, manifest: &VariantManifest) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("creating variant manifest '{}'", path.display()))?;
    serde_json::to_writer_pretty(file, manifest)
        .with_context(|| format!("writing variant manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_manifest(path: &Path) -> Result<VariantManifest> {
    let file = File::open(path)
        .with_context(|| format!("opening variant manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing variant manifest '{}'", path.display()))
}
