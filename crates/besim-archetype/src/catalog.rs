//! Building-catalog input: the tabular file that seeds a run.
//!
//! Required columns: `building_id, building_function, building_sub_type,
//! age_range, floor_area`. Optional geometry hints and a per-building
//! weather path are picked up when present. Unknown age ranges normalize to
//! the newest band; unknown sub-types stay verbatim (the lookup falls back
//! to `other_res`/`other_nonres` at query time).

use anyhow::{bail, Context, Result};
use besim_core::{AgeRange, Building, BuildingFunction, GeometryHints};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One catalog row: the building plus its optional weather path.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub building: Building,
    pub weather_file: Option<PathBuf>,
}

/// Load a building catalog from CSV.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening building catalog '{}'", path.display()))?;
    let headers = reader.headers().context("reading catalog header")?.clone();
    let column = |name: &str| -> Option<usize> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    };

    let building_id = column("building_id")
        .context("catalog is missing the building_id column")?;
    let function = column("building_function")
        .context("catalog is missing the building_function column")?;
    let sub_type = column("building_sub_type")
        .context("catalog is missing the building_sub_type column")?;
    let age_range = column("age_range").context("catalog is missing the age_range column")?;
    let floor_area = column("floor_area")
        .context("catalog is missing the floor_area column")?;
    let orientation = column("orientation_deg");
    let num_floors = column("num_floors");
    let perimeter_depth = column("perimeter_depth_m");
    let weather = column("weather_file");

    let mut rows = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading catalog row {}", line + 2))?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let id: u64 = field(building_id)
            .parse()
            .with_context(|| format!("bad building_id '{}' on row {}", field(building_id), line + 2))?;
        if !seen.insert(id) {
            bail!("duplicate building_id {id} in catalog");
        }
        let function: BuildingFunction = field(function)
            .parse()
            .with_context(|| format!("bad building_function on row {}", line + 2))?;
        let area: f64 = field(floor_area)
            .parse()
            .with_context(|| format!("bad floor_area on row {}", line + 2))?;
        if area <= 0.0 {
            warn!("building {id} has non-positive floor area {area}");
        }
        let age_label = field(age_range);
        let age = AgeRange::normalize(age_label);
        if age.as_str() != age_label.trim() {
            warn!("building {id}: unknown age range '{age_label}', using '{age}'");
        }

        let parse_optional = |idx: Option<usize>| -> Option<f64> {
            idx.and_then(|idx| record.get(idx))
                .filter(|value| !value.is_empty())
                .and_then(|value| value.parse().ok())
        };
        let geometry = GeometryHints {
            orientation_deg: parse_optional(orientation),
            num_floors: parse_optional(num_floors).map(|value| value as u32),
            perimeter_depth_m: parse_optional(perimeter_depth),
        };
        let geometry = if geometry == GeometryHints::default() {
            None
        } else {
            Some(geometry)
        };

        rows.push(CatalogRow {
            building: Building {
                building_id: id,
                building_function: function,
                building_sub_type: field(sub_type).to_string(),
                age_range: age,
                floor_area: area,
                geometry,
            },
            weather_file: weather
                .and_then(|idx| record.get(idx))
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        });
    }
    if rows.is_empty() {
        bail!("building catalog '{}' has no rows", path.display());
    }
    Ok(rows)
}
