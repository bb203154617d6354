//! Aggregation-method resolution and variable selection.
//!
//! Method priority: exact variable-name match, then the first matching
//! substring pattern in declaration order, then the default. The built-in
//! pattern table keys energy-like variables to `sum`, state-like quantities
//! to `mean`, peaks to `max`/`min`, and discrete status channels to `last`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Sum,
    Mean,
    Max,
    Min,
    Last,
}

impl AggregationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Sum => "sum",
            AggregationMethod::Mean => "mean",
            AggregationMethod::Max => "max",
            AggregationMethod::Min => "min",
            AggregationMethod::Last => "last",
        }
    }

    /// Reduce a slice of values. NaNs are dropped first; an all-NaN input
    /// reduces to NaN.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        let clean: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if clean.is_empty() {
            return f64::NAN;
        }
        match self {
            AggregationMethod::Sum => clean.iter().sum(),
            AggregationMethod::Mean => clean.iter().sum::<f64>() / clean.len() as f64,
            AggregationMethod::Max => clean.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationMethod::Min => clean.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationMethod::Last => *clean.last().expect("non-empty"),
        }
    }
}

/// The rule table: exact matches, ordered patterns, and a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationRules {
    #[serde(default)]
    pub by_variable: BTreeMap<String, AggregationMethod>,
    /// Case-insensitive substring patterns, first match wins.
    #[serde(default)]
    pub by_pattern: Vec<(String, AggregationMethod)>,
    pub default_method: AggregationMethod,
}

impl Default for AggregationRules {
    fn default() -> Self {
        DEFAULT_RULES.clone()
    }
}

static DEFAULT_RULES: Lazy<AggregationRules> = Lazy::new(|| {
    let patterns = [
        ("Energy", AggregationMethod::Sum),
        ("Consumption", AggregationMethod::Sum),
        ("Total", AggregationMethod::Sum),
        ("Volume", AggregationMethod::Sum),
        ("Temperature", AggregationMethod::Mean),
        ("Rate", AggregationMethod::Mean),
        ("Power", AggregationMethod::Mean),
        ("Humidity", AggregationMethod::Mean),
        ("Pressure", AggregationMethod::Mean),
        ("Setpoint", AggregationMethod::Mean),
        ("Fraction", AggregationMethod::Mean),
        ("Coefficient", AggregationMethod::Mean),
        ("Peak", AggregationMethod::Max),
        ("Maximum", AggregationMethod::Max),
        ("Minimum", AggregationMethod::Min),
        ("Status", AggregationMethod::Last),
        ("Mode", AggregationMethod::Last),
        ("State", AggregationMethod::Last),
    ];
    AggregationRules {
        by_variable: BTreeMap::new(),
        by_pattern: patterns
            .into_iter()
            .map(|(p, m)| (p.to_string(), m))
            .collect(),
        default_method: AggregationMethod::Mean,
    }
});

impl AggregationRules {
    /// Resolve the method for a variable name.
    pub fn method_for(&self, variable_name: &str) -> AggregationMethod {
        if let Some(method) = self.by_variable.get(variable_name) {
            return *method;
        }
        let lower = variable_name.to_ascii_lowercase();
        for (pattern, method) in &self.by_pattern {
            if lower.contains(&pattern.to_ascii_lowercase()) {
                return *method;
            }
        }
        self.default_method
    }
}

/// Include/exclude filter over variable names, with `*` globs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableSelection {
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    All,
    Include,
    Exclude,
}

impl VariableSelection {
    pub fn should_process(&self, variable_name: &str) -> bool {
        match self.mode {
            SelectionMode::All => true,
            SelectionMode::Include => self.matches(variable_name),
            SelectionMode::Exclude => !self.matches(variable_name),
        }
    }

    fn matches(&self, variable_name: &str) -> bool {
        if self.variables.iter().any(|v| v == variable_name) {
            return true;
        }
        self.patterns
            .iter()
            .any(|pattern| glob_matches(pattern, variable_name))
    }
}

/// Minimal case-insensitive `*` glob.
fn glob_matches(pattern: &str, value: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let value = value.to_ascii_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == value;
    }
    let mut position = 0usize;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match value[position..].find(part) {
            Some(found) => {
                let absolute = position + found;
                if i == 0 && absolute != 0 {
                    return false;
                }
                position = absolute + part.len();
            }
            None => return false,
        }
    }
    if let Some(last) = parts.last() {
        if !last.is_empty() && !value.ends_with(last) {
            return false;
        }
    }
    true
}
