//! Sampling plans for parametric variant generation.
//!
//! Four methods over a list of parameter ranges: plain uniform draws,
//! Latin-hypercube (stratified per dimension, strata shuffled
//! independently), a base-2 digital Sobol sequence, and a three-level full
//! factorial (min/mid/max) down-sampled when the grid exceeds the request.
//! Discrete parameter values are indexed through the unit sample.

use anyhow::{bail, Result};
use besim_core::ParameterRange;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One dimension of a sampling plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledParameter {
    /// Canonical registry key (`category*OBJECT_TYPE*field`).
    pub key: String,
    pub range: ParameterRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrete_values: Option<Vec<f64>>,
}

impl SampledParameter {
    fn value_at(&self, unit: f64) -> f64 {
        match &self.discrete_values {
            Some(values) if !values.is_empty() => {
                let idx = ((unit * values.len() as f64) as usize).min(values.len() - 1);
                values[idx]
            }
            _ => self.range.min + unit * self.range.width(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    Uniform,
    LatinHypercube,
    Sobol,
    Factorial,
}

/// Generate `n_samples` rows, one value per parameter per row.
pub fn sample(
    parameters: &[SampledParameter],
    n_samples: usize,
    method: SamplingMethod,
    rng: &mut StdRng,
) -> Result<Vec<Vec<f64>>> {
    if parameters.is_empty() {
        bail!("sampling plan has no parameters");
    }
    if n_samples == 0 {
        bail!("sampling plan requests zero samples");
    }
    let unit_rows = match method {
        SamplingMethod::Uniform => uniform_unit(parameters.len(), n_samples, rng),
        SamplingMethod::LatinHypercube => latin_hypercube_unit(parameters.len(), n_samples, rng),
        SamplingMethod::Sobol => sobol_unit(parameters.len(), n_samples)?,
        SamplingMethod::Factorial => {
            return Ok(factorial(parameters, n_samples, rng));
        }
    };
    Ok(unit_rows
        .into_iter()
        .map(|row| {
            row.iter()
                .zip(parameters)
                .map(|(unit, param)| param.value_at(*unit))
                .collect()
        })
        .collect())
}

fn uniform_unit(dims: usize, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    (0..n)
        .map(|_| (0..dims).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

/// One stratum per sample per dimension, with independent shuffles, so each
/// marginal is evenly covered.
fn latin_hypercube_unit(dims: usize, n: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(dims);
    for _ in 0..dims {
        let mut strata: Vec<f64> = (0..n)
            .map(|i| (i as f64 + rng.gen::<f64>()) / n as f64)
            .collect();
        strata.shuffle(rng);
        columns.push(strata);
    }
    (0..n)
        .map(|row| columns.iter().map(|col| col[row]).collect())
        .collect()
}

/// Direction numbers for the first eight Sobol dimensions (Joe-Kuo order).
/// Dimension 1 is the van der Corput sequence in base 2.
const SOBOL_POLYS: [(u32, &[u32]); 7] = [
    (0b11, &[1]),
    (0b111, &[1, 3]),
    (0b1011, &[1, 3, 1]),
    (0b1101, &[1, 1, 1]),
    (0b10011, &[1, 1, 3, 3]),
    (0b11001, &[1, 3, 5, 13]),
    (0b100101, &[1, 1, 5, 5, 17]),
];

const SOBOL_BITS: usize = 31;

fn sobol_direction_numbers(dim: usize) -> Vec<u64> {
    let mut v = vec![0u64; SOBOL_BITS];
    if dim == 0 {
        for (i, slot) in v.iter_mut().enumerate() {
            *slot = 1u64 << (SOBOL_BITS - 1 - i);
        }
        return v;
    }
    let (poly, m_init) = SOBOL_POLYS[(dim - 1) % SOBOL_POLYS.len()];
    let degree = (32 - poly.leading_zeros() - 1) as usize;
    for (i, m) in m_init.iter().enumerate() {
        v[i] = (*m as u64) << (SOBOL_BITS - 1 - i);
    }
    for i in degree..SOBOL_BITS {
        let mut value = v[i - degree] >> degree;
        value ^= v[i - degree];
        for k in 1..degree {
            if (poly >> (degree - k)) & 1 == 1 {
                value ^= v[i - k];
            }
        }
        v[i] = value;
    }
    v
}

/// Gray-code Sobol points in the unit cube. The sequence is deterministic;
/// callers wanting variation scramble through the sample count.
fn sobol_unit(dims: usize, n: usize) -> Result<Vec<Vec<f64>>> {
    if dims > SOBOL_POLYS.len() + 1 {
        bail!(
            "sobol sampling supports up to {} dimensions, got {dims}",
            SOBOL_POLYS.len() + 1
        );
    }
    let directions: Vec<Vec<u64>> = (0..dims).map(sobol_direction_numbers).collect();
    let mut state = vec![0u64; dims];
    let mut rows = Vec::with_capacity(n);
    let scale = (1u64 << SOBOL_BITS) as f64;
    for index in 0..n {
        if index > 0 {
            let bit = (index as u64).trailing_zeros() as usize;
            for (dim, value) in state.iter_mut().enumerate() {
                *value ^= directions[dim][bit];
            }
        }
        rows.push(state.iter().map(|value| *value as f64 / scale).collect());
    }
    Ok(rows)
}

/// Three levels per parameter; random down-sample past `n_samples`, repeat
/// to fill when the grid is smaller.
fn factorial(parameters: &[SampledParameter], n_samples: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let levels: Vec<Vec<f64>> = parameters
        .iter()
        .map(|param| match &param.discrete_values {
            Some(values) if values.len() <= 3 && !values.is_empty() => values.clone(),
            Some(values) => vec![values[0], values[values.len() / 2], values[values.len() - 1]],
            None => vec![
                param.range.min,
                param.range.midpoint(),
                param.range.max,
            ],
        })
        .collect();

    let mut combinations: Vec<Vec<f64>> = vec![vec![]];
    for level_set in &levels {
        let mut next = Vec::with_capacity(combinations.len() * level_set.len());
        for combo in &combinations {
            for level in level_set {
                let mut extended = combo.clone();
                extended.push(*level);
                next.push(extended);
            }
        }
        combinations = next;
    }

    if combinations.len() > n_samples {
        combinations.shuffle(rng);
        combinations.truncate(n_samples);
    } else {
        let base = combinations.clone();
        while combinations.len() < n_samples {
            let take = (n_samples - combinations.len()).min(base.len());
            combinations.extend_from_slice(&base[..take]);
        }
    }
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(n: usize) -> Vec<SampledParameter> {
        (0..n)
            .map(|i| SampledParameter {
                key: format!("cat*OBJ*Field_{i}"),
                range: ParameterRange::new(0.0, 10.0),
                discrete_values: None,
            })
            .collect()
    }

    #[test]
    fn all_methods_stay_in_bounds() {
        let parameters = params(3);
        let mut rng = StdRng::seed_from_u64(5);
        for method in [
            SamplingMethod::Uniform,
            SamplingMethod::LatinHypercube,
            SamplingMethod::Sobol,
            SamplingMethod::Factorial,
        ] {
            let rows = sample(&parameters, 16, method, &mut rng).unwrap();
            assert_eq!(rows.len(), 16);
            for row in rows {
                assert_eq!(row.len(), 3);
                for value in row {
                    assert!((0.0..=10.0).contains(&value), "{method:?} produced {value}");
                }
            }
        }
    }

    #[test]
    fn latin_hypercube_covers_each_stratum_once() {
        let parameters = params(2);
        let mut rng = StdRng::seed_from_u64(7);
        let rows = sample(&parameters, 10, SamplingMethod::LatinHypercube, &mut rng).unwrap();
        for dim in 0..2 {
            let mut strata: Vec<usize> = rows
                .iter()
                .map(|row| ((row[dim] / 10.0) * 10.0).floor() as usize)
                .collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn sobol_is_deterministic_and_distinct() {
        let parameters = params(4);
        let mut rng = StdRng::seed_from_u64(1);
        let a = sample(&parameters, 8, SamplingMethod::Sobol, &mut rng).unwrap();
        let b = sample(&parameters, 8, SamplingMethod::Sobol, &mut rng).unwrap();
        assert_eq!(a, b);
        // first point is the origin-mapped min, rest are distinct
        assert!(a.iter().skip(1).all(|row| row != &a[0]));
    }

    #[test]
    fn factorial_grid_for_two_params_is_nine_points() {
        let parameters = params(2);
        let mut rng = StdRng::seed_from_u64(3);
        let rows = sample(&parameters, 9, SamplingMethod::Factorial, &mut rng).unwrap();
        assert_eq!(rows.len(), 9);
        let mut unique = rows.clone();
        unique.sort_by(|a, b| a.partial_cmp(b).unwrap());
        unique.dedup();
        assert_eq!(unique.len(), 9);
        assert!(rows.iter().any(|row| row == &vec![0.0, 0.0]));
        assert!(rows.iter().any(|row| row == &vec![5.0, 10.0]));
    }

    #[test]
    fn discrete_values_index_through_unit_sample() {
        let parameters = vec![SampledParameter {
            key: "hvac*COIL*COP".into(),
            range: ParameterRange::new(0.0, 1.0),
            discrete_values: Some(vec![2.0, 3.0, 4.0]),
        }];
        let mut rng = StdRng::seed_from_u64(11);
        let rows = sample(&parameters, 30, SamplingMethod::Uniform, &mut rng).unwrap();
        for row in rows {
            assert!([2.0, 3.0, 4.0].contains(&row[0]));
        }
    }

    #[test]
    fn sobol_dimension_limit_is_enforced() {
        let parameters = params(20);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample(&parameters, 4, SamplingMethod::Sobol, &mut rng).is_err());
    }
}
