//! Multiple-testing correction for families of enrichment p-values

use serde::{Deserialize, Serialize};

/// Procedure used to adjust p-values when several patterns are tested together
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionMethod {
    /// Report raw p-values unchanged
    #[default]
    None,
    /// Multiply by the family size (family-wise error rate)
    Bonferroni,
    /// Holm step-down procedure (family-wise error rate, uniformly more powerful)
    Holm,
    /// Benjamini-Hochberg step-up procedure (false discovery rate)
    #[serde(alias = "fdr_bh", alias = "bh")]
    BenjaminiHochberg,
}

/// Adjust a family of p-values, preserving input order
///
/// Ties keep their input order when ranking, so the adjustment is deterministic.
pub fn adjust_p_values(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }

    match method {
        CorrectionMethod::None => p_values.to_vec(),
        CorrectionMethod::Bonferroni => p_values
            .iter()
            .map(|&p| (p * m as f64).min(1.0))
            .collect(),
        CorrectionMethod::Holm => holm(p_values),
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(p_values),
    }
}

fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        let pa = p_values.get(a).copied().unwrap_or(1.0);
        let pb = p_values.get(b).copied().unwrap_or(1.0);
        pa.total_cmp(&pb)
    });
    order
}

fn holm(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut adjusted = vec![1.0; m];
    let mut running_max: f64 = 0.0;

    for (rank, &index) in ascending_order(p_values).iter().enumerate() {
        let p = p_values.get(index).copied().unwrap_or(1.0);
        let scaled = (p * (m - rank) as f64).min(1.0);
        running_max = running_max.max(scaled);
        if let Some(slot) = adjusted.get_mut(index) {
            *slot = running_max;
        }
    }

    adjusted
}

fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    let mut adjusted = vec![1.0; m];
    let mut running_min: f64 = 1.0;

    // Step-up: walk from the largest p-value down, keeping adjusted values monotone
    for (rank, &index) in ascending_order(p_values).iter().enumerate().rev() {
        let p = p_values.get(index).copied().unwrap_or(1.0);
        let scaled = p * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        if let Some(slot) = adjusted.get_mut(index) {
            *slot = running_min;
        }
    }

    adjusted
}
