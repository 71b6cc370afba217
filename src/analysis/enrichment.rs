//! Hypergeometric enrichment testing of neighborhood patterns
//!
//! For a pattern `P` around center type `T`, the population is every
//! qualifying neighborhood of every cell (the background), the marked items
//! are background neighborhoods containing `P`, and the draws are the
//! neighborhoods centered on `T`. Observing more `T` neighborhoods with `P`
//! than this law predicts is enrichment. Regions are counted separately and
//! pooled before testing.

use crate::algorithm::cancellation::CancellationToken;
use crate::analysis::neighborhood::{LabelSet, Neighborhood};
use crate::analysis::patterns::Pattern;
use crate::io::configuration::DEFAULT_ALPHA;
use crate::io::error::{Result, computation_error, invalid_argument};
use crate::math::correction::{CorrectionMethod, adjust_p_values};
use crate::math::probability::Hypergeometric;
use crate::spatial::{Dataset, LabelId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::AddAssign;
use tracing::debug;

/// Direction of the hypothesis test
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Alternative {
    /// Over-representation: P(X >= observed)
    #[default]
    Greater,
    /// Depletion: P(X <= observed)
    Less,
    /// Both tails: outcomes no more likely than the observed one
    #[serde(alias = "two-sided")]
    TwoSided,
}

/// Caller-selectable testing policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentOptions {
    /// Test direction
    pub alternative: Alternative,
    /// Multiple-testing correction across the tested patterns
    pub correction: CorrectionMethod,
    /// Significance level applied to corrected p-values
    pub alpha: f64,
    /// Attach contributing center and neighbor identifiers
    pub return_cell_ids: bool,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            alternative: Alternative::default(),
            correction: CorrectionMethod::default(),
            alpha: DEFAULT_ALPHA,
            return_cell_ids: false,
        }
    }
}

impl EnrichmentOptions {
    /// Check the significance level
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error unless `alpha` lies in (0, 1)
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(invalid_argument("alpha", &self.alpha, &"must lie in (0, 1)"));
        }
        Ok(())
    }
}

/// Contingency counts for one pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotifCounts {
    /// Center neighborhoods containing the pattern
    pub observed: usize,
    /// Center neighborhoods
    pub n_center: usize,
    /// Background neighborhoods containing the pattern
    pub n_motif: usize,
    /// Background neighborhoods
    pub population: usize,
}

impl AddAssign for MotifCounts {
    fn add_assign(&mut self, other: Self) {
        self.observed += other.observed;
        self.n_center += other.n_center;
        self.n_motif += other.n_motif;
        self.population += other.population;
    }
}

impl MotifCounts {
    /// Count one region's neighborhoods for `pattern`
    pub fn tally(sample: &RegionSample<'_>, pattern: &[LabelId]) -> Self {
        Self {
            observed: sample
                .centers
                .iter()
                .filter(|neighborhood| neighborhood.contains_all(pattern))
                .count(),
            n_center: sample.centers.len(),
            n_motif: sample
                .background
                .iter()
                .filter(|neighborhood| neighborhood.contains_all(pattern))
                .count(),
            population: sample.background.len(),
        }
    }

    /// Expected observed count under the null
    pub fn expected(&self) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        self.n_center as f64 * self.n_motif as f64 / self.population as f64
    }
}

/// Neighborhoods of one region: those around centers and the background
#[derive(Debug, Clone)]
pub struct RegionSample<'a> {
    /// Qualifying neighborhoods around center cells
    pub centers: Vec<&'a LabelSet>,
    /// Qualifying neighborhoods around every cell of the region
    pub background: &'a [LabelSet],
}

/// Test outcome for one pattern
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentRecord {
    /// Center cell type
    pub center: String,
    /// Pattern labels, lexicographic
    pub pattern: Vec<String>,
    /// Center neighborhoods containing the pattern
    pub observed: usize,
    /// Center neighborhoods tested
    pub n_center: usize,
    /// Background neighborhoods containing the pattern
    pub n_motif: usize,
    /// Background neighborhoods
    pub population: usize,
    /// Expected observed count under the null
    pub expected: f64,
    /// Raw p-value
    pub p_value: f64,
    /// p-value after multiple-testing correction
    pub corrected_p_value: f64,
    /// Whether the corrected p-value is below alpha
    pub significant: bool,
    /// Identifiers of centers whose neighborhood contains the pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_ids: Option<Vec<String>>,
    /// Identifiers of pattern-labelled neighbors around those centers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbor_ids: Option<Vec<String>>,
}

/// Runs the enrichment test for a family of candidate patterns
#[derive(Debug, Clone)]
pub struct EnrichmentTester<'a> {
    dataset: &'a Dataset,
    options: EnrichmentOptions,
    details: &'a [Neighborhood],
}

impl<'a> EnrichmentTester<'a> {
    /// Create a tester over `dataset`
    pub const fn new(dataset: &'a Dataset, options: EnrichmentOptions) -> Self {
        Self {
            dataset,
            options,
            details: &[],
        }
    }

    /// Full center neighborhoods read when cell ids are returned
    #[must_use]
    pub const fn with_details(mut self, details: &'a [Neighborhood]) -> Self {
        self.details = details;
        self
    }

    /// Test every candidate and return records sorted by p-value
    ///
    /// # Errors
    ///
    /// Returns a computation error if candidates exist but no background
    /// neighborhood qualifies, and a cancellation error if `cancel` fires
    pub fn evaluate(
        &self,
        center: LabelId,
        candidates: &[Pattern],
        samples: &[RegionSample<'_>],
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichmentRecord>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let tested = candidates
            .par_iter()
            .map(|pattern| {
                cancel.check("enrichment test")?;
                let mut counts = MotifCounts::default();
                for sample in samples {
                    counts += MotifCounts::tally(sample, pattern.labels());
                }
                let p_value = self.p_value(&counts)?;
                Ok((counts, p_value))
            })
            .collect::<Result<Vec<_>>>()?;

        let raw: Vec<f64> = tested.iter().map(|(_, p_value)| *p_value).collect();
        let corrected = adjust_p_values(&raw, self.options.correction);
        let center_name = self
            .dataset
            .label_name(center)
            .unwrap_or_default()
            .to_string();

        let mut records: Vec<EnrichmentRecord> = candidates
            .iter()
            .zip(tested)
            .zip(corrected)
            .map(|((pattern, (counts, p_value)), corrected_p_value)| {
                let (cell_ids, neighbor_ids) = if self.options.return_cell_ids {
                    let (cells, neighbors) = self.contributors(pattern);
                    (Some(cells), Some(neighbors))
                } else {
                    (None, None)
                };
                EnrichmentRecord {
                    center: center_name.clone(),
                    pattern: pattern.names(self.dataset),
                    observed: counts.observed,
                    n_center: counts.n_center,
                    n_motif: counts.n_motif,
                    population: counts.population,
                    expected: counts.expected(),
                    p_value,
                    corrected_p_value,
                    significant: corrected_p_value < self.options.alpha,
                    cell_ids,
                    neighbor_ids,
                }
            })
            .collect();

        records.sort_by(|left, right| {
            left.p_value
                .total_cmp(&right.p_value)
                .then_with(|| left.pattern.len().cmp(&right.pattern.len()))
                .then_with(|| left.pattern.cmp(&right.pattern))
        });

        debug!(
            center = %center_name,
            candidates = records.len(),
            significant = records.iter().filter(|record| record.significant).count(),
            "enrichment evaluated"
        );
        Ok(records)
    }

    fn p_value(&self, counts: &MotifCounts) -> Result<f64> {
        if counts.population == 0 {
            return Err(computation_error(
                "enrichment test",
                &"no background neighborhood qualifies",
            ));
        }
        let law = Hypergeometric::new(counts.population, counts.n_motif, counts.n_center)?;
        Ok(match self.options.alternative {
            Alternative::Greater => law.at_least(counts.observed),
            Alternative::Less => law.cdf(counts.observed),
            Alternative::TwoSided => law.two_sided(counts.observed),
        })
    }

    /// Center ids and pattern-labelled neighbor ids, both in dataset order
    fn contributors(&self, pattern: &Pattern) -> (Vec<String>, Vec<String>) {
        let mut centers = BTreeSet::new();
        let mut neighbors = BTreeSet::new();
        for neighborhood in self
            .details
            .iter()
            .filter(|neighborhood| neighborhood.contains_all(pattern.labels()))
        {
            centers.insert(neighborhood.center);
            neighbors.extend(neighborhood.neighbors.iter().copied().filter(|&row| {
                self.dataset
                    .label_of(row)
                    .is_some_and(|label| pattern.labels().binary_search(&label).is_ok())
            }));
        }

        let to_ids = |rows: BTreeSet<usize>| -> Vec<String> {
            rows.into_iter()
                .filter_map(|row| self.dataset.cell_id(row))
                .map(str::to_string)
                .collect()
        };
        (to_ids(centers), to_ids(neighbors))
    }
}
