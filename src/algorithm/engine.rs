//! Per-dataset motif mining engine
//!
//! An engine owns one validated dataset with its region indices and answers
//! frequent-pattern and enrichment requests against it. The dataset is never
//! mutated after construction; the only interior state is a memo cache of
//! background neighborhoods, filled after a computation succeeds.

use crate::algorithm::cache::{Background, CacheStats, NeighborhoodCache, NeighborhoodKey, footprint};
use crate::algorithm::cancellation::CancellationToken;
use crate::analysis::enrichment::{EnrichmentOptions, EnrichmentRecord, EnrichmentTester, RegionSample};
use crate::analysis::neighborhood::{
    Neighborhood, NeighborhoodQuery, extract_background, extract_dataset,
};
use crate::analysis::patterns::{Motif, Pattern, PatternMiner};
use crate::analysis::statistics::Transactions;
use crate::io::configuration::{
    DEFAULT_DATASET_NAME, NEIGHBORHOOD_CACHE_BUDGET, NEIGHBORHOOD_CACHE_CAPACITY,
};
use crate::io::error::{Result, invalid_argument, not_found};
use crate::spatial::{CellRecord, Dataset, LabelId, SpatialParams};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A frequent pattern reported by label names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSupport {
    /// Pattern labels, lexicographic
    pub pattern: Vec<String>,
    /// Fraction of center neighborhoods containing the pattern
    pub support: f64,
}

/// Motif mining engine bound to one dataset
#[derive(Debug)]
pub struct MotifEngine {
    dataset: Dataset,
    cache: Mutex<NeighborhoodCache>,
}

impl MotifEngine {
    /// Validate raw cells and build an engine named after the default dataset
    ///
    /// # Errors
    ///
    /// Returns an invalid input error for malformed cells and an invalid
    /// argument error for out-of-domain spatial parameters
    pub fn create_engine(
        cells: Vec<CellRecord>,
        regions: Option<Vec<String>>,
        params: SpatialParams,
    ) -> Result<Self> {
        Self::create_named(DEFAULT_DATASET_NAME, cells, regions, params)
    }

    /// Validate raw cells and build an engine for a named dataset
    ///
    /// # Errors
    ///
    /// Same as [`MotifEngine::create_engine`]
    pub fn create_named(
        name: &str,
        cells: Vec<CellRecord>,
        regions: Option<Vec<String>>,
        params: SpatialParams,
    ) -> Result<Self> {
        let started = Instant::now();
        let dataset = Dataset::from_records(name, cells, regions, params)?;
        info!(
            dataset = name,
            cells = dataset.len(),
            regions = dataset.regions().len(),
            cell_types = dataset.vocabulary().len(),
            elapsed_ms = started.elapsed().as_millis(),
            "engine created"
        );
        Ok(Self::new(dataset))
    }

    /// Wrap an already validated dataset
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            cache: Mutex::new(NeighborhoodCache::new(
                NEIGHBORHOOD_CACHE_CAPACITY,
                NEIGHBORHOOD_CACHE_BUDGET,
            )),
        }
    }

    /// The dataset this engine answers for
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Background neighborhood cache hit/miss counts
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats
    }

    /// Frequent neighbor patterns around the k nearest neighbors of `ct` cells
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::find_patterns`]
    pub fn find_patterns_knn(
        &self,
        ct: &str,
        k: usize,
        min_support: f64,
    ) -> Result<Vec<PatternSupport>> {
        self.find_patterns_knn_with(ct, k, min_support, &CancellationToken::new())
    }

    /// [`MotifEngine::find_patterns_knn`] with cooperative cancellation
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::find_patterns`]
    pub fn find_patterns_knn_with(
        &self,
        ct: &str,
        k: usize,
        min_support: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<PatternSupport>> {
        let query = NeighborhoodQuery::Knn { k, max_dist: None };
        self.find_patterns(ct, &query, min_support, cancel)
    }

    /// Frequent neighbor patterns within `max_dist` of `ct` cells
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::find_patterns`]
    pub fn find_patterns_radius(
        &self,
        ct: &str,
        max_dist: f64,
        min_size: usize,
        min_support: f64,
    ) -> Result<Vec<PatternSupport>> {
        self.find_patterns_radius_with(
            ct,
            max_dist,
            min_size,
            min_support,
            &CancellationToken::new(),
        )
    }

    /// [`MotifEngine::find_patterns_radius`] with cooperative cancellation
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::find_patterns`]
    pub fn find_patterns_radius_with(
        &self,
        ct: &str,
        max_dist: f64,
        min_size: usize,
        min_support: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<PatternSupport>> {
        let query = NeighborhoodQuery::Radius {
            max_dist,
            min_size,
            max_ns: None,
        };
        self.find_patterns(ct, &query, min_support, cancel)
    }

    /// Mine frequent patterns over the neighborhoods of `ct` cells
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for out-of-domain parameters or a
    /// blank `ct`, a not found error for an unknown `ct`, and a cancellation
    /// error if `cancel` fires
    pub fn find_patterns(
        &self,
        ct: &str,
        query: &NeighborhoodQuery,
        min_support: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<PatternSupport>> {
        let started = Instant::now();
        query.validate()?;
        let miner = PatternMiner::new(min_support)?;
        let center = self.resolve_center(ct)?;
        let query = query.clamped(self.dataset.params().max_radius);

        let neighborhoods = extract_dataset(&self.dataset, Some(center), &query, cancel)?;
        let partial = neighborhoods
            .iter()
            .flatten()
            .filter(|neighborhood| neighborhood.partial)
            .count();
        self.report_partial(ct, partial);
        let transactions = Transactions::from_neighborhoods(neighborhoods.iter().flatten());
        let patterns = miner.excluding(center).mine(&transactions, cancel)?;

        info!(
            dataset = self.dataset.name(),
            ct,
            transactions = transactions.len(),
            partial_neighborhoods = partial,
            patterns = patterns.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "frequent patterns found"
        );
        Ok(patterns
            .into_iter()
            .map(|found| PatternSupport {
                pattern: found.pattern.names(&self.dataset),
                support: found.support,
            })
            .collect())
    }

    /// Enrichment of patterns among the k nearest neighbors of `ct` cells
    ///
    /// Without `motifs`, candidates are the frequent patterns at
    /// `min_support`.
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::enrich`]
    pub fn enrich_knn(
        &self,
        ct: &str,
        motifs: Option<&[Motif]>,
        k: usize,
        min_support: f64,
        max_dist: Option<f64>,
        options: &EnrichmentOptions,
    ) -> Result<Vec<EnrichmentRecord>> {
        self.enrich_knn_with(
            ct,
            motifs,
            k,
            min_support,
            max_dist,
            options,
            &CancellationToken::new(),
        )
    }

    /// [`MotifEngine::enrich_knn`] with cooperative cancellation
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::enrich`]
    pub fn enrich_knn_with(
        &self,
        ct: &str,
        motifs: Option<&[Motif]>,
        k: usize,
        min_support: f64,
        max_dist: Option<f64>,
        options: &EnrichmentOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichmentRecord>> {
        let query = NeighborhoodQuery::Knn { k, max_dist };
        self.enrich(ct, motifs, &query, min_support, options, cancel)
    }

    /// Enrichment of patterns within `max_dist` of `ct` cells
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::enrich`]
    pub fn enrich_radius(
        &self,
        ct: &str,
        motifs: Option<&[Motif]>,
        max_dist: f64,
        min_size: usize,
        min_support: f64,
        max_ns: usize,
        options: &EnrichmentOptions,
    ) -> Result<Vec<EnrichmentRecord>> {
        self.enrich_radius_with(
            ct,
            motifs,
            max_dist,
            min_size,
            min_support,
            max_ns,
            options,
            &CancellationToken::new(),
        )
    }

    /// [`MotifEngine::enrich_radius`] with cooperative cancellation
    ///
    /// # Errors
    ///
    /// See [`MotifEngine::enrich`]
    pub fn enrich_radius_with(
        &self,
        ct: &str,
        motifs: Option<&[Motif]>,
        max_dist: f64,
        min_size: usize,
        min_support: f64,
        max_ns: usize,
        options: &EnrichmentOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichmentRecord>> {
        let query = NeighborhoodQuery::Radius {
            max_dist,
            min_size,
            max_ns: Some(max_ns),
        };
        self.enrich(ct, motifs, &query, min_support, options, cancel)
    }

    /// Test candidate patterns around `ct` cells for enrichment
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for out-of-domain parameters, a not
    /// found error for an unknown `ct` or motif label, a computation error for
    /// a degenerate background, and a cancellation error if `cancel` fires
    pub fn enrich(
        &self,
        ct: &str,
        motifs: Option<&[Motif]>,
        query: &NeighborhoodQuery,
        min_support: f64,
        options: &EnrichmentOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichmentRecord>> {
        let started = Instant::now();
        query.validate()?;
        let miner = PatternMiner::new(min_support)?;
        options.validate()?;
        let center = self.resolve_center(ct)?;
        let targeted = motifs.map(|list| self.resolve_motifs(list)).transpose()?;
        let query = query.clamped(self.dataset.params().max_radius);

        let background = self.background(&query, cancel)?;
        let samples: Vec<RegionSample<'_>> = background
            .iter()
            .map(|region| RegionSample {
                centers: region
                    .iter()
                    .filter(|set| self.dataset.label_of(set.center) == Some(center))
                    .collect(),
                background: region.as_slice(),
            })
            .collect();
        let partial = samples
            .iter()
            .flat_map(|sample| sample.centers.iter())
            .filter(|set| set.partial)
            .count();
        self.report_partial(ct, partial);

        let candidates = match targeted {
            Some(patterns) => patterns,
            None => {
                let transactions = Transactions::from_label_sets(
                    samples.iter().flat_map(|sample| sample.centers.iter().copied()),
                );
                miner
                    .excluding(center)
                    .mine(&transactions, cancel)?
                    .into_iter()
                    .map(|found| found.pattern)
                    .collect()
            }
        };

        // Rebuilt for the centers only; the cached background keeps no neighbor rows
        let details: Vec<Neighborhood> = if options.return_cell_ids && !candidates.is_empty() {
            extract_dataset(&self.dataset, Some(center), &query, cancel)?
                .into_iter()
                .flatten()
                .collect()
        } else {
            Vec::new()
        };
        let records = EnrichmentTester::new(&self.dataset, *options)
            .with_details(&details)
            .evaluate(center, &candidates, &samples, cancel)?;

        info!(
            dataset = self.dataset.name(),
            ct,
            candidates = candidates.len(),
            partial_neighborhoods = partial,
            significant = records.iter().filter(|record| record.significant).count(),
            elapsed_ms = started.elapsed().as_millis(),
            "enrichment finished"
        );
        Ok(records)
    }

    fn report_partial(&self, ct: &str, partial: usize) {
        if partial > 0 {
            warn!(
                dataset = self.dataset.name(),
                ct,
                partial_neighborhoods = partial,
                "fewer than k neighbors available in some regions"
            );
        }
    }

    fn resolve_center(&self, ct: &str) -> Result<LabelId> {
        if ct.trim().is_empty() {
            return Err(invalid_argument("ct", &ct, &"a center cell type is required"));
        }
        self.dataset
            .label_id(ct)
            .ok_or_else(|| not_found("cell type", &ct))
    }

    /// Resolve motifs to patterns, testing duplicates once
    fn resolve_motifs(&self, motifs: &[Motif]) -> Result<Vec<Pattern>> {
        let unique = motifs
            .iter()
            .map(|motif| motif.resolve(&self.dataset))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(unique.into_iter().collect())
    }

    /// Neighborhoods of every cell under `query`, from cache when possible
    fn background(
        &self,
        query: &NeighborhoodQuery,
        cancel: &CancellationToken,
    ) -> Result<Background> {
        let key = NeighborhoodKey::from(query);
        if let Some(cached) = self.cache.lock().get(&key) {
            debug!(dataset = self.dataset.name(), "background neighborhoods cache hit");
            return Ok(cached);
        }

        // Computed outside the lock; a cancelled extraction never reaches the cache
        let computed = Arc::new(extract_background(&self.dataset, query, cancel)?);
        let cached = self.cache.lock().insert(key, Arc::clone(&computed));
        debug!(
            dataset = self.dataset.name(),
            neighborhoods = computed.iter().map(Vec::len).sum::<usize>(),
            bytes = footprint(&computed),
            cached,
            "background neighborhoods computed"
        );
        Ok(computed)
    }
}
