//! Request and response shapes of the dataset service
//!
//! Field names and defaults follow the public JSON API. Loosely typed inputs
//! (motif strings, optional identifiers) are normalized here so the engine
//! only sees validated types.

use crate::algorithm::engine::{MotifEngine, PatternSupport};
use crate::analysis::enrichment::{Alternative, EnrichmentOptions, EnrichmentRecord};
use crate::analysis::patterns::Motif;
use crate::io::configuration::{
    DEFAULT_ALPHA, DEFAULT_DATASET_NAME, DEFAULT_DIST_ENRICH_MAX_DIST, DEFAULT_FP_MAX_DIST, DEFAULT_K,
    DEFAULT_KNN_ENRICH_MAX_DIST, DEFAULT_LEAF_SIZE, DEFAULT_MAX_NS, DEFAULT_MAX_RADIUS,
    DEFAULT_MIN_SIZE, DEFAULT_MIN_SUPPORT,
};
use crate::io::error::{ErrorKind, MotifError, Result};
use crate::math::correction::CorrectionMethod;
use crate::service::registry::{DatasetRegistry, Registration};
use crate::spatial::{CellRecord, SpatialParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

const fn default_k() -> usize {
    DEFAULT_K
}

const fn default_min_support() -> f64 {
    DEFAULT_MIN_SUPPORT
}

const fn default_fp_max_dist() -> f64 {
    DEFAULT_FP_MAX_DIST
}

const fn default_knn_enrich_max_dist() -> f64 {
    DEFAULT_KNN_ENRICH_MAX_DIST
}

const fn default_dist_enrich_max_dist() -> f64 {
    DEFAULT_DIST_ENRICH_MAX_DIST
}

const fn default_min_size() -> usize {
    DEFAULT_MIN_SIZE
}

const fn default_max_ns() -> usize {
    DEFAULT_MAX_NS
}

const fn default_leaf_size() -> usize {
    DEFAULT_LEAF_SIZE
}

const fn default_max_radius() -> f64 {
    DEFAULT_MAX_RADIUS
}

const fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_dataset_name() -> String {
    DEFAULT_DATASET_NAME.to_string()
}

/// Motifs as accepted on the wire
///
/// A comma-separated string or a list of labels is one motif; a list of label
/// lists is several motifs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MotifInput {
    /// `"B,C"`
    Text(String),
    /// `["B", "C"]`
    Labels(Vec<String>),
    /// `[["B"], ["B", "C"]]`
    Sets(Vec<Vec<String>>),
}

impl MotifInput {
    /// Normalize into motifs; `None` requests auto-discovery
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error for a motif with no labels inside a
    /// list of motifs
    pub fn normalize(self) -> Result<Option<Vec<Motif>>> {
        match self {
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => Ok(Some(vec![Motif::new(text.split(','))?])),
            Self::Labels(labels) if labels.is_empty() => Ok(None),
            Self::Labels(labels) => Ok(Some(vec![Motif::new(labels)?])),
            Self::Sets(sets) if sets.is_empty() => Ok(None),
            Self::Sets(sets) => sets
                .into_iter()
                .map(Motif::new)
                .collect::<Result<Vec<_>>>()
                .map(Some),
        }
    }
}

/// Load a dataset into the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Cells to index
    #[serde(default)]
    pub cells: Option<Vec<CellRecord>>,
    /// Optional per-cell region override
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    /// Dataset name
    #[serde(default = "default_dataset_name")]
    pub dataset: String,
    /// Kd-tree leaf size
    #[serde(default = "default_leaf_size")]
    pub leaf_size: usize,
    /// Largest query radius
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,
}

/// Remove a dataset from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
}

/// Frequent patterns among the k nearest neighbors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpKnnRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Center cell type
    #[serde(default)]
    pub ct: Option<String>,
    /// Neighbors per center
    #[serde(default = "default_k")]
    pub k: usize,
    /// Relative support threshold
    #[serde(default = "default_min_support")]
    pub min_support: f64,
}

/// Frequent patterns within a radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FpDistRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Center cell type
    #[serde(default)]
    pub ct: Option<String>,
    /// Neighborhood radius
    #[serde(default = "default_fp_max_dist")]
    pub max_dist: f64,
    /// Smallest neighborhood kept
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    /// Relative support threshold
    #[serde(default = "default_min_support")]
    pub min_support: f64,
}

/// Testing policy fields shared by both enrichment requests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestPolicy {
    /// Attach contributing cell identifiers
    #[serde(default, rename = "return_cellID", alias = "return_cell_ids")]
    pub return_cell_ids: bool,
    /// Test direction
    #[serde(default)]
    pub alternative: Alternative,
    /// Multiple-testing correction
    #[serde(default)]
    pub correction: CorrectionMethod,
    /// Significance level
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

impl Default for TestPolicy {
    fn default() -> Self {
        Self {
            return_cell_ids: false,
            alternative: Alternative::default(),
            correction: CorrectionMethod::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl From<TestPolicy> for EnrichmentOptions {
    fn from(policy: TestPolicy) -> Self {
        Self {
            alternative: policy.alternative,
            correction: policy.correction,
            alpha: policy.alpha,
            return_cell_ids: policy.return_cell_ids,
        }
    }
}

/// Enrichment over k-nearest-neighbor neighborhoods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichKnnRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Center cell type
    #[serde(default)]
    pub ct: Option<String>,
    /// Motifs to test; absent means auto-discovery
    #[serde(default)]
    pub motifs: Option<MotifInput>,
    /// Neighbors per center
    #[serde(default = "default_k")]
    pub k: usize,
    /// Relative support threshold for auto-discovery
    #[serde(default = "default_min_support")]
    pub min_support: f64,
    /// Neighbors farther than this are dropped
    #[serde(default = "default_knn_enrich_max_dist")]
    pub max_dist: f64,
    /// Testing policy
    #[serde(flatten)]
    pub policy: TestPolicy,
}

/// Enrichment over radius neighborhoods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichDistRequest {
    /// Registry key
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Center cell type
    #[serde(default)]
    pub ct: Option<String>,
    /// Motifs to test; absent means auto-discovery
    #[serde(default)]
    pub motifs: Option<MotifInput>,
    /// Neighborhood radius
    #[serde(default = "default_dist_enrich_max_dist")]
    pub max_dist: f64,
    /// Smallest neighborhood kept
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    /// Relative support threshold for auto-discovery
    #[serde(default = "default_min_support")]
    pub min_support: f64,
    /// Largest neighborhood, nearest first
    #[serde(default = "default_max_ns")]
    pub max_ns: usize,
    /// Testing policy
    #[serde(flatten)]
    pub policy: TestPolicy,
}

/// Reply to a load request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    /// Human-readable outcome
    pub message: String,
    /// Registry key
    pub dataset_id: String,
    /// Whether the id was already taken
    pub skipped: bool,
    /// Registered ids after the call
    pub available_datasets: Vec<String>,
}

/// Reply to a list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetListResponse {
    /// Registered ids
    pub available_datasets: Vec<String>,
    /// Number of registered ids
    pub count: usize,
}

/// Reply to a remove request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    /// Human-readable outcome
    pub message: String,
    /// Registered ids after the call
    pub available_datasets: Vec<String>,
}

/// Reply carrying frequent patterns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentPatternsResponse {
    /// Patterns with their support
    pub frequent_patterns: Vec<PatternSupport>,
}

/// Reply carrying enrichment records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentResponse {
    /// One record per tested pattern
    pub enrichment_results: Vec<EnrichmentRecord>,
}

/// Failure reported with a transport status code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    /// HTTP-style status code
    #[serde(skip)]
    pub status: u16,
    /// Error text
    #[serde(rename = "error")]
    pub message: String,
}

impl ServiceError {
    /// Validation failure (400)
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
        }
    }

    /// Missing resource (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: 404,
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for ServiceError {}

impl From<MotifError> for ServiceError {
    fn from(error: MotifError) -> Self {
        if error.kind() != ErrorKind::InvalidArgument && error.kind() != ErrorKind::NotFound {
            warn!(kind = error.kind().as_str(), %error, "request failed");
        }
        Self::bad_request(error.to_string())
    }
}

/// Outcome of a service call
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Request handlers over an injected registry
#[derive(Debug, Default)]
pub struct MotifService<R> {
    registry: R,
}

impl<R: DatasetRegistry> MotifService<R> {
    /// Serve requests against `registry`
    pub const fn new(registry: R) -> Self {
        Self { registry }
    }

    /// The underlying registry
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Build an engine and register it unless the id is taken
    ///
    /// # Errors
    ///
    /// 400 for a missing id or cells, or an invalid dataset
    pub fn load(&self, request: LoadRequest) -> ServiceResult<LoadResponse> {
        let dataset_id = required(request.dataset_id, "dataset_id")?;
        let Some(cells) = request.cells.filter(|cells| !cells.is_empty()) else {
            return Err(ServiceError::bad_request("Missing 'cells' parameter"));
        };

        if self.registry.contains(&dataset_id) {
            return Ok(LoadResponse {
                message: format!("Dataset '{dataset_id}' already exists. Skipping upload."),
                available_datasets: self.registry.list(),
                dataset_id,
                skipped: true,
            });
        }

        let params = SpatialParams {
            leaf_size: request.leaf_size,
            max_radius: request.max_radius,
        };
        let engine = MotifEngine::create_named(&request.dataset, cells, request.regions, params)?;
        let skipped = self.registry.register(&dataset_id, engine) == Registration::AlreadyExists;
        let message = if skipped {
            format!("Dataset '{dataset_id}' already exists. Skipping upload.")
        } else {
            "Spatial data loaded successfully".to_string()
        };
        Ok(LoadResponse {
            message,
            available_datasets: self.registry.list(),
            dataset_id,
            skipped,
        })
    }

    /// Registered dataset ids
    pub fn list(&self) -> DatasetListResponse {
        let available_datasets = self.registry.list();
        DatasetListResponse {
            count: available_datasets.len(),
            available_datasets,
        }
    }

    /// Remove a dataset
    ///
    /// # Errors
    ///
    /// 400 for a missing id, 404 for an unknown one
    pub fn remove(&self, request: RemoveRequest) -> ServiceResult<RemoveResponse> {
        let dataset_id = required(request.dataset_id, "dataset_id")?;
        if !self.registry.remove(&dataset_id) {
            return Err(ServiceError::not_found(format!(
                "Dataset '{dataset_id}' not found"
            )));
        }
        Ok(RemoveResponse {
            message: format!("Dataset '{dataset_id}' removed successfully"),
            available_datasets: self.registry.list(),
        })
    }

    /// Frequent patterns among k nearest neighbors
    ///
    /// # Errors
    ///
    /// 400 for missing or invalid parameters and unknown datasets
    pub fn find_fp_knn(&self, request: FpKnnRequest) -> ServiceResult<FrequentPatternsResponse> {
        let ct = required(request.ct, "ct")?;
        let engine = self.engine(request.dataset_id.as_deref())?;
        let frequent_patterns = engine.find_patterns_knn(&ct, request.k, request.min_support)?;
        Ok(FrequentPatternsResponse { frequent_patterns })
    }

    /// Frequent patterns within a radius
    ///
    /// # Errors
    ///
    /// 400 for missing or invalid parameters and unknown datasets
    pub fn find_fp_dist(&self, request: FpDistRequest) -> ServiceResult<FrequentPatternsResponse> {
        let ct = required(request.ct, "ct")?;
        let engine = self.engine(request.dataset_id.as_deref())?;
        let frequent_patterns = engine.find_patterns_radius(
            &ct,
            request.max_dist,
            request.min_size,
            request.min_support,
        )?;
        Ok(FrequentPatternsResponse { frequent_patterns })
    }

    /// Motif enrichment over k nearest neighbors
    ///
    /// # Errors
    ///
    /// 400 for missing or invalid parameters and unknown datasets
    pub fn motif_enrichment_knn(
        &self,
        request: EnrichKnnRequest,
    ) -> ServiceResult<EnrichmentResponse> {
        let ct = required(request.ct, "ct")?;
        let engine = self.engine(request.dataset_id.as_deref())?;
        let motifs = normalize_motifs(request.motifs)?;
        let enrichment_results = engine.enrich_knn(
            &ct,
            motifs.as_deref(),
            request.k,
            request.min_support,
            Some(request.max_dist),
            &request.policy.into(),
        )?;
        Ok(EnrichmentResponse { enrichment_results })
    }

    /// Motif enrichment within a radius
    ///
    /// # Errors
    ///
    /// 400 for missing or invalid parameters and unknown datasets
    pub fn motif_enrichment_dist(
        &self,
        request: EnrichDistRequest,
    ) -> ServiceResult<EnrichmentResponse> {
        let ct = required(request.ct, "ct")?;
        let engine = self.engine(request.dataset_id.as_deref())?;
        let motifs = normalize_motifs(request.motifs)?;
        let enrichment_results = engine.enrich_radius(
            &ct,
            motifs.as_deref(),
            request.max_dist,
            request.min_size,
            request.min_support,
            request.max_ns,
            &request.policy.into(),
        )?;
        Ok(EnrichmentResponse { enrichment_results })
    }

    fn engine(&self, dataset_id: Option<&str>) -> ServiceResult<Arc<MotifEngine>> {
        dataset_id
            .filter(|id| !id.is_empty())
            .and_then(|id| self.registry.lookup(id).ok())
            .ok_or_else(|| ServiceError::bad_request("Invalid or missing 'dataset_id' parameter"))
    }
}

fn required(value: Option<String>, field: &str) -> ServiceResult<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ServiceError::bad_request(format!("Missing '{field}' parameter")))
}

fn normalize_motifs(input: Option<MotifInput>) -> ServiceResult<Option<Vec<Motif>>> {
    Ok(input.map(MotifInput::normalize).transpose()?.flatten())
}
