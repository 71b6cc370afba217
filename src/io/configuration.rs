//! Engine constants and runtime configuration defaults

// Neighborhood defaults mirror the public query API
/// Default number of nearest neighbors per center cell
pub const DEFAULT_K: usize = 30;
/// Default minimum support for a frequent pattern
pub const DEFAULT_MIN_SUPPORT: f64 = 0.5;

/// Default radius for radius-based pattern mining
pub const DEFAULT_FP_MAX_DIST: f64 = 100.0;
/// Default distance cut-off applied to KNN neighborhoods during enrichment
pub const DEFAULT_KNN_ENRICH_MAX_DIST: f64 = 200.0;
/// Default radius for radius-based enrichment
pub const DEFAULT_DIST_ENRICH_MAX_DIST: f64 = 100.0;
/// Default minimum neighborhood size (0 keeps empty neighborhoods)
pub const DEFAULT_MIN_SIZE: usize = 0;
/// Default cap on radius neighborhood size during enrichment
pub const DEFAULT_MAX_NS: usize = 100;

// Index construction
/// Maximum number of points stored in a kd-tree leaf
pub const DEFAULT_LEAF_SIZE: usize = 10;
/// Largest radius a query may use before it is clamped
pub const DEFAULT_MAX_RADIUS: f64 = 500.0;

/// Dataset name used when none is supplied
pub const DEFAULT_DATASET_NAME: &str = "ST";
/// Region assigned to cells of single-region datasets
pub const DEFAULT_REGION: &str = "default";
/// Largest number of distinct cell types a dataset may carry
pub const MAX_CELL_TYPES: usize = 1 << 16;

/// Significance level applied to corrected p-values
pub const DEFAULT_ALPHA: f64 = 0.05;

// Bounded so repeated enrichment calls don't pin every parameter combination
/// Number of background neighborhood sets kept per engine
pub const NEIGHBORHOOD_CACHE_CAPACITY: usize = 8;
/// Total bytes of background neighborhoods kept per engine
pub const NEIGHBORHOOD_CACHE_BUDGET: usize = 256 * 1024 * 1024;

/// Background cells processed between cancellation checks
pub const CANCELLATION_CHECK_INTERVAL: usize = 1024;

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;
