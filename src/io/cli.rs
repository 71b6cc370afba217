//! Command-line interface for running motif analyses over a dataset file

use crate::algorithm::cancellation::CancellationToken;
use crate::algorithm::engine::MotifEngine;
use crate::analysis::enrichment::{Alternative, EnrichmentOptions};
use crate::analysis::patterns::Motif;
use crate::io::configuration::{
    DEFAULT_ALPHA, DEFAULT_DIST_ENRICH_MAX_DIST, DEFAULT_FP_MAX_DIST, DEFAULT_K,
    DEFAULT_KNN_ENRICH_MAX_DIST, DEFAULT_LEAF_SIZE, DEFAULT_MAX_NS, DEFAULT_MAX_RADIUS,
    DEFAULT_MIN_SIZE, DEFAULT_MIN_SUPPORT,
};
use crate::io::error::{MotifError, Result, not_found};
use crate::io::loader::load_engine;
use crate::io::progress::ProgressManager;
use crate::io::report::{CenterReport, CenterResults, Report};
use crate::math::correction::CorrectionMethod;
use crate::spatial::SpatialParams;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "spatialmotif")]
#[command(
    author,
    version,
    about = "Mine and test cell-type neighborhood motifs in spatial datasets"
)]
/// Command-line arguments for the motif analysis tool
pub struct Cli {
    /// Dataset JSON file
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Center cell types, comma separated (default: every type)
    #[arg(long, value_delimiter = ',', conflicts_with = "all_types")]
    pub ct: Vec<String>,

    /// Analyze every cell type as center
    #[arg(long)]
    pub all_types: bool,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suppress progress output and most logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase logging detail (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Kd-tree leaf size
    #[arg(long, default_value_t = DEFAULT_LEAF_SIZE)]
    pub leaf_size: usize,

    /// Largest query radius; larger distances are clamped
    #[arg(long, default_value_t = DEFAULT_MAX_RADIUS)]
    pub max_radius: f64,

    /// Abort the run after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Analysis to run
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Spatial index parameters from the flags
    pub const fn spatial_params(&self) -> SpatialParams {
        SpatialParams {
            leaf_size: self.leaf_size,
            max_radius: self.max_radius,
        }
    }
}

/// Analyses available from the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Frequent patterns among the k nearest neighbors
    FpKnn {
        /// Neighbors per center
        #[arg(short, long, default_value_t = DEFAULT_K)]
        k: usize,
        /// Relative support threshold
        #[arg(long, default_value_t = DEFAULT_MIN_SUPPORT)]
        min_support: f64,
    },
    /// Frequent patterns within a radius
    FpDist {
        /// Neighborhood radius
        #[arg(long, default_value_t = DEFAULT_FP_MAX_DIST)]
        max_dist: f64,
        /// Smallest neighborhood kept
        #[arg(long, default_value_t = DEFAULT_MIN_SIZE)]
        min_size: usize,
        /// Relative support threshold
        #[arg(long, default_value_t = DEFAULT_MIN_SUPPORT)]
        min_support: f64,
    },
    /// Motif enrichment among the k nearest neighbors
    EnrichKnn {
        /// Motif to test, comma separated; repeat for several
        #[arg(long = "motif")]
        motifs: Vec<String>,
        /// Neighbors per center
        #[arg(short, long, default_value_t = DEFAULT_K)]
        k: usize,
        /// Relative support threshold for auto-discovery
        #[arg(long, default_value_t = DEFAULT_MIN_SUPPORT)]
        min_support: f64,
        /// Neighbors farther than this are dropped
        #[arg(long, default_value_t = DEFAULT_KNN_ENRICH_MAX_DIST)]
        max_dist: f64,
        /// Testing policy
        #[command(flatten)]
        #[serde(flatten)]
        policy: PolicyArgs,
    },
    /// Motif enrichment within a radius
    EnrichDist {
        /// Motif to test, comma separated; repeat for several
        #[arg(long = "motif")]
        motifs: Vec<String>,
        /// Neighborhood radius
        #[arg(long, default_value_t = DEFAULT_DIST_ENRICH_MAX_DIST)]
        max_dist: f64,
        /// Smallest neighborhood kept
        #[arg(long, default_value_t = DEFAULT_MIN_SIZE)]
        min_size: usize,
        /// Relative support threshold for auto-discovery
        #[arg(long, default_value_t = DEFAULT_MIN_SUPPORT)]
        min_support: f64,
        /// Largest neighborhood, nearest first
        #[arg(long, default_value_t = DEFAULT_MAX_NS)]
        max_ns: usize,
        /// Testing policy
        #[command(flatten)]
        #[serde(flatten)]
        policy: PolicyArgs,
    },
}

impl Command {
    /// Operation name used in reports
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FpKnn { .. } => "find_fp_knn",
            Self::FpDist { .. } => "find_fp_dist",
            Self::EnrichKnn { .. } => "motif_enrichment_knn",
            Self::EnrichDist { .. } => "motif_enrichment_dist",
        }
    }
}

/// Hypothesis test flags
#[derive(Args, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyArgs {
    /// Test direction
    #[arg(long, value_enum, default_value_t = Alternative::Greater)]
    pub alternative: Alternative,

    /// Multiple-testing correction
    #[arg(long, value_enum, default_value_t = CorrectionMethod::None)]
    pub correction: CorrectionMethod,

    /// Significance level for corrected p-values
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// Include contributing cell identifiers
    #[arg(long)]
    pub return_cell_ids: bool,
}

impl From<PolicyArgs> for EnrichmentOptions {
    fn from(policy: PolicyArgs) -> Self {
        Self {
            alternative: policy.alternative,
            correction: policy.correction,
            alpha: policy.alpha,
            return_cell_ids: policy.return_cell_ids,
        }
    }
}

/// Runs one analysis over every requested center type and writes a report
pub struct QueryProcessor {
    cli: Cli,
    progress_manager: Option<ProgressManager>,
}

impl QueryProcessor {
    /// Create a new processor with the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            progress_manager,
        }
    }

    /// Load the dataset, run the analysis and write the report
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded, an argument is
    /// invalid, the run times out, or the report cannot be written
    pub fn process(&mut self) -> Result<()> {
        let engine = load_engine(&self.cli.dataset, self.cli.spatial_params())?;
        let report = self.run(&engine)?;

        match &self.cli.output {
            Some(path) => report.write_file(path),
            None => report.write_to(std::io::stdout().lock()),
        }
    }

    /// Run the analysis against an already built engine
    ///
    /// # Errors
    ///
    /// Returns an error for unknown center types, invalid parameters or an
    /// expired timeout
    pub fn run(&mut self, engine: &MotifEngine) -> Result<Report> {
        let start_time = Instant::now();
        let centers = self.centers(engine)?;
        let cancel = self.cli.timeout.map_or_else(CancellationToken::new, |seconds| {
            CancellationToken::with_timeout(Duration::from_secs(seconds))
        });
        let motifs = self.motifs()?;

        if let Some(ref mut pm) = self.progress_manager {
            pm.initialize(centers.len(), self.cli.command.name());
        }

        let mut reports = Vec::with_capacity(centers.len());
        for ct in centers {
            if let Some(ref pm) = self.progress_manager {
                pm.start_center(&ct);
            }
            let results = self.analyze(engine, &ct, motifs.as_deref(), &cancel)?;
            reports.push(CenterReport { ct, results });
            if let Some(ref pm) = self.progress_manager {
                pm.complete_center();
            }
        }

        if let Some(ref pm) = self.progress_manager {
            pm.finish();
        }
        info!(
            operation = self.cli.command.name(),
            centers = reports.len(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "run complete"
        );

        Ok(Report {
            dataset: engine.dataset().name().to_string(),
            operation: self.cli.command.name().to_string(),
            parameters: serde_json::to_value(&self.cli.command).map_err(|source| {
                MotifError::Parse {
                    path: PathBuf::from("<parameters>"),
                    source,
                }
            })?,
            centers: reports,
        })
    }

    fn analyze(
        &self,
        engine: &MotifEngine,
        ct: &str,
        motifs: Option<&[Motif]>,
        cancel: &CancellationToken,
    ) -> Result<CenterResults> {
        Ok(match self.cli.command {
            Command::FpKnn { k, min_support } => CenterResults::FrequentPatterns {
                frequent_patterns: engine.find_patterns_knn_with(ct, k, min_support, cancel)?,
            },
            Command::FpDist {
                max_dist,
                min_size,
                min_support,
            } => CenterResults::FrequentPatterns {
                frequent_patterns: engine.find_patterns_radius_with(
                    ct,
                    max_dist,
                    min_size,
                    min_support,
                    cancel,
                )?,
            },
            Command::EnrichKnn {
                k,
                min_support,
                max_dist,
                policy,
                ..
            } => CenterResults::Enrichment {
                enrichment_results: engine.enrich_knn_with(
                    ct,
                    motifs,
                    k,
                    min_support,
                    Some(max_dist),
                    &policy.into(),
                    cancel,
                )?,
            },
            Command::EnrichDist {
                max_dist,
                min_size,
                min_support,
                max_ns,
                policy,
                ..
            } => CenterResults::Enrichment {
                enrichment_results: engine.enrich_radius_with(
                    ct,
                    motifs,
                    max_dist,
                    min_size,
                    min_support,
                    max_ns,
                    &policy.into(),
                    cancel,
                )?,
            },
        })
    }

    /// Requested center types, or the whole vocabulary
    fn centers(&self, engine: &MotifEngine) -> Result<Vec<String>> {
        let dataset = engine.dataset();
        if self.cli.all_types || self.cli.ct.is_empty() {
            return Ok(dataset.vocabulary().to_vec());
        }
        self.cli
            .ct
            .iter()
            .map(|ct| ct.trim().to_string())
            .filter(|ct| !ct.is_empty())
            .map(|ct| match dataset.label_id(&ct) {
                Some(_) => Ok(ct),
                None => Err(not_found("cell type", &ct)),
            })
            .collect()
    }

    /// Motifs from repeated `--motif` flags; none means auto-discovery
    fn motifs(&self) -> Result<Option<Vec<Motif>>> {
        let raw = match &self.cli.command {
            Command::EnrichKnn { motifs, .. } | Command::EnrichDist { motifs, .. } => motifs,
            Command::FpKnn { .. } | Command::FpDist { .. } => return Ok(None),
        };
        if raw.is_empty() {
            return Ok(None);
        }
        raw.iter()
            .map(|motif| Motif::new(motif.split(',')))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}
