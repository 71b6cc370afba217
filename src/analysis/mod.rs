//! Neighborhood extraction, pattern mining and enrichment statistics

/// Hypergeometric enrichment testing of candidate patterns
pub mod enrichment;
/// KNN and radius neighborhoods around center cells
pub mod neighborhood;
/// Frequent pattern mining and caller-supplied motifs
pub mod patterns;
/// Transaction collections and support counting
pub mod statistics;
