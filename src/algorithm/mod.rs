/// Fixed-size bitsets over transactions for vertical mining
pub mod bitset;
/// Memoization of background neighborhood extraction
pub mod cache;
/// Cooperative cancellation tokens
pub mod cancellation;
/// Per-dataset motif mining engine
pub mod engine;
