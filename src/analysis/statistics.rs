//! Transaction collections and pattern support counting

use crate::analysis::neighborhood::{LabelSet, Neighborhood};
use crate::spatial::LabelId;

/// Neighborhood compositions viewed as transactions for pattern mining
///
/// Each transaction is the sorted, duplicate-free set of labels present in
/// one neighborhood; multiplicity does not matter for set containment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transactions {
    items: Vec<Vec<LabelId>>,
    centers: Vec<usize>,
}

impl Transactions {
    /// Build transactions from neighborhoods, keeping center rows
    pub fn from_neighborhoods<'a, I>(neighborhoods: I) -> Self
    where
        I: IntoIterator<Item = &'a Neighborhood>,
    {
        let mut transactions = Self::default();
        for neighborhood in neighborhoods {
            let mut items = neighborhood.composition.clone();
            items.dedup();
            transactions.items.push(items);
            transactions.centers.push(neighborhood.center);
        }
        transactions
    }

    /// Build transactions from compact label sets, keeping center rows
    pub fn from_label_sets<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a LabelSet>,
    {
        let mut transactions = Self::default();
        for set in sets {
            transactions.items.push(set.labels().collect());
            transactions.centers.push(set.center);
        }
        transactions
    }

    /// Build transactions from raw label sets; centers are positions
    pub fn from_sets(sets: Vec<Vec<LabelId>>) -> Self {
        let centers = (0..sets.len()).collect();
        let items = sets
            .into_iter()
            .map(|mut set| {
                set.sort_unstable();
                set.dedup();
                set
            })
            .collect();
        Self { items, centers }
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no transactions
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Label sets in input order
    pub fn items(&self) -> &[Vec<LabelId>] {
        &self.items
    }

    /// Center row of each transaction
    pub fn centers(&self) -> &[usize] {
        &self.centers
    }

    /// Number of transactions containing every label of `pattern`
    pub fn count_containing(&self, pattern: &[LabelId]) -> usize {
        self.items
            .iter()
            .filter(|items| contains_pattern(items, pattern))
            .count()
    }

    /// Fraction of transactions containing `pattern` (0 when empty)
    pub fn support(&self, pattern: &[LabelId]) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.count_containing(pattern) as f64 / self.items.len() as f64
    }
}

/// Whether a sorted label set contains every label of a sorted pattern
///
/// Both slices must be ascending; the scan is a linear merge.
pub fn contains_pattern(sorted: &[LabelId], pattern: &[LabelId]) -> bool {
    let mut items = sorted.iter();
    pattern
        .iter()
        .all(|wanted| items.by_ref().any(|label| label == wanted))
}
