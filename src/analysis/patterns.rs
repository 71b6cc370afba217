//! Frequent pattern mining over neighborhood transactions
//!
//! Mining is vertical: each label keeps the bitset of transactions containing
//! it, and a pattern's transactions are the intersection of its labels'
//! bitsets. The search extends patterns depth-first and stops as soon as an
//! extension falls below the minimum count, since no superset can recover.

use crate::algorithm::bitset::TransactionBitset;
use crate::algorithm::cancellation::CancellationToken;
use crate::analysis::statistics::Transactions;
use crate::io::error::{Result, invalid_argument, not_found};
use crate::spatial::{Dataset, LabelId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// A set of distinct labels, stored ascending
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pattern(Vec<LabelId>);

impl Pattern {
    /// Build a pattern, sorting and removing duplicate labels
    pub fn new(mut labels: Vec<LabelId>) -> Self {
        labels.sort_unstable();
        labels.dedup();
        Self(labels)
    }

    /// Member labels, ascending
    pub fn labels(&self) -> &[LabelId] {
        &self.0
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pattern has no labels
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label texts in lexicographic order
    pub fn names(&self, dataset: &Dataset) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|&label| dataset.label_name(label))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (position, label) in self.0.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}")?;
        }
        write!(f, "}}")
    }
}

/// A pattern meeting the support threshold
#[derive(Debug, Clone, PartialEq)]
pub struct FrequentPattern {
    /// The labels
    pub pattern: Pattern,
    /// Number of transactions containing the pattern
    pub count: usize,
    /// Fraction of transactions containing the pattern
    pub support: f64,
}

/// A caller-supplied motif: a non-empty set of label names
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Motif(BTreeSet<String>);

impl Motif {
    /// Build a motif from label names, trimming whitespace and skipping blanks
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error when no label remains
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if set.is_empty() {
            return Err(invalid_argument(
                "motifs",
                &"",
                &"a motif needs at least one cell type",
            ));
        }
        Ok(Self(set))
    }

    /// Label names, lexicographic
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false once constructed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Map label names onto the dataset vocabulary
    ///
    /// # Errors
    ///
    /// Returns a not found error naming the first unknown cell type
    pub fn resolve(&self, dataset: &Dataset) -> Result<Pattern> {
        let labels = self
            .0
            .iter()
            .map(|name| {
                dataset
                    .label_id(name)
                    .ok_or_else(|| not_found("cell type", name))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Pattern::new(labels))
    }
}

impl fmt::Display for Motif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.labels().collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Complete frequent pattern miner
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMiner {
    min_support: f64,
    excluded: Option<LabelId>,
}

impl PatternMiner {
    /// Create a miner for the given relative support threshold
    ///
    /// # Errors
    ///
    /// Returns an invalid argument error unless `min_support` lies in (0, 1]
    pub fn new(min_support: f64) -> Result<Self> {
        if !(min_support > 0.0 && min_support <= 1.0) {
            return Err(invalid_argument(
                "min_support",
                &min_support,
                &"must lie in (0, 1]",
            ));
        }
        Ok(Self {
            min_support,
            excluded: None,
        })
    }

    /// Drop the singleton pattern of `label` from results
    #[must_use]
    pub const fn excluding(mut self, label: LabelId) -> Self {
        self.excluded = Some(label);
        self
    }

    /// Relative support threshold
    pub const fn min_support(&self) -> f64 {
        self.min_support
    }

    /// Smallest transaction count meeting the threshold for `transactions`
    pub fn min_count(&self, transactions: usize) -> usize {
        let total = transactions as f64;
        let mut count = (self.min_support * total).ceil() as usize;
        // Float rounding can overshoot or undershoot by one
        while count > 1 && (count - 1) as f64 / total >= self.min_support {
            count -= 1;
        }
        while count < transactions && (count as f64) / total < self.min_support {
            count += 1;
        }
        count.max(1)
    }

    /// Find every pattern whose support meets the threshold
    ///
    /// Results are sorted by descending count, then ascending size, then
    /// label order.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if `cancel` fires during the search
    pub fn mine(
        &self,
        transactions: &Transactions,
        cancel: &CancellationToken,
    ) -> Result<Vec<FrequentPattern>> {
        let total = transactions.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let min_count = self.min_count(total);

        let vocabulary = transactions
            .items()
            .iter()
            .flatten()
            .max()
            .map_or(0, |&label| label + 1);
        let mut tidsets: Vec<TransactionBitset> =
            (0..vocabulary).map(|_| TransactionBitset::new(total)).collect();
        for (position, items) in transactions.items().iter().enumerate() {
            for &label in items {
                if let Some(tidset) = tidsets.get_mut(label) {
                    tidset.insert(position);
                }
            }
        }

        let roots: Vec<(LabelId, TransactionBitset)> = tidsets
            .into_iter()
            .enumerate()
            .filter(|(_, tidset)| tidset.count() >= min_count)
            .collect();

        let branches = (0..roots.len())
            .into_par_iter()
            .map(|branch| {
                let mut found = Vec::new();
                let mut prefix = Vec::new();
                extend(&roots, branch, &mut prefix, min_count, cancel, &mut found)?;
                Ok(found)
            })
            .collect::<Result<Vec<Vec<(Vec<LabelId>, usize)>>>>()?;

        let mut patterns: Vec<FrequentPattern> = branches
            .into_iter()
            .flatten()
            .filter(|(labels, _)| !(labels.len() == 1 && labels.first() == self.excluded.as_ref()))
            .map(|(labels, count)| FrequentPattern {
                pattern: Pattern(labels),
                count,
                support: count as f64 / total as f64,
            })
            .collect();
        patterns.sort_by(compare_frequent);

        debug!(
            transactions = total,
            min_count,
            patterns = patterns.len(),
            "frequent patterns mined"
        );
        Ok(patterns)
    }
}

/// Record the pattern `prefix + siblings[branch]` and all its frequent
/// extensions by the siblings that follow it
fn extend(
    siblings: &[(LabelId, TransactionBitset)],
    branch: usize,
    prefix: &mut Vec<LabelId>,
    min_count: usize,
    cancel: &CancellationToken,
    found: &mut Vec<(Vec<LabelId>, usize)>,
) -> Result<()> {
    cancel.check("pattern mining")?;
    let Some((label, tidset)) = siblings.get(branch) else {
        return Ok(());
    };

    prefix.push(*label);
    found.push((prefix.clone(), tidset.count()));

    let children: Vec<(LabelId, TransactionBitset)> = siblings
        .iter()
        .skip(branch + 1)
        .filter_map(|(other, other_tidset)| {
            let joined = tidset.intersection(other_tidset);
            (joined.count() >= min_count).then_some((*other, joined))
        })
        .collect();

    for child in 0..children.len() {
        extend(&children, child, prefix, min_count, cancel, found)?;
    }
    prefix.pop();
    Ok(())
}

fn compare_frequent(left: &FrequentPattern, right: &FrequentPattern) -> Ordering {
    right
        .count
        .cmp(&left.count)
        .then_with(|| left.pattern.len().cmp(&right.pattern.len()))
        .then_with(|| left.pattern.cmp(&right.pattern))
}
