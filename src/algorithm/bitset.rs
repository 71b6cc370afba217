use bitvec::prelude::*;
use std::fmt;

/// Fixed-size bitset recording which transactions contain an itemset
///
/// Indices are transaction positions (0-based). Intersection of two tidsets
/// yields the tidset of the union of their itemsets, which is what the
/// depth-first miner extends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBitset {
    bits: BitVec,
}

impl TransactionBitset {
    /// Create a bitset with no transactions present
    pub fn new(transactions: usize) -> Self {
        Self {
            bits: bitvec![0; transactions],
        }
    }

    /// Create a bitset containing every transaction
    pub fn all(transactions: usize) -> Self {
        Self {
            bits: bitvec![1; transactions],
        }
    }

    /// Number of transactions the bitset can address
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Mark a transaction; out-of-range positions are ignored
    pub fn insert(&mut self, transaction: usize) {
        if transaction < self.bits.len() {
            self.bits.set(transaction, true);
        }
    }

    /// Test transaction membership
    pub fn contains(&self, transaction: usize) -> bool {
        self.bits.get(transaction).as_deref() == Some(&true)
    }

    /// Intersect this bitset with another in-place
    pub fn intersect_with(&mut self, other: &Self) {
        self.bits &= &other.bits;
    }

    /// Create a new bitset containing the intersection
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }

    /// Test if no transactions are present
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Count transactions in the set
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Extract all transaction positions in ascending order
    pub fn to_vec(&self) -> Vec<usize> {
        self.bits.iter_ones().collect()
    }
}

impl fmt::Display for TransactionBitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransactionBitset({} of {}: {:?})",
            self.count(),
            self.capacity(),
            self.to_vec()
        )
    }
}
