//! Hypergeometric distribution for neighborhood enrichment testing

use crate::io::error::{Result, computation_error};
use crate::math::ln_choose;

// Relative slack when comparing outcome probabilities for the two-sided test
const TWO_SIDED_TOLERANCE: f64 = 1e-7;

/// Hypergeometric law: `draws` items taken without replacement from a
/// population of `population` items of which `successes` are marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypergeometric {
    population: usize,
    successes: usize,
    draws: usize,
}

impl Hypergeometric {
    /// Create a distribution after checking the parameters are consistent
    ///
    /// # Errors
    ///
    /// Returns a computation error if the population is empty or if either
    /// `successes` or `draws` exceeds it.
    pub fn new(population: usize, successes: usize, draws: usize) -> Result<Self> {
        if population == 0 {
            return Err(computation_error(
                "hypergeometric test",
                &"population size must be positive",
            ));
        }
        if successes > population {
            return Err(computation_error(
                "hypergeometric test",
                &format!("{successes} marked items exceed population of {population}"),
            ));
        }
        if draws > population {
            return Err(computation_error(
                "hypergeometric test",
                &format!("{draws} draws exceed population of {population}"),
            ));
        }

        Ok(Self {
            population,
            successes,
            draws,
        })
    }

    /// Population size
    pub const fn population(&self) -> usize {
        self.population
    }

    /// Number of marked items in the population
    pub const fn successes(&self) -> usize {
        self.successes
    }

    /// Number of draws
    pub const fn draws(&self) -> usize {
        self.draws
    }

    /// Smallest and largest attainable number of marked draws
    pub const fn support(&self) -> (usize, usize) {
        let unmarked = self.population - self.successes;
        let low = self.draws.saturating_sub(unmarked);
        let high = if self.draws < self.successes {
            self.draws
        } else {
            self.successes
        };
        (low, high)
    }

    /// Log probability of exactly `x` marked draws
    pub fn ln_pmf(&self, x: usize) -> f64 {
        let (low, high) = self.support();
        if x < low || x > high {
            return f64::NEG_INFINITY;
        }
        ln_choose(self.successes, x) + ln_choose(self.population - self.successes, self.draws - x)
            - ln_choose(self.population, self.draws)
    }

    /// Probability of exactly `x` marked draws
    pub fn pmf(&self, x: usize) -> f64 {
        self.ln_pmf(x).exp()
    }

    /// Survival function P(X > x)
    ///
    /// Terms are accumulated from the top of the support downwards, so the
    /// partial sums for neighboring `x` share a prefix and the function is
    /// monotone in floating point as well.
    pub fn sf(&self, x: usize) -> f64 {
        let (low, high) = self.support();
        if x >= high {
            return 0.0;
        }
        let start = (x + 1).max(low);

        let mut total = 0.0;
        for i in (start..=high).rev() {
            total += self.pmf(i);
        }
        total.min(1.0)
    }

    /// Upper tail P(X >= observed), the one-sided enrichment p-value
    pub fn at_least(&self, observed: usize) -> f64 {
        if observed == 0 {
            return 1.0;
        }
        self.sf(observed - 1)
    }

    /// Cumulative distribution P(X <= x), the one-sided depletion p-value
    pub fn cdf(&self, x: usize) -> f64 {
        let (low, high) = self.support();
        if x < low {
            return 0.0;
        }
        if x >= high {
            return 1.0;
        }

        let mut total = 0.0;
        for i in low..=x {
            total += self.pmf(i);
        }
        total.min(1.0)
    }

    /// Two-sided p-value: total probability of outcomes no more likely than `observed`
    pub fn two_sided(&self, observed: usize) -> f64 {
        let (low, high) = self.support();
        let observed_probability = self.pmf(observed);
        let threshold = observed_probability * (1.0 + TWO_SIDED_TOLERANCE);

        let mut total = 0.0;
        for i in low..=high {
            let p = self.pmf(i);
            if p <= threshold {
                total += p;
            }
        }
        total.min(1.0)
    }
}
