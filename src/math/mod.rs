//! Mathematical utilities for significance testing

/// Multiple-testing correction of p-value families
pub mod correction;
/// Hypergeometric distribution used as the enrichment null model
pub mod probability;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_BASE: f64 = 0.999_999_999_999_809_9;
const LANCZOS_COEFFICIENTS: [f64; 8] = [
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural logarithm of the gamma function using the Lanczos approximation
///
/// Accurate to roughly 15 significant digits for positive arguments, which is
/// enough for log-space binomial coefficients over cell counts. Arguments below
/// 0.5 go through the reflection formula.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).abs().ln() - ln_gamma(1.0 - x);
    }

    let z = x - 1.0;
    let mut series = LANCZOS_BASE;
    for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate() {
        series += coefficient / (z + (i + 1) as f64);
    }

    let t = z + LANCZOS_G + 0.5;
    let half_ln_two_pi = 0.5 * (2.0 * std::f64::consts::PI).ln();

    half_ln_two_pi + (z + 0.5).mul_add(t.ln(), -t) + series.ln()
}

/// Logarithm of the binomial coefficient C(n, k)
///
/// Returns negative infinity when `k > n`, so the corresponding probability
/// term vanishes after exponentiation.
pub fn ln_choose(n: usize, k: usize) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    let n = n as f64;
    let k = k as f64;
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}
