use statrs::function::gamma::ln_gamma;

use crate::error::ModelError;

/// Smoothing priors and truncation point for the scoring distribution.
///
/// The defaults were chosen once for the whole pipeline and are not tuned
/// per fixture: `alpha`/`beta` only matter for tiny samples, and fifteen
/// goals is already beyond anything a league fixture produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoissonGammaConfig {
    /// Outcome counts are modelled over `0..limit`.
    pub limit: usize,
    /// Shape smoothing prior.
    pub alpha: f64,
    /// Scale smoothing prior.
    pub beta: f64,
}

impl Default for PoissonGammaConfig {
    fn default() -> Self {
        Self {
            limit: 15,
            alpha: 0.001,
            beta: 0.01,
        }
    }
}

/// Concatenates two samples that describe the same underlying rate, e.g. a
/// team's goals scored pooled with its opponents' goals conceded.
pub fn pool(a: &[i64], b: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// Fits a Bayesian-smoothed scoring distribution to one count sample.
///
/// The posterior predictive of a Poisson rate under a Gamma prior is a
/// negative binomial; the returned vector holds `P(X = x)` for `x` in
/// `0..cfg.limit`. Mass beyond the truncation point is dropped, so the
/// probabilities sum to slightly under one.
pub fn fit(sample: &[i64], cfg: &PoissonGammaConfig) -> Result<Vec<f64>, ModelError> {
    if cfg.limit == 0 {
        return Err(ModelError::InvalidInput(
            "limit must be >= 1, got 0".to_string(),
        ));
    }
    if sample.is_empty() {
        return Err(ModelError::InvalidInput("empty sample".to_string()));
    }
    if let Some(bad) = sample.iter().find(|v| **v < 0) {
        return Err(ModelError::InvalidInput(format!(
            "sample contains negative count {bad}"
        )));
    }

    let n = sample.len() as f64;
    let observed: i64 = sample.iter().sum();
    let total_count = observed as f64 + cfg.alpha * n * cfg.beta;
    let effective_size = n + n * cfg.beta;

    // The gamma factors grow factorially, so they are combined in log space.
    // Both power-term bases sit in (0, 1) and can be taken directly.
    let ln_gamma_total = ln_gamma(total_count);
    let rate_factor = (effective_size / (effective_size + 1.0)).powf(total_count);
    let tail_base = 1.0 / (effective_size + 1.0);

    let mut pmf = Vec::with_capacity(cfg.limit);
    for x in 0..cfg.limit {
        let xf = x as f64;
        let ln_binom = ln_gamma(xf + total_count) - ln_gamma(xf + 1.0) - ln_gamma_total;
        let mass = ln_binom.exp() * rate_factor * tail_base.powi(x as i32);
        if !mass.is_finite() {
            return Err(ModelError::NumericOverflow(format!(
                "mass at count {x} is not finite (total_count={total_count}, effective_size={effective_size})"
            )));
        }
        pmf.push(mass);
    }
    Ok(pmf)
}
