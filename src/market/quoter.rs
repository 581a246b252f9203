//! Quote estimator.
//!
//! Pure math: given an input amount and a spot rate, produce the expected
//! output and a synthetic price impact. The impact follows a virtual-depth
//! constant-product curve so larger trades always quote worse, mimicking
//! AMM slippage without any pool state.

// ============================================
// CONSTANTS
// ============================================

/// Virtual pool depth in units of the input asset. Matches the seeded
/// ETH-TUSD reserve so a 1 ETH trade lands around 0.4% impact.
pub const DEFAULT_POOL_DEPTH: f64 = 250.0;

// ============================================
// QUOTE
// ============================================

/// One priced swap. Immutable; callers replace it on every input change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub amount_in: f64,
    pub amount_out: f64,
    /// Synthetic price impact, percent, always >= 0
    pub impact_pct: f64,
    /// Spot rate the quote was computed against
    pub spot_rate: f64,
}

impl Quote {
    fn zero() -> Self {
        Self {
            amount_in: 0.0,
            amount_out: 0.0,
            impact_pct: 0.0,
            spot_rate: 0.0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount_out == 0.0
    }

    /// Output net of the caller's slippage tolerance, the number a swap UI
    /// shows as "minimum received"
    pub fn min_received(&self, slippage_pct: f64) -> f64 {
        (self.amount_out * (1.0 - slippage_pct / 100.0)).max(0.0)
    }
}

// ============================================
// ESTIMATION
// ============================================

/// Estimate a swap at the default virtual depth.
pub fn estimate(amount_in: f64, spot_rate: f64) -> Quote {
    estimate_with_depth(amount_in, spot_rate, DEFAULT_POOL_DEPTH)
}

/// Estimate a swap against an explicit virtual depth.
///
/// Non-positive or non-finite inputs yield the zero quote; UI-driven input
/// never errors here.
pub fn estimate_with_depth(amount_in: f64, spot_rate: f64, depth: f64) -> Quote {
    if !amount_in.is_finite() || !spot_rate.is_finite() || amount_in <= 0.0 || spot_rate <= 0.0 {
        return Quote::zero();
    }

    let naive_out = amount_in * spot_rate;

    let impact_pct = if depth > 0.0 {
        (100.0 * amount_in / (amount_in + depth)).clamp(0.0, 100.0)
    } else {
        0.0
    };

    Quote {
        amount_in,
        amount_out: naive_out * (1.0 - impact_pct / 100.0),
        impact_pct,
        spot_rate,
    }
}

/// Input needed to receive `amount_out` at the naive spot rate, used when
/// the user edits the output side of the form. Zero for degenerate inputs.
pub fn required_input(amount_out: f64, spot_rate: f64) -> f64 {
    if !amount_out.is_finite() || !spot_rate.is_finite() || amount_out <= 0.0 || spot_rate <= 0.0 {
        return 0.0;
    }
    amount_out / spot_rate
}

// ============================================
// TESTS
// ============================================
