//! Market data: the simulated spot-price table and the quote estimator.

mod price_oracle;
mod quoter;

pub use price_oracle::{PriceOracle, DEFAULT_REFRESH_SECS};
pub use quoter::{estimate, estimate_with_depth, required_input, Quote, DEFAULT_POOL_DEPTH};
