pub mod pair_diff;

pub use pair_diff::{PairDiffCalculator, PairDiffError, DEFAULT_WINDOW_BASE};
