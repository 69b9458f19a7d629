// Library root: the tabular metric model and the shared normalization and
// weighting pipeline used by every index calculator.

pub mod composite;
pub mod error;
pub mod league;
pub mod normalize;
pub mod stats;
pub mod table;
pub mod weights;

pub use composite::{weighted_sum, WeightedMetrics};
pub use error::{ScoreError, ScoreResult};
pub use league::{apply_adjustment, compute_adjustment_factors, AdjustmentFactorTable, AdjustmentOptions};
pub use normalize::normalize;
pub use table::{MetricTable, Row, TableError, Value};
pub use weights::{compute_weights, WeightTable};
