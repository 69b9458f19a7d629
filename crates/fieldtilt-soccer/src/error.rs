// Error type for the index calculators that assemble output tables.

use fieldtilt_core::{ScoreError, TableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Table(#[from] TableError),
}
