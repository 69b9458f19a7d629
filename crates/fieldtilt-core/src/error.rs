// Error types shared by every calculator in the scoring pipeline.

use thiserror::Error;

/// Failures raised at the boundary of a calculator.
///
/// NaN produced by a zero-variance column is not an error; it flows through
/// weighted sums untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("missing required columns: {}", .columns.join(", "))]
    MissingColumn { columns: Vec<String> },

    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("invalid divisor: {name} cannot be zero")]
    InvalidDivisor { name: &'static str },

    #[error("role weights must sum to 1 (got {total:.4})")]
    WeightSum { total: f64 },

    #[error("league `{league}` not found in league summary")]
    LeagueNotFound { league: String },

    #[error("column `{column}` row {row}: {message}")]
    TypeInput {
        column: String,
        row: usize,
        message: String,
    },

    #[error("row {row}: {source}")]
    AtRow {
        row: usize,
        #[source]
        source: Box<ScoreError>,
    },
}

impl ScoreError {
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScoreError::MissingColumn {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach the index of the row that failed.
    pub fn at_row(self, row: usize) -> Self {
        ScoreError::AtRow {
            row,
            source: Box::new(self),
        }
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
