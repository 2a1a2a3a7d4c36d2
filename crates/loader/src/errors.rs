//! Loader error types

use crate::pipeline::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    /// Structurally invalid source input (unterminated quotes, encoding)
    #[error("CSV parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// A row could not be positionally mapped to a record
    #[error("row at line {line} is malformed: {message}")]
    Row { line: u64, message: String },

    /// An underlying csv reader error without row context
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Store or model error bubbled up from the common crate
    #[error(transparent)]
    Store(#[from] ludobot_common::AppError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pipeline stage failed; the run is aborted
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<LoaderError>,
    },
}

impl LoaderError {
    /// Wrap an error with the pipeline stage it occurred in
    pub fn in_stage(stage: Stage, source: impl Into<LoaderError>) -> Self {
        LoaderError::Stage {
            stage,
            source: Box::new(source.into()),
        }
    }
}
