use crate::models::ProgressItem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("progress store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt progress row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ReviewError {
    /// The review was computed but could not be written. `unsaved` is the
    /// state the learner would have had.
    #[error("progress may not have been saved: {source}")]
    Persistence {
        #[source]
        source: StoreError,
        unsaved: Box<ProgressItem>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReviewError {
    pub fn unsaved(&self) -> Option<&ProgressItem> {
        match self {
            ReviewError::Persistence { unsaved, .. } => Some(unsaved),
            ReviewError::Store(_) => None,
        }
    }
}

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;
