use thiserror::Error;

use crate::session::Screen;

/// Failures of the underlying key-value medium.
///
/// Only backends surface these; `GameStore` logs them and degrades to
/// "value absent" so gameplay is never interrupted.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable")]
    Unavailable,
}

/// An intent that does not apply to the current session state.
/// Rejected intents leave state and storage untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{intent} is not available on the {screen} screen")]
    WrongScreen {
        intent: &'static str,
        screen: Screen,
    },

    #[error("{intent} requires the question form, but a result is showing")]
    ResultPending { intent: &'static str },

    #[error("{intent} requires a submitted answer")]
    NoResult { intent: &'static str },

    #[error("retry is only offered after an incorrect answer")]
    RetryAfterCorrect,

    #[error("the reward chest is already open")]
    ChestAlreadyOpen,

    #[error("no reward has been awarded yet")]
    ChestClosed,
}
