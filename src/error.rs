use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the navigation capability itself. Ordinary page-interaction
/// failures within budget never surface here; they are recorded in the history.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// The browser could not be launched, attached to, or given a tab.
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    #[error("navigation run failed: {0}")]
    Run(String),
}

impl NavigationError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn run(message: impl Into<String>) -> Self {
        Self::Run(message.into())
    }
}

/// Failures of a completion call. A call that succeeds with unusable content
/// is not an error at this level.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{0} not set in environment")]
    MissingApiKey(&'static str),

    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("no content in completion response: {0}")]
    EmptyResponse(String),
}

/// Fatal outcomes of one pipeline run. Anything not listed here degrades to a
/// representable value instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("navigation did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
