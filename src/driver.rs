//! Runs one navigation task and harvests the text of its final step.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{NavigationError, PipelineError};
use crate::types::{ActionResult, AgentHistory, NavigationTask};

/// Anything that can carry out a navigation task against a live page. Budget
/// and retry policy belong to the implementation; it only errors when it
/// cannot run at all.
#[async_trait]
pub trait Navigator: Send {
    async fn execute(&mut self, task: &NavigationTask) -> Result<AgentHistory, NavigationError>;
}

pub struct NavigationDriver<N> {
    navigator: N,
    timeout: Option<Duration>,
}

impl<N: Navigator> NavigationDriver<N> {
    pub fn new(navigator: N) -> Self {
        Self {
            navigator,
            timeout: None,
        }
    }

    /// Bounds the wall-clock time of a whole run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// An empty transcript is a valid outcome; only a navigator that cannot
    /// run, or a run exceeding the timeout, is an error.
    pub async fn run(&mut self, task: NavigationTask) -> Result<String, PipelineError> {
        info!(
            max_steps = task.max_steps,
            max_failures = task.max_failures,
            use_vision = task.use_vision,
            "starting navigation run"
        );

        let history = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.navigator.execute(&task))
                .await
                .map_err(|_| PipelineError::Timeout(limit))??,
            None => self.navigator.execute(&task).await?,
        };

        info!(steps = history.len(), done = history.is_done(), "navigation run finished");
        Ok(harvest_transcript(&history))
    }
}

/// Joins the extracted text of the final step. Earlier steps never contribute.
pub fn harvest_transcript(history: &AgentHistory) -> String {
    let Some(final_step) = history.final_step() else {
        warn!("no history produced by navigation run");
        return String::new();
    };
    if final_step.results.is_empty() {
        warn!(step = final_step.number, "no final extracted content in last step");
        return String::new();
    }

    for error in final_step.results.iter().filter_map(|r| r.error.as_deref()) {
        warn!(step = final_step.number, %error, "final step reported an error");
    }
    join_extracted(&final_step.results)
}

fn join_extracted(results: &[ActionResult]) -> String {
    results
        .iter()
        .filter_map(|r| r.extracted_content.as_deref())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
