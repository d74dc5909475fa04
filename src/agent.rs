//! Browser agent: an LLM picks one action per step, Chrome carries it out.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::brain::Brain;
use crate::completion::ChatModel;
use crate::driver::Navigator;
use crate::error::NavigationError;
use crate::types::{ActionResult, AgentHistory, Extraction, HistoryStep, NavigationTask, PageState, Step};

/// A live page the agent can act on.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Every run starts in a fresh tab.
    async fn open_tab(&mut self) -> Result<()>;

    async fn perform(&self, step: &Step) -> Result<Vec<Extraction>>;

    /// Never fails; unreadable parts come back as placeholders.
    async fn observe(&self) -> PageState;

    /// PNG bytes of the visible viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

pub struct BrowserAgent<P, M> {
    page: P,
    model: M,
}

impl<P: BrowserPage, M: ChatModel> BrowserAgent<P, M> {
    pub fn new(page: P, model: M) -> Self {
        Self { page, model }
    }

    pub fn page(&self) -> &P {
        &self.page
    }
}

#[async_trait]
impl<P: BrowserPage, M: ChatModel> Navigator for BrowserAgent<P, M> {
    async fn execute(&mut self, task: &NavigationTask) -> Result<AgentHistory, NavigationError> {
        self.page
            .open_tab()
            .await
            .map_err(|e| NavigationError::unavailable(format!("failed to open tab: {e:#}")))?;

        let mut brain = Brain::new(&self.model, &task.goal);
        let mut history = AgentHistory::default();
        let mut consecutive_failures = 0;

        for number in 1..=task.max_steps {
            let step = match brain.decide_next_step().await {
                Ok(step) => step,
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(step = number, error = %message, "could not decide next step");
                    brain.reject(&message);
                    history.push(HistoryStep {
                        number,
                        results: vec![ActionResult::error(message)],
                        ..HistoryStep::default()
                    });
                    consecutive_failures += 1;
                    if consecutive_failures >= task.max_failures {
                        warn!(consecutive_failures, "failure budget exhausted");
                        return Ok(history);
                    }
                    tokio::time::sleep(task.retry_delay).await;
                    continue;
                }
            };

            if let Step::Done { summary } = &step {
                info!(step = number, "task complete");
                history.push(HistoryStep {
                    number,
                    results: vec![ActionResult::done(summary.clone())],
                    action: Some(step),
                    url: None,
                });
                return Ok(history);
            }

            info!(step = number, action = ?step, "executing step");
            let (results, error) = match self.page.perform(&step).await {
                Ok(extracted) => (
                    extracted
                        .iter()
                        .map(|e| ActionResult::extracted(e.content.clone()))
                        .collect::<Vec<_>>(),
                    None,
                ),
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(step = number, error = %message, "step failed");
                    (vec![ActionResult::error(message.clone())], Some(message))
                }
            };

            let mut page_state = self.page.observe().await;
            let screenshot = if task.use_vision {
                match self.page.screenshot().await {
                    Ok(png) => Some(png),
                    Err(e) => {
                        warn!(error = %e, "screenshot failed");
                        None
                    }
                }
            } else {
                None
            };

            history.push(HistoryStep {
                number,
                action: Some(step),
                url: Some(page_state.url.clone()),
                results,
            });

            page_state.extracted = history
                .final_step()
                .map(extractions_of)
                .unwrap_or_default();
            page_state.error = error.clone();
            brain.observe(&page_state, screenshot.as_deref());

            if error.is_some() {
                consecutive_failures += 1;
                if consecutive_failures >= task.max_failures {
                    warn!(consecutive_failures, "failure budget exhausted");
                    return Ok(history);
                }
                tokio::time::sleep(task.retry_delay).await;
            } else {
                consecutive_failures = 0;
            }
        }

        warn!(max_steps = task.max_steps, "step budget exhausted");
        Ok(history)
    }
}

fn extractions_of(step: &HistoryStep) -> Vec<Extraction> {
    let label = match &step.action {
        Some(Step::Extract { label, .. }) => label.as_str(),
        _ => "content",
    };
    step.results
        .iter()
        .filter_map(|r| r.extracted_content.as_ref())
        .map(|content| Extraction {
            label: label.to_string(),
            content: content.clone(),
        })
        .collect()
}
