use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One navigation run's instructions and budgets. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTask {
    pub goal: String,
    pub max_steps: usize,
    /// Consecutive failed steps tolerated before the run gives up.
    pub max_failures: usize,
    pub retry_delay: Duration,
    pub use_vision: bool,
}

impl NavigationTask {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            max_steps: DEFAULT_MAX_STEPS,
            max_failures: DEFAULT_MAX_FAILURES,
            retry_delay: DEFAULT_RETRY_DELAY,
            use_vision: true,
        }
    }

    /// Zero budgets are raised to one so every run gets at least one attempt.
    pub fn with_budgets(mut self, max_steps: usize, max_failures: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self.max_failures = max_failures.max(1);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_vision(mut self, use_vision: bool) -> Self {
        self.use_vision = use_vision;
        self
    }
}

/// The goal handed to the browser agent for a cinema listing site.
pub fn family_movie_goal(site_url: &str) -> String {
    format!(
        "1. Navigate to {site_url}.\n\
         2. Identify and list the available movies (in Hebrew).\n\
         3. Summarize each movie:\n   \
            - Brief plot or theme\n   \
            - Target age\n\
         4. Provide reasons why these titles might be good for a family.\n\
         5. Output in both **Hebrew (RTL, not reversed)** and **English**.\n\
         6. Ensure the Hebrew text reads naturally, right-to-left.\n\
         7. End with a bullet list of recommended family-friendly movies."
    )
}

/// A single atomic step the LLM asks the agent to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Step {
    Navigate { url: String },
    WaitFor { selector: String, timeout_ms: u64 },
    TypeInto { selector: String, text: String },
    Click { selector: String },
    PressKey { key: String },
    Scroll { pixels: i64 },
    Extract { selector: String, label: String },
    Done { summary: String },
}

/// What the agent observes after executing a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub title: String,
    pub dom_snapshot: String,
    pub extracted: Vec<Extraction>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub label: String,
    pub content: String,
}

/// A message in the conversation history sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64 PNG attached for vision-capable models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_png: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            image_png: None,
        }
    }
}

/// Output of one action within a step: extracted text, an error, or both absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub extracted_content: Option<String>,
    pub error: Option<String>,
    pub is_done: bool,
}

impl ActionResult {
    pub fn extracted(content: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn done(summary: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(summary.into()),
            error: None,
            is_done: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStep {
    pub number: usize,
    pub action: Option<Step>,
    pub url: Option<String>,
    pub results: Vec<ActionResult>,
}

impl HistoryStep {
    pub fn has_error(&self) -> bool {
        self.results.iter().any(|r| r.error.is_some())
    }
}

/// Ordered record of every step a navigation run executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    pub steps: Vec<HistoryStep>,
}

impl AgentHistory {
    pub fn push(&mut self, step: HistoryStep) {
        self.steps.push(step);
    }

    pub fn final_step(&self) -> Option<&HistoryStep> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_done(&self) -> bool {
        self.final_step()
            .is_some_and(|s| s.results.iter().any(|r| r.is_done))
    }
}

pub const DEFAULT_MAX_STEPS: usize = 100;
pub const DEFAULT_MAX_FAILURES: usize = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DOM_SNAPSHOT_MAX_CHARS: usize = 4000;
pub const EXTRACT_MAX_CHARS: usize = 6000;
