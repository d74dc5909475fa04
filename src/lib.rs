//! Drives a browser agent over a cinema listing site and turns what it finds
//! into a bilingual, family-oriented HTML page.

pub mod agent;
pub mod brain;
pub mod completion;
pub mod config;
pub mod dom;
pub mod driver;
pub mod error;
pub mod hands;
pub mod pipeline;
pub mod reconciler;
pub mod recommendation;
pub mod render;
pub mod types;

pub use agent::{BrowserAgent, BrowserPage};
pub use completion::{ChatModel, OpenAiClient, TextCompletion};
pub use config::Config;
pub use driver::{NavigationDriver, Navigator, harvest_transcript};
pub use error::{CompletionError, NavigationError, PipelineError};
pub use pipeline::Pipeline;
pub use reconciler::{ParseOutcome, Reconciler};
pub use recommendation::{Recommendation, RecommendationSet};
pub use render::{Document, assemble};
pub use types::{ActionResult, AgentHistory, HistoryStep, NavigationTask, Step};
