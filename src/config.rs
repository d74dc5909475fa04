use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::completion::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::hands::{ChromeOptions, DEFAULT_DEBUG_URL};
use crate::types::{
    DEFAULT_MAX_FAILURES, DEFAULT_MAX_STEPS, NavigationTask, family_movie_goal,
};

pub const DEFAULT_SITE_URL: &str = "https://hotcinema.co.il";
pub const DEFAULT_OUTPUT: &str = "ai_family_movie_recommendations.html";

/// Browse a cinema site and build a bilingual family movie page.
#[derive(Debug, Clone, Parser)]
#[command(name = "family-movie-agent", version, about)]
pub struct Config {
    /// Cinema listing site the agent starts from.
    #[arg(long, env = "HOT_CINEMAS_URL", default_value = DEFAULT_SITE_URL)]
    pub site_url: String,

    /// Where the HTML page is written.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,

    /// Consecutive failed steps before the agent gives up.
    #[arg(long, default_value_t = DEFAULT_MAX_FAILURES)]
    pub max_failures: usize,

    #[arg(long, default_value_t = 5)]
    pub retry_delay_secs: u64,

    /// Do not send screenshots to the model.
    #[arg(long)]
    pub no_vision: bool,

    #[arg(long)]
    pub headless: bool,

    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// DevTools endpoint of a running Chrome to attach to before launching one.
    /// An `http://` address is resolved through `/json/version`; `ws://` is used as is.
    #[arg(long, default_value = DEFAULT_DEBUG_URL)]
    pub debug_url: String,

    /// Give up on navigation after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Shorthand for --log-level debug.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn navigation_task(&self) -> NavigationTask {
        NavigationTask::new(family_movie_goal(&self.site_url))
            .with_budgets(self.max_steps, self.max_failures)
            .with_retry_delay(Duration::from_secs(self.retry_delay_secs))
            .with_vision(!self.no_vision)
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            debug_url: Some(self.debug_url.clone()).filter(|url| !url.is_empty()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn log_level(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }
}
