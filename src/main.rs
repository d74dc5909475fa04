use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use family_movie_agent::hands::BrowserSession;
use family_movie_agent::{
    BrowserAgent, Config, NavigationDriver, OpenAiClient, Pipeline, Reconciler,
};

const NAVIGATION_TEMPERATURE: f32 = 0.2;
const RECONCILE_TEMPERATURE: f32 = 0.5;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::parse();
    init_logging(config.log_level())?;

    run(&config).await
}

async fn run(config: &Config) -> Result<()> {
    let client = OpenAiClient::from_env(&config.model)?.with_api_base(&config.api_base);
    let navigation_model = client.clone().with_temperature(NAVIGATION_TEMPERATURE);
    let reconcile_model = client.with_temperature(RECONCILE_TEMPERATURE);

    info!(site = %config.site_url, "launching Chrome");
    let session = BrowserSession::start(config.chrome_options()).await?;

    let driver = NavigationDriver::new(BrowserAgent::new(session, navigation_model))
        .with_timeout(config.timeout());
    let mut pipeline = Pipeline::new(driver, Reconciler::new(reconcile_model));

    let document = pipeline
        .run_to_file(config.navigation_task(), &config.output)
        .await
        .context("pipeline failed")?;

    info!(
        cards = document.card_count(),
        path = %config.output.display(),
        "done"
    );
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("Invalid log level")?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
