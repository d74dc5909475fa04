use std::path::Path;

use tracing::info;

use crate::completion::TextCompletion;
use crate::driver::{NavigationDriver, Navigator};
use crate::error::PipelineError;
use crate::reconciler::Reconciler;
use crate::render::{Document, assemble};
use crate::types::NavigationTask;

/// Navigation, then reconciliation, then rendering, once per invocation.
pub struct Pipeline<N, C> {
    driver: NavigationDriver<N>,
    reconciler: Reconciler<C>,
}

impl<N: Navigator, C: TextCompletion> Pipeline<N, C> {
    pub fn new(driver: NavigationDriver<N>, reconciler: Reconciler<C>) -> Self {
        Self { driver, reconciler }
    }

    pub async fn run(&mut self, task: NavigationTask) -> Result<Document, PipelineError> {
        let transcript = self.driver.run(task).await?;
        info!(chars = transcript.chars().count(), "harvested transcript");

        let recommendations = self.reconciler.reconcile(&transcript).await?;
        let document = assemble(&recommendations);
        info!(cards = recommendations.len(), "assembled document");
        Ok(document)
    }

    /// Runs and writes the page. Nothing is written when the run fails.
    pub async fn run_to_file(
        &mut self,
        task: NavigationTask,
        output: &Path,
    ) -> Result<Document, PipelineError> {
        let document = self.run(task).await?;
        document.write_to(output).await?;
        info!(path = %output.display(), "wrote recommendations page");
        Ok(document)
    }
}
