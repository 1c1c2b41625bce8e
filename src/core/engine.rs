use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct StatsEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> StatsEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting area statistics run");

        // Extract
        let dataset = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} units and {} items",
            dataset.units.len(),
            dataset.items.len()
        );

        // Transform
        let result = self.pipeline.transform(dataset).await?;
        tracing::info!(
            "Built {} hierarchy rows and {} flow tables",
            result.table.rows.len(),
            result.flows.len()
        );

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!(
            "Output saved to: {} ({:?})",
            output_path,
            started.elapsed()
        );

        Ok(output_path)
    }
}
