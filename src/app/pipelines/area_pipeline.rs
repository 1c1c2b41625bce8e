use crate::adapters::export;
use crate::core::aggregator::aggregate;
use crate::core::reallocator::reallocate;
use crate::core::{ConfigProvider, Dataset, Pipeline, RecordSource, Storage, StatsResult};
use crate::domain::model::Item;
use crate::utils::error::Result;

/// Area statistics pipeline: reads units and items, aggregates them into the
/// hierarchy table and writes one sunburst and one flow payload per metric.
pub struct AreaPipeline<R: RecordSource, S: Storage, C: ConfigProvider> {
    pub(crate) source: R,
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<R: RecordSource, S: Storage, C: ConfigProvider> AreaPipeline<R, S, C> {
    pub fn new(source: R, storage: S, config: C) -> Self {
        Self {
            source,
            storage,
            config,
        }
    }

    /// Drops items owned by the unattributed sentinel unit, which the
    /// aggregator would otherwise count towards its parent area.
    fn without_unattributed(&self, dataset: &Dataset) -> Vec<Item> {
        let sentinel = &self.config.aggregate_options().unattributed;
        let (kept, dropped): (Vec<&Item>, Vec<&Item>) =
            dataset.items.iter().partition(|item| &item.unit != sentinel);
        if !dropped.is_empty() {
            tracing::debug!("Dropped {} unattributed items", dropped.len());
        }
        kept.into_iter().cloned().collect()
    }
}

#[async_trait::async_trait]
impl<R: RecordSource, S: Storage, C: ConfigProvider> Pipeline for AreaPipeline<R, S, C> {
    async fn extract(&self) -> Result<Dataset> {
        let units = self.source.units().await?;
        let items = self.source.items().await?;
        tracing::debug!("Record source returned {} units, {} items", units.len(), items.len());
        Ok(Dataset { units, items })
    }

    async fn transform(&self, data: Dataset) -> Result<StatsResult> {
        let window = self.config.window();
        tracing::info!("Aggregating with window: {}", window.description());

        let items = self.without_unattributed(&data);
        let table = aggregate(&items, &data.units, &window, self.config.aggregate_options())?;

        let remapping = self.config.remapping();
        let flows = self
            .config
            .metrics()
            .iter()
            .map(|metric| reallocate(&table, remapping, *metric))
            .collect();

        Ok(StatsResult { table, flows })
    }

    async fn load(&self, result: StatsResult) -> Result<String> {
        let formats = self.config.output_formats();
        let wants = |format: &str| formats.iter().any(|f| f == format);

        for flows in &result.flows {
            let metric = flows.metric;
            if wants("csv") {
                self.storage
                    .write_file(
                        &format!("area-{}.csv", metric),
                        &export::sunburst_csv(&result.table, metric)?,
                    )
                    .await?;
                self.storage
                    .write_file(
                        &format!("area-{}-sankey.csv", metric),
                        &export::flows_csv(flows)?,
                    )
                    .await?;
            }
            if wants("json") {
                let sunburst = serde_json::to_vec_pretty(&export::sunburst_rows(&result.table, metric))?;
                self.storage
                    .write_file(&format!("area-{}.json", metric), &sunburst)
                    .await?;
                let sankey = serde_json::to_vec_pretty(&export::sankey_payload(flows))?;
                self.storage
                    .write_file(&format!("area-{}-sankey.json", metric), &sankey)
                    .await?;
            }
        }

        if wants("json") {
            let table = serde_json::to_vec_pretty(&result.table)?;
            self.storage.write_file("area-table.json", &table).await?;
        }

        tracing::debug!("Wrote outputs for {} metrics", result.flows.len());
        Ok(self.config.output_path().to_string())
    }
}
