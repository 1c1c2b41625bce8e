use crate::core::aggregator::AggregateOptions;
use crate::core::remapping::Remapping;
use crate::core::window::Window;
use crate::domain::model::{Dataset, Item, Metric, StatsResult, Unit};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Read-only query interface over units and items.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn units(&self) -> Result<Vec<Unit>>;
    async fn items(&self) -> Result<Vec<Item>>;
}

pub trait ConfigProvider: Send + Sync {
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn metrics(&self) -> &[Metric];
    fn window(&self) -> Window;
    fn aggregate_options(&self) -> &AggregateOptions;
    fn remapping(&self) -> &Remapping;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<StatsResult>;
    async fn load(&self, result: StatsResult) -> Result<String>;
}
