pub mod aggregator;
pub mod engine;
pub mod reallocator;
pub mod remapping;
pub mod window;

pub use crate::domain::model::{AggregateTable, Dataset, FlowTable, StatsResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, RecordSource, Storage};
pub use crate::utils::error::Result;
