pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{file_source::FileSource, http_source::HttpSource};
pub use app::pipelines::AreaPipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::aggregator::{aggregate, AggregateOptions};
pub use core::engine::StatsEngine;
pub use core::reallocator::reallocate;
pub use core::remapping::{DuplicatePolicy, Remapping};
pub use core::window::{Window, WindowBasis};
pub use domain::model::{AggregateRow, AggregateTable, FlowEdge, FlowTable, Item, Metric, Unit};
pub use utils::error::{FlowError, Result};
