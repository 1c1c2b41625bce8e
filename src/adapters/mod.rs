// Adapters layer: concrete record sources and the chart payload export.

pub mod export;
pub mod file_source;
pub mod http_source;
