pub mod area_pipeline;

pub use area_pipeline::AreaPipeline;
