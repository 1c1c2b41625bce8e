// Application layer: concrete pipelines wiring sources, storage and config.

pub mod pipelines;
