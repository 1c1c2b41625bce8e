// Domain layer: hierarchy records, aggregate/flow tables and the ports the pipeline talks through.

pub mod model;
pub mod ports;
