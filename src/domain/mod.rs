// Domain layer: draw data model and the ports the engine is wired through.

pub mod model;
pub mod ports;
