// Domain layer: core models and ports (interfaces). No I/O happens here.

pub mod layer;
pub mod model;
pub mod ports;
