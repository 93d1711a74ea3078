// Domain layer: the record model and the storage port.

pub mod model;
pub mod ports;
