// Domain layer: ad inventory models and the ports the cacher consumes.

pub mod model;
pub mod ports;
