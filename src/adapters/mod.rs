// Adapters layer: concrete implementations of the domain ports (clock, scheduler, listener, provider).

pub mod clock;
pub mod listener;
pub mod scheduler;
pub mod simulated;
