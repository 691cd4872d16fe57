//! Async loops driving the engine.
//!
//! Every loop owns an `interval` with `MissedTickBehavior::Skip` and stops
//! on the shared broadcast shutdown signal.

mod publisher;
mod reconnect;
mod sampler;

pub use publisher::{publish_once, publisher_task};
pub use reconnect::{reconnect_task, supervise_once};
pub use sampler::sampler_task;
