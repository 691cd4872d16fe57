//! Sampling and aggregation engine.
//!
//! Samplers read the host through [`MetricsSource`] and [`HwTopology`], the
//! [`Scheduler`] runs them at independent cadences and keeps the latest
//! [`MetricSnapshot`], and the loops in [`tasks`] publish it and supervise
//! the transport.

pub mod counters;
mod device_names;
pub mod metrics;
mod runtime;
pub mod samplers;
pub mod source;
pub mod tasks;
mod temperatures;

pub use counters::{CounterDeltaEngine, CounterSnapshot, DiskCounters, NetCounters};
pub use device_names::{is_virtual_block_device, normalize_device_name};
pub use metrics::{Category, CategoryUpdate, MetricSnapshot, Payload};
pub use runtime::Scheduler;
pub use samplers::{host_samplers, Sampler, ScheduledSampler};
pub use source::{HwTopology, MetricsSource, SensorChip, SensorInput};
pub use temperatures::resolve_temperatures;

/// Seconds without a payload after which consumers treat a host as stale
pub const STALE_AFTER_SECS: u64 = 15;
