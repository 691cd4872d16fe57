//! One sampler per metric category.
//!
//! A sampler turns a call into a complete [`CategoryUpdate`] or an error; it
//! never yields a partially filled block. Samplers own whatever state they
//! need between calls (previous counters, last sample time).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::core::config::AgentConfig;
use crate::error::Result;
use crate::platform::{SysfsTopology, SysinfoSource};

use super::counters::{CounterDeltaEngine, DiskCounters, NetCounters};
use super::metrics::{Category, CategoryUpdate, SystemBlock};
use super::source::{HwTopology, MetricsSource};
use super::temperatures::resolve_temperatures;

pub trait Sampler: Send {
    fn category(&self) -> Category;

    fn sample(&mut self) -> Result<CategoryUpdate>;
}

/// A sampler paired with the interval it runs at
pub struct ScheduledSampler {
    pub sampler: Box<dyn Sampler>,
    pub every: Duration,
}

impl ScheduledSampler {
    pub fn new(sampler: impl Sampler + 'static, every: Duration) -> Self {
        Self {
            sampler: Box::new(sampler),
            every,
        }
    }
}

pub struct CpuSampler<S> {
    source: S,
}

impl<S: MetricsSource> CpuSampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: MetricsSource> Sampler for CpuSampler<S> {
    fn category(&self) -> Category {
        Category::Cpu
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        self.source.cpu().map(CategoryUpdate::Cpu)
    }
}

pub struct MemorySampler<S> {
    source: S,
}

impl<S: MetricsSource> MemorySampler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: MetricsSource> Sampler for MemorySampler<S> {
    fn category(&self) -> Category {
        Category::Memory
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        self.source.memory().map(CategoryUpdate::Memory)
    }
}

/// Uptime, host identity and our own pid
pub struct SystemSampler<S> {
    source: S,
    hostname: String,
    pid: u32,
}

impl<S: MetricsSource> SystemSampler<S> {
    pub fn new(source: S, hostname: String) -> Self {
        Self {
            source,
            hostname,
            pid: std::process::id(),
        }
    }
}

impl<S: MetricsSource> Sampler for SystemSampler<S> {
    fn category(&self) -> Category {
        Category::System
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        let boot_time = self.source.boot_time()?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;

        Ok(CategoryUpdate::System(SystemBlock {
            uptime_sec: now.saturating_sub(boot_time),
            hostname: self.hostname.clone(),
            pid: self.pid,
        }))
    }
}

/// Time since the previous successful sample, `0.0` on the first one
fn elapsed_since(last: &mut Option<Instant>) -> f64 {
    let now = Instant::now();
    let elapsed = last
        .map(|t| now.duration_since(t).as_secs_f64())
        .unwrap_or(0.0);
    *last = Some(now);
    elapsed
}

pub struct DiskIoSampler<S> {
    source: S,
    engine: CounterDeltaEngine<DiskCounters>,
    last_sample: Option<Instant>,
}

impl<S: MetricsSource> DiskIoSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            engine: CounterDeltaEngine::new(),
            last_sample: None,
        }
    }
}

impl<S: MetricsSource> Sampler for DiskIoSampler<S> {
    fn category(&self) -> Category {
        Category::DiskIo
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        let counters = self.source.disk_counters()?;
        let elapsed = elapsed_since(&mut self.last_sample);
        Ok(CategoryUpdate::DiskIo(
            self.engine.disk_io_block(counters, elapsed),
        ))
    }
}

pub struct NetworkIoSampler<S> {
    source: S,
    engine: CounterDeltaEngine<NetCounters>,
    last_sample: Option<Instant>,
}

impl<S: MetricsSource> NetworkIoSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            engine: CounterDeltaEngine::new(),
            last_sample: None,
        }
    }
}

impl<S: MetricsSource> Sampler for NetworkIoSampler<S> {
    fn category(&self) -> Category {
        Category::NetworkIo
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        let counters = self.source.network_counters()?;
        let meta = self.source.interface_meta();
        let elapsed = elapsed_since(&mut self.last_sample);
        Ok(CategoryUpdate::NetworkIo(
            self.engine.network_io_block(counters, &meta, elapsed),
        ))
    }
}

pub struct TemperatureSampler {
    topology: Arc<dyn HwTopology>,
}

impl TemperatureSampler {
    pub fn new(topology: Arc<dyn HwTopology>) -> Self {
        Self { topology }
    }
}

impl Sampler for TemperatureSampler {
    fn category(&self) -> Category {
        Category::Temperatures
    }

    fn sample(&mut self) -> Result<CategoryUpdate> {
        Ok(CategoryUpdate::Temperatures(resolve_temperatures(
            self.topology.as_ref(),
        )))
    }
}

/// The production sampler set, reading this host at the configured cadences
pub fn host_samplers(config: &AgentConfig) -> Vec<ScheduledSampler> {
    let cadences = &config.cadences;
    let source = || SysinfoSource::new(&config.procfs_root, &config.sysfs_root);
    let topology: Arc<dyn HwTopology> = Arc::new(SysfsTopology::new(&config.sysfs_root));

    vec![
        ScheduledSampler::new(
            CpuSampler::new(source().with_cpu_baseline()),
            cadences.fast(),
        ),
        ScheduledSampler::new(MemorySampler::new(source()), cadences.fast()),
        ScheduledSampler::new(
            SystemSampler::new(source(), config.hostname()),
            cadences.fast(),
        ),
        ScheduledSampler::new(NetworkIoSampler::new(source()), cadences.fast()),
        ScheduledSampler::new(DiskIoSampler::new(source()), cadences.disk()),
        ScheduledSampler::new(TemperatureSampler::new(topology), cadences.temperatures()),
    ]
}
