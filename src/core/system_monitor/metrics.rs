use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::transport::TransportStatsSnapshot;

/// Metric categories, each sampled on its own cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cpu,
    Memory,
    DiskIo,
    NetworkIo,
    Temperatures,
    System,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cpu,
        Category::Memory,
        Category::DiskIo,
        Category::NetworkIo,
        Category::Temperatures,
        Category::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cpu => "cpu",
            Category::Memory => "memory",
            Category::DiskIo => "disk_io",
            Category::NetworkIo => "network_io",
            Category::Temperatures => "temperatures",
            Category::System => "system",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuBlock {
    pub percent_total: f32,
    pub percent_per_core: Vec<f32>,
    pub freq_mhz: Option<CpuFrequency>,
    pub count_logical: usize,
    pub count_physical: Option<usize>,
    pub loadavg: [Option<f64>; 3], // 1, 5, 15 min
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuFrequency {
    pub current: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub ram: RamUsage,
    pub swap: SwapUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RamUsage {
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemBlock {
    pub uptime_sec: u64,
    pub hostname: String,
    pub pid: u32,
}

/// Per logical disk rates, keyed by normalized device name
pub type DiskIoBlock = BTreeMap<String, DiskIoEntry>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskIoEntry {
    pub rate: DiskRate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskRate {
    pub read_bytes_per_s: f64,
    pub write_bytes_per_s: f64,
    pub read_iops: f64,
    pub write_iops: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkIoBlock {
    pub per_nic: BTreeMap<String, NicEntry>,
    pub total: NetworkTotal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NicEntry {
    pub rate: NetRate,
    pub cumulative: NetCumulative,
    pub meta: InterfaceMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkTotal {
    pub rate: NetRate,
    pub cumulative: NetCumulative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetRate {
    pub rx_bytes_per_s: f64,
    pub tx_bytes_per_s: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetCumulative {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// Static link metadata; every field is null when the platform cannot tell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMeta {
    pub isup: Option<bool>,
    pub speed_mbps: Option<u32>,
    pub mtu: Option<u32>,
    pub duplex: Option<Duplex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Duplex {
    Full,
    Half,
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub label: String,
    pub current: f64,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

/// Source name (chip or logical device) to its readings
pub type TemperatureBlock = BTreeMap<String, Vec<TemperatureReading>>;

/// One complete block for a single category.
///
/// Samplers produce these; the orchestrator swaps them into the snapshot
/// whole, so a block is never observed half-written.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryUpdate {
    Cpu(CpuBlock),
    Memory(MemoryBlock),
    DiskIo(DiskIoBlock),
    NetworkIo(NetworkIoBlock),
    /// `None` means no thermal data was discoverable at all
    Temperatures(Option<TemperatureBlock>),
    System(SystemBlock),
}

impl CategoryUpdate {
    pub fn category(&self) -> Category {
        match self {
            CategoryUpdate::Cpu(_) => Category::Cpu,
            CategoryUpdate::Memory(_) => Category::Memory,
            CategoryUpdate::DiskIo(_) => Category::DiskIo,
            CategoryUpdate::NetworkIo(_) => Category::NetworkIo,
            CategoryUpdate::Temperatures(_) => Category::Temperatures,
            CategoryUpdate::System(_) => Category::System,
        }
    }
}

/// Latest block per category. `None` until the first successful sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub system: Option<SystemBlock>,
    pub cpu: Option<CpuBlock>,
    pub memory: Option<MemoryBlock>,
    pub disk_io: Option<DiskIoBlock>,
    pub temperatures: Option<TemperatureBlock>,
    pub network_io: Option<NetworkIoBlock>,
}

impl MetricSnapshot {
    /// Replace the block for the update's category.
    pub fn apply(&mut self, update: CategoryUpdate) {
        match update {
            CategoryUpdate::Cpu(cpu) => self.cpu = Some(cpu),
            CategoryUpdate::Memory(memory) => self.memory = Some(memory),
            CategoryUpdate::DiskIo(disk_io) => self.disk_io = Some(disk_io),
            CategoryUpdate::NetworkIo(network_io) => self.network_io = Some(network_io),
            CategoryUpdate::Temperatures(temperatures) => self.temperatures = temperatures,
            CategoryUpdate::System(system) => self.system = Some(system),
        }
    }

    pub fn is_populated(&self, category: Category) -> bool {
        match category {
            Category::Cpu => self.cpu.is_some(),
            Category::Memory => self.memory.is_some(),
            Category::DiskIo => self.disk_io.is_some(),
            Category::NetworkIo => self.network_io.is_some(),
            Category::Temperatures => self.temperatures.is_some(),
            Category::System => self.system.is_some(),
        }
    }
}

/// The message published once per publish tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub ts: i64, // Unix timestamp
    pub host: String,
    pub system: Option<SystemBlock>,
    pub cpu: Option<CpuBlock>,
    pub memory: Option<MemoryBlock>,
    pub disk_io: Option<DiskIoBlock>,
    pub temperatures: Option<TemperatureBlock>,
    pub network_io: Option<NetworkIoBlock>,
    pub mqtt_stats: TransportStatsSnapshot,
}

impl Payload {
    pub fn new(host: &str, snapshot: &MetricSnapshot, mqtt_stats: TransportStatsSnapshot) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp(),
            host: host.to_string(),
            system: snapshot.system.clone(),
            cpu: snapshot.cpu.clone(),
            memory: snapshot.memory.clone(),
            disk_io: snapshot.disk_io.clone(),
            temperatures: snapshot.temperatures.clone(),
            network_io: snapshot.network_io.clone(),
            mqtt_stats,
        }
    }

    /// Compact JSON, no whitespace
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
