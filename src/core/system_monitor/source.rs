//! Capabilities the engine reads the host through.
//!
//! Samplers never touch `/proc`, `/sys` or sysinfo directly; they go through
//! [`MetricsSource`] and [`HwTopology`] so the engine can be driven by fakes
//! in tests and by platform implementations in production.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::counters::{CounterSnapshot, DiskCounters, NetCounters};
use super::metrics::{CpuBlock, InterfaceMeta, MemoryBlock};

/// Instantaneous and cumulative OS readings.
///
/// All calls are local, synchronous and expected to return quickly.
pub trait MetricsSource: Send {
    /// CPU utilization, per-core utilization, frequency, core counts and load
    fn cpu(&mut self) -> Result<CpuBlock>;

    /// RAM and swap usage
    fn memory(&mut self) -> Result<MemoryBlock>;

    /// Boot time as a Unix timestamp
    fn boot_time(&self) -> Result<u64>;

    /// Cumulative per block device counters, keyed by raw kernel name
    fn disk_counters(&mut self) -> Result<CounterSnapshot<DiskCounters>>;

    /// Cumulative per interface counters
    fn network_counters(&mut self) -> Result<CounterSnapshot<NetCounters>>;

    /// Link metadata per interface. Missing interfaces mean "unknown".
    fn interface_meta(&mut self) -> HashMap<String, InterfaceMeta>;
}

/// One hwmon-style sensor chip and its temperature inputs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorChip {
    pub name: String,
    /// Topology node of the chip itself (e.g. `/sys/class/hwmon/hwmon3`)
    pub node: PathBuf,
    pub inputs: Vec<SensorInput>,
}

/// A single `temp<N>_*` group, values in degrees Celsius
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorInput {
    pub label: Option<String>,
    pub current: Option<f64>,
    pub high: Option<f64>,
    pub critical: Option<f64>,
}

/// Read-only view of the hardware topology (hwmon chips, block devices and
/// NVMe controllers) used to attribute sensors to devices.
pub trait HwTopology: Send + Sync {
    /// Every hwmon chip with its temperature inputs, in stable order
    fn sensor_chips(&self) -> Result<Vec<SensorChip>>;

    /// Canonical device node the chip is attached to
    fn device_node(&self, chip: &SensorChip) -> Option<PathBuf>;

    /// Parent node, `None` at the root
    fn parent(&self, node: &Path) -> Option<PathBuf>;

    /// Block device names directly associated with a node
    fn block_devices_at(&self, node: &Path) -> Vec<String>;

    /// NVMe namespace block devices (`nvme<N>n<M>`), sorted
    fn nvme_namespaces(&self) -> Vec<String>;

    /// Canonical device node behind a namespace's block device
    fn namespace_device_node(&self, namespace: &str) -> Option<PathBuf>;

    /// Whether `name` is a registered NVMe controller
    fn is_nvme_controller(&self, name: &str) -> bool;

    /// First temperature input of the controller's own hwmon chip
    fn controller_temperature(&self, controller: &str) -> Option<f64>;
}
