//! [`MetricsSource`] backed by `sysinfo`, with `/proc` and `/sys` filling in
//! what sysinfo does not expose (disk counters, cpufreq limits, link flags).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sysinfo::{Networks, System};

use super::procfs::read_diskstats;
use super::sysfs::SysfsTopology;
use crate::core::system_monitor::metrics::{
    CpuBlock, CpuFrequency, InterfaceMeta, MemoryBlock, RamUsage, SwapUsage,
};
use crate::core::system_monitor::{
    CounterSnapshot, DiskCounters, MetricsSource, NetCounters,
};
use crate::error::{HostwatchError, Result};

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64 * 100.0) as f32
    }
}

/// Host readings for one sampler. Each sampler owns its own instance, so
/// nothing here is shared across tasks.
pub struct SysinfoSource {
    system: System,
    networks: Option<Networks>,
    procfs_root: PathBuf,
    sysfs: SysfsTopology,
}

impl SysinfoSource {
    pub fn new(procfs_root: &Path, sysfs_root: &Path) -> Self {
        Self {
            system: System::new(),
            networks: None,
            procfs_root: procfs_root.to_path_buf(),
            sysfs: SysfsTopology::new(sysfs_root),
        }
    }

    /// Take a first CPU reading now. sysinfo reports usage as the delta
    /// between two refreshes, so without this the first sample is all 0 %.
    pub fn with_cpu_baseline(mut self) -> Self {
        self.system.refresh_cpu_all();
        self
    }

    /// cpufreq limits of the first CPU, in MHz
    fn frequency_limits(&self) -> (Option<f64>, Option<f64>) {
        let cpufreq = self.sysfs.root().join("devices/system/cpu/cpu0/cpufreq");
        let read_mhz = |file: &str| {
            std::fs::read_to_string(cpufreq.join(file))
                .ok()?
                .trim()
                .parse::<f64>()
                .ok()
                .map(|khz| khz / 1000.0)
        };
        (read_mhz("cpuinfo_min_freq"), read_mhz("cpuinfo_max_freq"))
    }
}

impl MetricsSource for SysinfoSource {
    fn cpu(&mut self) -> Result<CpuBlock> {
        self.system.refresh_cpu_all();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return Err(HostwatchError::source_read("no CPUs reported"));
        }

        let percent_per_core: Vec<f32> = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();
        let current =
            cpus.iter().map(|cpu| cpu.frequency() as f64).sum::<f64>() / cpus.len() as f64;
        let freq_mhz = (current > 0.0).then(|| {
            let (min, max) = self.frequency_limits();
            CpuFrequency { current, min, max }
        });

        let loadavg = if cfg!(unix) {
            let load = System::load_average();
            [Some(load.one), Some(load.five), Some(load.fifteen)]
        } else {
            [None, None, None]
        };

        Ok(CpuBlock {
            percent_total: self.system.global_cpu_usage(),
            count_logical: percent_per_core.len(),
            percent_per_core,
            freq_mhz,
            count_physical: System::physical_core_count(),
            loadavg,
        })
    }

    fn memory(&mut self) -> Result<MemoryBlock> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(HostwatchError::source_read("total memory reported as 0"));
        }
        let available = self.system.available_memory();
        let swap_total = self.system.total_swap();
        let swap_used = self.system.used_swap();

        Ok(MemoryBlock {
            ram: RamUsage {
                total,
                used: self.system.used_memory(),
                available,
                percent: percent(total.saturating_sub(available), total),
            },
            swap: SwapUsage {
                total: swap_total,
                used: swap_used,
                free: self.system.free_swap(),
                percent: percent(swap_used, swap_total),
            },
        })
    }

    fn boot_time(&self) -> Result<u64> {
        match System::boot_time() {
            0 => Err(HostwatchError::source_read("boot time unavailable")),
            boot_time => Ok(boot_time),
        }
    }

    fn disk_counters(&mut self) -> Result<CounterSnapshot<DiskCounters>> {
        if !cfg!(target_os = "linux") {
            return Err(HostwatchError::unsupported("disk counters need /proc/diskstats"));
        }
        read_diskstats(&self.procfs_root)
    }

    fn network_counters(&mut self) -> Result<CounterSnapshot<NetCounters>> {
        if let Some(networks) = self.networks.as_mut() {
            networks.refresh(true);
        }
        let networks = self
            .networks
            .get_or_insert_with(Networks::new_with_refreshed_list);

        Ok(networks
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    NetCounters {
                        bytes_recv: data.total_received(),
                        bytes_sent: data.total_transmitted(),
                    },
                )
            })
            .collect())
    }

    fn interface_meta(&mut self) -> HashMap<String, InterfaceMeta> {
        self.sysfs.interface_meta()
    }
}
