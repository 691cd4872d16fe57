//! Rate computation over cumulative OS counters.
//!
//! A [`CounterDeltaEngine`] keeps the previous [`CounterSnapshot`] of one
//! category and turns each new snapshot into per-second rates. Entities seen
//! for the first time, and entities whose counters went backwards, produce no
//! rate for that tick.

use std::collections::HashMap;

use super::device_names::{is_virtual_block_device, normalize_device_name};
use super::metrics::{
    DiskIoBlock, DiskIoEntry, DiskRate, InterfaceMeta, NetCumulative, NetRate, NetworkIoBlock,
    NicEntry,
};

/// Lower bound for the elapsed time fed to a rate computation
pub const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Entity identifier (device or interface name) to its cumulative counters
pub type CounterSnapshot<C> = HashMap<String, C>;

/// Cumulative block device counters, as exposed by `/proc/diskstats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
}

/// Cumulative network interface counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// A tuple of monotonically non-decreasing counters.
pub trait Counters: Copy {
    type Rate;

    /// Per-second rate since `previous`, or `None` if any counter decreased.
    fn rate_since(&self, previous: &Self, elapsed_secs: f64) -> Option<Self::Rate>;
}

fn per_second(current: u64, previous: u64, elapsed_secs: f64) -> Option<f64> {
    current
        .checked_sub(previous)
        .map(|delta| delta as f64 / elapsed_secs)
}

impl Counters for DiskCounters {
    type Rate = DiskRate;

    fn rate_since(&self, previous: &Self, elapsed_secs: f64) -> Option<DiskRate> {
        Some(DiskRate {
            read_bytes_per_s: per_second(self.read_bytes, previous.read_bytes, elapsed_secs)?,
            write_bytes_per_s: per_second(self.write_bytes, previous.write_bytes, elapsed_secs)?,
            read_iops: per_second(self.read_count, previous.read_count, elapsed_secs)?,
            write_iops: per_second(self.write_count, previous.write_count, elapsed_secs)?,
        })
    }
}

impl Counters for NetCounters {
    type Rate = NetRate;

    fn rate_since(&self, previous: &Self, elapsed_secs: f64) -> Option<NetRate> {
        Some(NetRate {
            rx_bytes_per_s: per_second(self.bytes_recv, previous.bytes_recv, elapsed_secs)?,
            tx_bytes_per_s: per_second(self.bytes_sent, previous.bytes_sent, elapsed_secs)?,
        })
    }
}

/// Rate computed for one entity on one tick
pub struct EntityRate<C: Counters> {
    pub entity: String,
    pub current: C,
    pub rate: C::Rate,
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Holds the previous snapshot of one counter category.
#[derive(Debug, Clone)]
pub struct CounterDeltaEngine<C> {
    previous: CounterSnapshot<C>,
}

impl<C: Counters> CounterDeltaEngine<C> {
    pub fn new() -> Self {
        Self {
            previous: HashMap::new(),
        }
    }

    /// Start from an already captured snapshot
    pub fn with_previous(previous: CounterSnapshot<C>) -> Self {
        Self { previous }
    }

    pub fn previous(&self) -> &CounterSnapshot<C> {
        &self.previous
    }

    /// Compute rates for every entity of `current` that also has a previous
    /// value, then make `current` the new previous snapshot.
    ///
    /// The replace is unconditional: skipped entities still get their
    /// current counters recorded for the next call.
    pub fn advance(&mut self, current: CounterSnapshot<C>, elapsed_secs: f64) -> Vec<EntityRate<C>> {
        let elapsed = elapsed_secs.max(MIN_ELAPSED_SECS);
        let mut rates = Vec::with_capacity(current.len());

        for (entity, counters) in &current {
            let Some(previous) = self.previous.get(entity) else {
                continue;
            };
            match counters.rate_since(previous, elapsed) {
                Some(rate) => rates.push(EntityRate {
                    entity: entity.clone(),
                    current: *counters,
                    rate,
                }),
                None => log::debug!("Counter reset on {}, skipping this tick", entity),
            }
        }

        self.previous = current;
        rates
    }
}

impl<C: Counters> Default for CounterDeltaEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterDeltaEngine<DiskCounters> {
    /// Disk I/O block grouped by logical device name.
    ///
    /// Virtual devices are dropped; partitions are summed onto their disk.
    pub fn disk_io_block(
        &mut self,
        current: CounterSnapshot<DiskCounters>,
        elapsed_secs: f64,
    ) -> DiskIoBlock {
        let mut block = DiskIoBlock::new();

        for EntityRate { entity, rate, .. } in self.advance(current, elapsed_secs) {
            if is_virtual_block_device(&entity) {
                continue;
            }
            let entry = block
                .entry(normalize_device_name(&entity))
                .or_insert_with(DiskIoEntry::default);
            entry.rate.read_bytes_per_s += rate.read_bytes_per_s;
            entry.rate.write_bytes_per_s += rate.write_bytes_per_s;
            entry.rate.read_iops += rate.read_iops;
            entry.rate.write_iops += rate.write_iops;
        }

        for entry in block.values_mut() {
            let rate = &mut entry.rate;
            rate.read_bytes_per_s = round3(rate.read_bytes_per_s);
            rate.write_bytes_per_s = round3(rate.write_bytes_per_s);
            rate.read_iops = round3(rate.read_iops);
            rate.write_iops = round3(rate.write_iops);
        }

        block
    }
}

impl CounterDeltaEngine<NetCounters> {
    /// Network I/O block keyed by interface, with a total over the interfaces
    /// that produced a rate this tick.
    pub fn network_io_block(
        &mut self,
        current: CounterSnapshot<NetCounters>,
        meta: &HashMap<String, InterfaceMeta>,
        elapsed_secs: f64,
    ) -> NetworkIoBlock {
        let mut block = NetworkIoBlock::default();

        for EntityRate {
            entity,
            current,
            rate,
        } in self.advance(current, elapsed_secs)
        {
            block.total.rate.rx_bytes_per_s += rate.rx_bytes_per_s;
            block.total.rate.tx_bytes_per_s += rate.tx_bytes_per_s;
            block.total.cumulative.bytes_recv += current.bytes_recv;
            block.total.cumulative.bytes_sent += current.bytes_sent;

            let nic = NicEntry {
                rate: NetRate {
                    rx_bytes_per_s: round3(rate.rx_bytes_per_s),
                    tx_bytes_per_s: round3(rate.tx_bytes_per_s),
                },
                cumulative: NetCumulative {
                    bytes_recv: current.bytes_recv,
                    bytes_sent: current.bytes_sent,
                },
                meta: meta.get(&entity).cloned().unwrap_or_default(),
            };
            block.per_nic.insert(entity, nic);
        }

        block.total.rate.rx_bytes_per_s = round3(block.total.rate.rx_bytes_per_s);
        block.total.rate.tx_bytes_per_s = round3(block.total.rate.tx_bytes_per_s);
        block
    }
}
