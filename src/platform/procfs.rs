//! `/proc` readers.

use std::fs;
use std::path::Path;

use crate::core::system_monitor::{CounterSnapshot, DiskCounters};
use crate::error::Result;

/// `/proc/diskstats` always counts 512 byte sectors, whatever the device's
/// real sector size.
pub const SECTOR_BYTES: u64 = 512;

/// Parse `/proc/diskstats` into per device counters.
///
/// Columns used (0-based, whitespace separated): 2 name, 3 reads completed,
/// 5 sectors read, 7 writes completed, 9 sectors written. Short or malformed
/// lines are skipped.
pub fn parse_diskstats(text: &str) -> CounterSnapshot<DiskCounters> {
    text.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let num = |i: usize| fields[i].parse::<u64>().ok();
            let counters = DiskCounters {
                read_count: num(3)?,
                read_bytes: num(5)?.saturating_mul(SECTOR_BYTES),
                write_count: num(7)?,
                write_bytes: num(9)?.saturating_mul(SECTOR_BYTES),
            };
            Some((fields[2].to_string(), counters))
        })
        .collect()
}

pub fn read_diskstats(procfs_root: &Path) -> Result<CounterSnapshot<DiskCounters>> {
    let text = fs::read_to_string(procfs_root.join("diskstats"))?;
    Ok(parse_diskstats(&text))
}
