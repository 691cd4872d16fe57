//! Block device name normalization.
//!
//! Partitions and namespaces are collapsed onto the disk that owns them so
//! that per-partition counters can be aggregated under one logical name.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered rules: the first capture group of the first matching pattern is
/// the logical name.
static PARENT_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(nvme\d+n\d+)(?:p\d+)?$",
        r"^(sd[a-z]+)\d*$",
        r"^(mmcblk\d+)(?:p\d+)?$",
        r"^(md\d+)(?:p\d+)?$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static device pattern must compile"))
    .collect()
});

/// Map a raw kernel block device name to its logical parent.
///
/// `nvme0n1p2` -> `nvme0n1`, `sdb3` -> `sdb`, `mmcblk0p1` -> `mmcblk0`,
/// `md127p1` -> `md127`. Names matching no rule are returned unchanged.
pub fn normalize_device_name(name: &str) -> String {
    for rule in PARENT_RULES.iter() {
        if let Some(parent) = rule.captures(name).and_then(|caps| caps.get(1)) {
            return parent.as_str().to_string();
        }
    }
    name.to_string()
}

/// Loop devices and device-mapper aliases never take part in disk I/O
/// aggregation.
pub fn is_virtual_block_device(name: &str) -> bool {
    name.starts_with("loop") || name.starts_with("dm-")
}
