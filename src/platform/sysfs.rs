//! `/sys` readers: hwmon chips, block and NVMe topology, link metadata.
//!
//! Everything is rooted at a configurable directory so tests can build a
//! fake tree with `tempfile`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::system_monitor::metrics::{Duplex, InterfaceMeta};
use crate::core::system_monitor::{HwTopology, SensorChip, SensorInput};
use crate::error::Result;

/// `IFF_UP` in `/sys/class/net/<nic>/flags`
const IFF_UP: u32 = 0x1;

static TEMP_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^temp(\d+)_input$").expect("static input pattern must compile"));

static NVME_NAMESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^nvme\d+n\d+$").expect("static namespace pattern must compile"));

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_i64(path: &Path) -> Option<i64> {
    read_trimmed(path)?.parse().ok()
}

/// hwmon temperatures are in millidegrees Celsius
fn read_millidegrees(path: &Path) -> Option<f64> {
    read_i64(path).map(|m| m as f64 / 1000.0)
}

/// Directory entry names under `dir`, sorted. Missing directories are empty.
fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Temperature input indices of a hwmon directory, in numeric order
fn temp_indices(hwmon_dir: &Path) -> Vec<u32> {
    let mut indices: Vec<u32> = sorted_names(hwmon_dir)
        .iter()
        .filter_map(|name| TEMP_INPUT.captures(name)?.get(1)?.as_str().parse().ok())
        .collect();
    indices.sort_unstable();
    indices
}

/// Read-only view over a sysfs tree
#[derive(Debug, Clone)]
pub struct SysfsTopology {
    root: PathBuf,
}

impl SysfsTopology {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_chip(&self, node: PathBuf) -> Option<SensorChip> {
        let name = read_trimmed(&node.join("name"))?;
        let inputs = temp_indices(&node)
            .into_iter()
            .map(|n| SensorInput {
                label: read_trimmed(&node.join(format!("temp{}_label", n))),
                current: read_millidegrees(&node.join(format!("temp{}_input", n))),
                high: read_millidegrees(&node.join(format!("temp{}_max", n))),
                critical: read_millidegrees(&node.join(format!("temp{}_crit", n))),
            })
            .collect();
        Some(SensorChip { name, node, inputs })
    }

    /// hwmon directories registered under an NVMe controller, whichever
    /// layout the kernel uses
    fn controller_hwmon_dirs(&self, controller: &str) -> Vec<PathBuf> {
        let ctrl = self.root.join("class/nvme").join(controller);
        let nested = ctrl.join("device/hwmon");

        sorted_names(&ctrl)
            .into_iter()
            .filter(|name| name.starts_with("hwmon"))
            .map(|name| ctrl.join(name))
            .chain(sorted_names(&nested).into_iter().map(|name| nested.join(name)))
            .collect()
    }

    /// Link metadata for every interface under `class/net`
    pub fn interface_meta(&self) -> HashMap<String, InterfaceMeta> {
        let net = self.root.join("class/net");
        sorted_names(&net)
            .into_iter()
            .map(|nic| {
                let meta = read_interface_meta(&net.join(&nic));
                (nic, meta)
            })
            .collect()
    }
}

/// Unknown or negative values (e.g. `speed` of -1 on a down link) map to
/// `None`.
fn read_interface_meta(dir: &Path) -> InterfaceMeta {
    let isup = read_trimmed(&dir.join("flags"))
        .and_then(|flags| u32::from_str_radix(flags.trim_start_matches("0x"), 16).ok())
        .map(|flags| flags & IFF_UP != 0);
    let non_negative = |file: &str| {
        read_i64(&dir.join(file))
            .filter(|v| *v >= 0)
            .and_then(|v| u32::try_from(v).ok())
    };
    let duplex = read_trimmed(&dir.join("duplex")).map(|d| match d.as_str() {
        "full" => Duplex::Full,
        "half" => Duplex::Half,
        _ => Duplex::Unknown,
    });

    InterfaceMeta {
        isup,
        speed_mbps: non_negative("speed"),
        mtu: non_negative("mtu"),
        duplex,
    }
}

impl HwTopology for SysfsTopology {
    fn sensor_chips(&self) -> Result<Vec<SensorChip>> {
        let hwmon = self.root.join("class/hwmon");
        let mut nodes: Vec<PathBuf> = fs::read_dir(&hwmon)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        nodes.sort();
        Ok(nodes
            .into_iter()
            .filter_map(|node| self.read_chip(node))
            .collect())
    }

    fn device_node(&self, chip: &SensorChip) -> Option<PathBuf> {
        fs::canonicalize(chip.node.join("device")).ok()
    }

    fn parent(&self, node: &Path) -> Option<PathBuf> {
        node.parent()
            .filter(|p| p.parent().is_some())
            .map(Path::to_path_buf)
    }

    fn block_devices_at(&self, node: &Path) -> Vec<String> {
        sorted_names(&node.join("block"))
    }

    fn nvme_namespaces(&self) -> Vec<String> {
        sorted_names(&self.root.join("block"))
            .into_iter()
            .filter(|name| NVME_NAMESPACE.is_match(name))
            .collect()
    }

    fn namespace_device_node(&self, namespace: &str) -> Option<PathBuf> {
        fs::canonicalize(self.root.join("block").join(namespace).join("device")).ok()
    }

    fn is_nvme_controller(&self, name: &str) -> bool {
        self.root.join("class/nvme").join(name).exists()
    }

    fn controller_temperature(&self, controller: &str) -> Option<f64> {
        self.controller_hwmon_dirs(controller)
            .into_iter()
            .find_map(|dir| {
                let first = *temp_indices(&dir).first()?;
                read_millidegrees(&dir.join(format!("temp{}_input", first)))
            })
    }
}
