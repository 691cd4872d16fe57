//! Temperature resolution.
//!
//! Thermal sensors show up as anonymous hwmon chips. Generic chips (CPU and
//! GPU packages) are reported under their chip name, while disk sensors are
//! attributed to the block device that owns them:
//!
//! - `drivetemp` chips are walked up the device tree until a block device is
//!   found, falling back to the literal chip name;
//! - NVMe controllers report one composite temperature that is attached to
//!   every namespace of that controller, with the generic `nvme` chip as a
//!   last resort for namespaces still uncovered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::metrics::{TemperatureBlock, TemperatureReading};
use super::source::{HwTopology, SensorChip};

const DRIVETEMP_CHIP: &str = "drivetemp";
const NVME_CHIP: &str = "nvme";
const COMPOSITE_LABEL: &str = "Composite";

/// Upper bound on parent hops, in case a topology reports a cycle
const MAX_WALK_DEPTH: usize = 64;

static DRIVE_BLOCK_DEVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(sd[a-z]+|mmcblk\d+|vd[a-z]+)$").expect("static block pattern must compile")
});

static NVME_CONTROLLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^nvme\d+$").expect("static controller pattern must compile"));

/// Resolve every discoverable temperature sensor.
///
/// Returns `None` only when no reading at all was found, so consumers can
/// tell "no thermal data on this host" from an empty but valid block.
pub fn resolve_temperatures(topology: &dyn HwTopology) -> Option<TemperatureBlock> {
    let chips = topology.sensor_chips().unwrap_or_else(|e| {
        log::debug!("hwmon enumeration failed: {}", e);
        Vec::new()
    });

    let mut block = TemperatureBlock::new();

    for chip in chips
        .iter()
        .filter(|c| c.name != DRIVETEMP_CHIP && c.name != NVME_CHIP)
    {
        append_readings(&mut block, &chip.name, chip_readings(chip));
    }

    for chip in chips.iter().filter(|c| c.name == DRIVETEMP_CHIP) {
        let key = resolve_drive_block(topology, chip).unwrap_or_else(|| {
            log::debug!("No block device found for {}", chip.node.display());
            DRIVETEMP_CHIP.to_string()
        });
        append_readings(&mut block, &key, chip_readings(chip));
    }

    let namespaces = topology.nvme_namespaces();
    attach_controller_temperatures(topology, &namespaces, &mut block);

    let generic_nvme = chips
        .iter()
        .filter(|c| c.name == NVME_CHIP)
        .flat_map(|c| c.inputs.iter())
        .find_map(|input| input.current);
    if let Some(current) = generic_nvme {
        for namespace in &namespaces {
            block
                .entry(namespace.clone())
                .or_insert_with(|| vec![composite(current)]);
        }
    }

    if block.is_empty() {
        None
    } else {
        Some(block)
    }
}

fn chip_readings(chip: &SensorChip) -> Vec<TemperatureReading> {
    chip.inputs
        .iter()
        .filter_map(|input| {
            Some(TemperatureReading {
                label: input.label.clone().unwrap_or_default(),
                current: input.current?,
                high: input.high,
                critical: input.critical,
            })
        })
        .collect()
}

fn append_readings(block: &mut TemperatureBlock, key: &str, readings: Vec<TemperatureReading>) {
    if readings.is_empty() {
        return;
    }
    block.entry(key.to_string()).or_default().extend(readings);
}

fn composite(current: f64) -> TemperatureReading {
    TemperatureReading {
        label: COMPOSITE_LABEL.to_string(),
        current,
        high: None,
        critical: None,
    }
}

/// Walk from `start` towards the root, returning the first node accepted by
/// `visit`.
fn walk_up<T>(
    topology: &dyn HwTopology,
    start: PathBuf,
    mut visit: impl FnMut(&Path) -> Option<T>,
) -> Option<T> {
    let mut node = start;
    for _ in 0..MAX_WALK_DEPTH {
        if let Some(found) = visit(&node) {
            return Some(found);
        }
        node = topology.parent(&node)?;
    }
    None
}

/// Block device owning a `drivetemp` chip: checked at the chip's device node
/// first, then at each ancestor.
fn resolve_drive_block(topology: &dyn HwTopology, chip: &SensorChip) -> Option<String> {
    let device = topology.device_node(chip)?;
    walk_up(topology, device, |node| {
        topology
            .block_devices_at(node)
            .into_iter()
            .find(|name| DRIVE_BLOCK_DEVICE.is_match(name))
    })
}

/// Controller (`nvme<N>`) owning a namespace, found by walking up from the
/// namespace's device link.
fn namespace_controller(topology: &dyn HwTopology, namespace: &str) -> Option<String> {
    let device = topology.namespace_device_node(namespace)?;
    walk_up(topology, device, |node| {
        let name = node.file_name()?.to_str()?;
        (NVME_CONTROLLER.is_match(name) && topology.is_nvme_controller(name))
            .then(|| name.to_string())
    })
}

/// Read each controller's temperature once and attach it to all of its
/// namespaces.
fn attach_controller_temperatures(
    topology: &dyn HwTopology,
    namespaces: &[String],
    block: &mut TemperatureBlock,
) {
    let mut controller_temps: HashMap<String, Option<f64>> = HashMap::new();

    for namespace in namespaces {
        let Some(controller) = namespace_controller(topology, namespace) else {
            log::debug!("No controller found for {}", namespace);
            continue;
        };
        let temperature = *controller_temps
            .entry(controller)
            .or_insert_with_key(|ctl| topology.controller_temperature(ctl));

        if let Some(current) = temperature {
            block
                .entry(namespace.clone())
                .or_default()
                .push(composite(current));
        }
    }
}
