//! Temperature resolution over a fake sysfs tree laid out like a real one:
//! class entries are symlinks into `devices/`.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use hostwatch::core::system_monitor::{resolve_temperatures, HwTopology};
use hostwatch::platform::SysfsTopology;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn hwmon(dir: &Path, name: &str, inputs: &[(u32, i64)]) {
    write(&dir.join("name"), &format!("{}\n", name));
    for (n, millidegrees) in inputs {
        write(
            &dir.join(format!("temp{}_input", n)),
            &format!("{}\n", millidegrees),
        );
    }
}

/// A host with a CPU package sensor, one SATA disk with drivetemp and one
/// NVMe controller with two namespaces.
fn fake_sysfs() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let devices = root.join("devices/pci0000:00");

    // k10temp on the CPU
    let k10 = devices.join("0000:00:18.3/hwmon/hwmon0");
    hwmon(&k10, "k10temp", &[(1, 48250)]);
    write(&k10.join("temp1_label"), "Tctl\n");

    // drivetemp lives on the SCSI device, the block device one level down
    let scsi = devices.join("0000:00:17.0/ata1/host0/target0:0:0/0:0:0:0");
    fs::create_dir_all(scsi.join("block/sda/sda1")).unwrap();
    let drivetemp = scsi.join("hwmon/hwmon1");
    hwmon(&drivetemp, "drivetemp", &[(1, 35000)]);
    write(&drivetemp.join("temp1_max"), "60000\n");
    symlink(&scsi, drivetemp.join("device")).unwrap();

    // NVMe controller with its own hwmon and two namespaces
    let nvme0 = devices.join("0000:01:00.0/nvme/nvme0");
    fs::create_dir_all(nvme0.join("nvme0n1")).unwrap();
    fs::create_dir_all(nvme0.join("nvme0n2")).unwrap();
    hwmon(&nvme0.join("hwmon2"), "nvme", &[(1, 41850), (2, 39850)]);

    fs::create_dir_all(root.join("class/hwmon")).unwrap();
    symlink(&k10, root.join("class/hwmon/hwmon0")).unwrap();
    symlink(&drivetemp, root.join("class/hwmon/hwmon1")).unwrap();
    symlink(nvme0.join("hwmon2"), root.join("class/hwmon/hwmon2")).unwrap();

    fs::create_dir_all(root.join("class/nvme")).unwrap();
    symlink(&nvme0, root.join("class/nvme/nvme0")).unwrap();

    fs::create_dir_all(root.join("block")).unwrap();
    for ns in ["nvme0n1", "nvme0n2"] {
        let ns_dir = nvme0.join(ns);
        symlink(&nvme0, ns_dir.join("device")).unwrap();
        symlink(&ns_dir, root.join("block").join(ns)).unwrap();
    }
    fs::create_dir_all(root.join("block/sda")).unwrap();

    dir
}

#[test]
fn test_resolves_generic_drive_and_nvme_sources() {
    let dir = fake_sysfs();
    let topology = SysfsTopology::new(dir.path());

    let block = resolve_temperatures(&topology).unwrap();

    assert_eq!(
        block.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["k10temp", "nvme0n1", "nvme0n2", "sda"]
    );

    assert_eq!(block["k10temp"][0].label, "Tctl");
    assert_eq!(block["k10temp"][0].current, 48.25);

    assert_eq!(block["sda"].len(), 1);
    assert_eq!(block["sda"][0].current, 35.0);
    assert_eq!(block["sda"][0].high, Some(60.0));

    for ns in ["nvme0n1", "nvme0n2"] {
        assert_eq!(block[ns].len(), 1);
        assert_eq!(block[ns][0].label, "Composite");
        assert_eq!(block[ns][0].current, 41.85);
    }
}

#[test]
fn test_topology_links() {
    let dir = fake_sysfs();
    let topology = SysfsTopology::new(dir.path());

    assert_eq!(topology.nvme_namespaces(), vec!["nvme0n1", "nvme0n2"]);
    assert!(topology.is_nvme_controller("nvme0"));
    assert!(!topology.is_nvme_controller("nvme1"));
    assert_eq!(topology.controller_temperature("nvme0"), Some(41.85));

    let node = topology.namespace_device_node("nvme0n1").unwrap();
    assert_eq!(node.file_name().unwrap(), "nvme0");
}

#[test]
fn test_drivetemp_without_block_device_keeps_chip_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let orphan = root.join("devices/platform/orphan");
    let chip = orphan.join("hwmon/hwmon0");
    hwmon(&chip, "drivetemp", &[(1, 30000)]);
    symlink(&orphan, chip.join("device")).unwrap();
    fs::create_dir_all(root.join("class/hwmon")).unwrap();
    symlink(&chip, root.join("class/hwmon/hwmon0")).unwrap();

    let block = resolve_temperatures(&SysfsTopology::new(root)).unwrap();
    assert_eq!(block["drivetemp"][0].current, 30.0);
}

#[test]
fn test_empty_tree_has_no_thermal_data() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("class/hwmon")).unwrap();

    assert!(resolve_temperatures(&SysfsTopology::new(dir.path())).is_none());
}
