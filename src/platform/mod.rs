// Host readers behind the engine's capability traits

pub mod procfs;
pub mod sysfs;
mod sysinfo_source;

pub use sysfs::SysfsTopology;
pub use sysinfo_source::SysinfoSource;
