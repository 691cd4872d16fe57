// Agent core: configuration, sampling engine and transport

pub mod agent;
pub mod config;
pub mod system_monitor;
pub mod transport;

pub use agent::Agent;
pub use config::AgentConfig;
