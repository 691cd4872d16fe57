// Command handlers module
pub mod run;
pub mod snapshot;

use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;

use crate::core::config::AgentConfig;

// Re-exports for cleaner imports
pub use run::execute as run;
pub use snapshot::execute as snapshot;

/// Load the layered config, then apply global CLI flags on top.
pub fn load_config(matches: &ArgMatches) -> Result<AgentConfig> {
    let path = matches.get_one::<String>("config").map(Path::new);
    let mut config = AgentConfig::load(path)?;

    if let Some(host) = matches.get_one::<String>("broker-host") {
        config.broker.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("broker-port") {
        config.broker.port = *port;
    }
    if let Some(prefix) = matches.get_one::<String>("topic-prefix") {
        config.topic_prefix = prefix.clone();
    }
    if let Some(hostname) = matches.get_one::<String>("hostname") {
        config.hostname = Some(hostname.clone());
    }

    config.validate()?;
    Ok(config)
}
