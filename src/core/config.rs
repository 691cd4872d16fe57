use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::HostwatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub broker: BrokerConfig,
    /// Topic is `<topic_prefix>/<hostname>/metrics`
    pub topic_prefix: String,
    /// Overrides the OS hostname in the topic and payload
    pub hostname: Option<String>,
    pub sysfs_root: PathBuf,
    pub procfs_root: PathBuf,
    pub cadences: Cadences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Defaults to `agent-<hostname>`
    pub client_id: Option<String>,
    pub keepalive_secs: u64,
}

/// Loop intervals, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cadences {
    /// cpu, memory, system and network
    pub fast_secs: u64,
    pub disk_secs: u64,
    pub temperatures_secs: u64,
    pub publish_secs: u64,
    pub reconnect_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topic_prefix: "sys/agents".to_string(),
            hostname: None,
            sysfs_root: PathBuf::from("/sys"),
            procfs_root: PathBuf::from("/proc"),
            cadences: Cadences::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: None,
            keepalive_secs: 30,
        }
    }
}

impl Default for Cadences {
    fn default() -> Self {
        Self {
            fast_secs: 1,
            disk_secs: 3,
            temperatures_secs: 10,
            publish_secs: 1,
            reconnect_secs: 3,
        }
    }
}

impl Cadences {
    pub fn fast(&self) -> Duration {
        Duration::from_secs(self.fast_secs)
    }

    pub fn disk(&self) -> Duration {
        Duration::from_secs(self.disk_secs)
    }

    pub fn temperatures(&self) -> Duration {
        Duration::from_secs(self.temperatures_secs)
    }

    pub fn publish(&self) -> Duration {
        Duration::from_secs(self.publish_secs)
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_secs(self.reconnect_secs)
    }
}

impl AgentConfig {
    /// Load the config: defaults, then the JSON file (explicit path or the
    /// per-user default if it exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// `<config dir>/hostwatch/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hostwatch").join("config.json"))
    }

    /// Apply `BROKER_HOST`, `BROKER_PORT`, `MQTT_USER` and `MQTT_PASS`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BROKER_HOST") {
            self.broker.host = host;
        }
        if let Some(port) = lookup("BROKER_PORT") {
            self.broker.port = port
                .trim()
                .parse()
                .with_context(|| format!("BROKER_PORT is not a valid port: {:?}", port))?;
        }
        if let Some(user) = lookup("MQTT_USER") {
            self.broker.username = Some(user);
        }
        if let Some(pass) = lookup("MQTT_PASS") {
            self.broker.password = Some(pass);
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.broker.host.trim().is_empty() {
            return Err(HostwatchError::config("broker host must not be empty"));
        }
        if self.broker.port == 0 {
            return Err(HostwatchError::config("broker port must not be 0"));
        }
        if self.topic_prefix.trim_matches('/').is_empty() {
            return Err(HostwatchError::config("topic prefix must not be empty"));
        }

        let cadences = [
            ("fast", self.cadences.fast_secs),
            ("disk", self.cadences.disk_secs),
            ("temperatures", self.cadences.temperatures_secs),
            ("publish", self.cadences.publish_secs),
            ("reconnect", self.cadences.reconnect_secs),
        ];
        for (name, secs) in cadences {
            if secs == 0 {
                return Err(HostwatchError::config(format!(
                    "{} cadence must be at least 1 second",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Host identity used in the topic and the payload
    pub fn hostname(&self) -> String {
        self.hostname
            .clone()
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn client_id(&self) -> String {
        self.broker
            .client_id
            .clone()
            .unwrap_or_else(|| format!("agent-{}", self.hostname()))
    }

    pub fn topic(&self) -> String {
        format!(
            "{}/{}/metrics",
            self.topic_prefix.trim_end_matches('/'),
            self.hostname()
        )
    }
}
