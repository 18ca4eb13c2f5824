//! Configuration handling for the node binary.
//!
//! Defaults, an optional YAML file, and environment-variable overrides are
//! merged into one [`NodeConfig`] used to construct the kernel.

use anyhow::{bail, Result};
use picomesh_kernel::KernelConfig;
use picomesh_routing::UpdatePolicy;
use picomesh_wire::{DevAddr, DEV_ADDR_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's device address, `aa:bb:cc:dd:ee:ff`
    pub own_addr: String,
    /// Bound on client-role connections
    pub client_capacity: usize,
    /// Bound on server-role connections
    pub server_capacity: usize,
    /// Flood bound applied when relaying
    pub max_hops: u8,
    /// Refuse routing updates that worsen a known hop count
    pub prefer_fewer_hops: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            own_addr: "0a:00:00:00:00:01".to_string(),
            client_capacity: picomesh_registry::DEFAULT_CLIENT_CAPACITY,
            server_capacity: picomesh_registry::DEFAULT_SERVER_CAPACITY,
            max_hops: picomesh_wire::DEFAULT_MAX_HOPS,
            prefer_fewer_hops: false,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a file, then apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<NodeConfig>(&content) {
                Ok(parsed) => {
                    config = parsed;
                    info!("loaded configuration from {:?}", config_path.as_ref());
                }
                Err(err) => {
                    warn!(
                        "failed to parse config file {:?} ({}), using defaults",
                        config_path.as_ref(),
                        err
                    );
                }
            }
        } else {
            warn!(
                "config file {:?} not found, using defaults",
                config_path.as_ref()
            );
        }

        config.apply_environment_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_environment_overrides(&mut self) {
        if let Ok(addr) = std::env::var("PICOMESH_OWN_ADDR") {
            self.own_addr = addr;
            info!("own address overridden by environment: {}", self.own_addr);
        }

        if let Ok(value) = std::env::var("PICOMESH_MAX_HOPS") {
            if let Ok(max_hops) = value.parse::<u8>() {
                self.max_hops = max_hops;
                info!("max hops overridden by environment: {}", max_hops);
            }
        }

        if let Ok(value) = std::env::var("PICOMESH_CLIENT_CAPACITY") {
            if let Ok(capacity) = value.parse::<usize>() {
                self.client_capacity = capacity;
                info!("client capacity overridden by environment: {}", capacity);
            }
        }

        if let Ok(value) = std::env::var("PICOMESH_SERVER_CAPACITY") {
            if let Ok(capacity) = value.parse::<usize>() {
                self.server_capacity = capacity;
                info!("server capacity overridden by environment: {}", capacity);
            }
        }
    }

    /// Kernel tunables derived from this configuration
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig {
            client_capacity: self.client_capacity,
            server_capacity: self.server_capacity,
            max_hops: self.max_hops,
            update_policy: if self.prefer_fewer_hops {
                UpdatePolicy::PreferFewerHops
            } else {
                UpdatePolicy::AlwaysOverwrite
            },
        }
    }

    /// The configured own address, parsed
    pub fn parsed_own_addr(&self) -> Result<DevAddr> {
        parse_addr(&self.own_addr)
    }
}

/// Parse a `aa:bb:cc:dd:ee:ff` device address
pub fn parse_addr(text: &str) -> Result<DevAddr> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != DEV_ADDR_LEN {
        bail!("bad device address {:?}: expected 6 colon-separated octets", text);
    }
    let mut octets = [0u8; DEV_ADDR_LEN];
    for (i, part) in parts.iter().enumerate() {
        octets[i] = u8::from_str_radix(part, 16)
            .map_err(|_| anyhow::anyhow!("bad octet {:?} in device address {:?}", part, text))?;
    }
    Ok(DevAddr::new(octets))
}
