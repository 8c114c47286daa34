use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;
use std::path::Path;

use crate::error::HollerError;

/// Options applied to every UDP socket the crate opens.
#[derive(Debug, Deserialize, Eq, PartialEq, Clone, Serialize)]
pub struct SocketOptions {
    /// SO_REUSEADDR, default true - several mDNS stacks share port 5353
    #[serde(default = "default_true")]
    pub reuse_addr: bool,
    /// SO_REUSEPORT where the platform has it, default true
    #[serde(default = "default_true")]
    pub reuse_port: bool,
    /// Multicast TTL / IPV6_MULTICAST_HOPS. Link-local protocols stay at 1.
    #[serde(default = "default_hops")]
    pub multicast_hops: u32,
}

fn default_true() -> bool {
    true
}

fn default_hops() -> u32 {
    1
}

impl Default for SocketOptions {
    fn default() -> Self {
        SocketOptions {
            reuse_addr: true,
            reuse_port: true,
            multicast_hops: 1,
        }
    }
}

/// One service definition from the config file, handed to
/// [crate::zones::ServiceZoneBuilder] on startup.
#[derive(Debug, Deserialize, Eq, PartialEq, Clone, Serialize)]
pub struct ServiceConfig {
    /// Instance label, eg "Living Room Printer"
    pub instance: String,
    /// Service type, eg `_http._tcp.`
    pub service: String,
    /// Domain, defaults to `local.`
    #[serde(default = "default_domain")]
    pub domain: String,
    /// FQDN of the host, defaults to the OS hostname under the domain
    #[serde(default)]
    pub host_name: Option<String>,
    pub port: u16,
    /// Addresses to advertise, defaults to resolving host_name
    #[serde(default)]
    pub ips: Vec<IpAddr>,
    /// TXT payload strings, conventionally `k=v`
    #[serde(default)]
    pub txt: Vec<String>,
}

fn default_domain() -> String {
    "local.".to_string()
}

#[derive(Debug, Deserialize, Eq, PartialEq, Clone, Serialize)]
/// The main config blob for hollerns, write this as a JSON file and load it and it'll make things go.
pub struct ConfigFile {
    /// Default is "INFO"
    pub log_level: String,
    /// Pin traffic to one named interface instead of the OS default route
    pub interface: Option<String>,
    /// Log queries we had no answer for
    pub log_empty_responses: bool,
    /// Hexdump datagrams at trace level
    pub capture_packets: bool,
    pub disable_ipv4: bool,
    pub disable_ipv6: bool,
    #[serde(default)]
    pub socket: SocketOptions,
    /// The services the responder advertises
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile {
            log_level: "INFO".to_string(),
            interface: None,
            log_empty_responses: false,
            capture_packets: false,
            disable_ipv4: false,
            disable_ipv6: false,
            socket: SocketOptions::default(),
            services: vec![],
        }
    }
}

impl Display for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "log_level={} interface={:?} services={}",
            self.log_level,
            self.interface,
            self.services.len()
        ))
    }
}

impl ConfigFile {
    /// JSONify the configfile in a pretty way using serde
    pub fn as_json_pretty(&self) -> Result<String, HollerError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| HollerError::Config(format!("Failed to serialize config: {err:?}")))
    }

    /// Loads from a JSON file when given one, otherwise the defaults.
    pub fn try_load(filename: Option<&str>) -> Result<Self, HollerError> {
        let filename = match filename {
            Some(value) => value,
            None => return Ok(ConfigFile::default()),
        };
        if !Path::new(filename).exists() {
            return Err(HollerError::Config(format!(
                "Config file {filename} doesn't exist"
            )));
        }
        let config = Config::builder()
            .add_source(File::with_name(filename))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
