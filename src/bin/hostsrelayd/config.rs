// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements the relay configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled};
use paste::paste;
use serde::{de, Deserialize, Deserializer};

use hostsrelay::io::TokioIoConfig;
use hostsrelay::server::DEFAULT_TTL;
use hostsrelay::table::{Key, LookupTable};

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the relay configuration from the file given by `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let raw_config =
        fs::read_to_string(path.as_ref()).context("failed to read the configuration file")?;
    let config = parse(&raw_config)?;
    log_config_summary(&config);
    Ok(config)
}

/// Parses the text of a configuration file.
pub fn parse(raw_config: &str) -> Result<Config> {
    toml::from_str(raw_config).context("failed to parse the configuration file")
}

/// Summarizes the configuration in the log, if the debug log level is
/// enabled.
fn log_config_summary(config: &Config) {
    if !log_enabled!(Debug) {
        // Don't compute the message if it will never be printed.
        return;
    }

    let mut message = format!(
        "Configuration loaded:\n\
         Bind address:     {}\n\
         Upstream:         {}\n\
         Upstream timeout: {}s\n\
         TTL:              {}\n\
         Workers:          {}\n\
         Queue capacity:   {}\n\
         Records:          ",
        config.bind,
        config.upstream,
        config.upstream_timeout,
        config.ttl,
        config.io.workers,
        config.io.queue_capacity,
    );
    if config.records.is_empty() {
        message.push_str("none");
    } else {
        write!(message, "{}", config.records.len()).unwrap();
        for (key, address) in &config.records {
            write!(message, "\n  {key} -> {address}").unwrap();
        }
    }
    debug!("{}", message);
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_upstream")]
    pub upstream: String,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout: u64,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default, deserialize_with = "deserialize_records")]
    pub records: Vec<(Key, Ipv4Addr)>,
}

impl Config {
    /// Returns the upstream timeout as a [`Duration`].
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    /// Builds the lookup table from the `[records]` section.
    pub fn build_table(&self) -> Result<LookupTable> {
        LookupTable::new(self.records.iter().cloned()).context("invalid [records] section")
    }
}

const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DEFAULT_BIND_PORT: u16 = 53;

fn default_bind() -> SocketAddr {
    SocketAddr::new(DEFAULT_BIND_IP, DEFAULT_BIND_PORT)
}

fn default_upstream() -> String {
    "8.8.8.8:53".to_owned()
}

fn default_upstream_timeout() -> u64 {
    5
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: I/O                                         //
////////////////////////////////////////////////////////////////////////

/// Provider configuration for the
/// [`TokioIoProvider`](hostsrelay::io::TokioIoProvider). This mirrors
/// [`TokioIoConfig`] and can be converted into one; its purpose is
/// basically to make the configuration deserializable and to provide
/// defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    TokioIoConfig::default().workers
}

fn default_queue_capacity() -> usize {
    TokioIoConfig::default().queue_capacity
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl From<&IoConfig> for TokioIoConfig {
    fn from(toml_config: &IoConfig) -> Self {
        Self {
            workers: toml_config.workers,
            queue_capacity: toml_config.queue_capacity,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION SECTION: RECORDS                                     //
////////////////////////////////////////////////////////////////////////

/// Deserializes the `[records]` table into a list of entries in file
/// order. Keys that normalize to the same text are left in; they are
/// reported by [`LookupTable::new`].
fn deserialize_records<'de, D>(deserializer: D) -> Result<Vec<(Key, Ipv4Addr)>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(RecordsVisitor)
}

struct RecordsVisitor;

impl<'de> de::Visitor<'de> for RecordsVisitor {
    type Value = Vec<(Key, Ipv4Addr)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a table of names and IPv4 addresses")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut records = Vec::new();
        while let Some((key, address)) = map.next_entry::<ConfigKey, ConfigIpv4Addr>()? {
            records.push((key.0, address.0));
        }
        Ok(records)
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS OVER HOSTSRELAY TYPES FOR SERDE                           //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type,
/// using its [`FromStr`](std::str::FromStr) implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigKey, Key, "record name");
make_serde_wrapper!(ConfigIpv4Addr, Ipv4Addr, "IPv4 address");

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
