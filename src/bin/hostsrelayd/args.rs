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

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// A DNS relay that answers from a static table of names and forwards
/// all other queries upstream
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    /// Set the configuration file to use
    #[clap(long, value_name = "FILE", default_value = "./config.toml")]
    pub conf: PathBuf,

    /// Set the upstream resolver (overrides the configuration file)
    #[clap(long, value_name = "HOST:PORT")]
    pub dns: Option<String>,

    /// Log every query
    #[clap(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["hostsrelayd"]).unwrap();
        assert_eq!(args.conf, PathBuf::from("./config.toml"));
        assert_eq!(args.dns, None);
        assert!(!args.debug);
    }

    #[test]
    fn all_flags() {
        let args = Args::try_parse_from([
            "hostsrelayd",
            "--conf",
            "/etc/hostsrelay.toml",
            "--dns",
            "9.9.9.9:53",
            "--debug",
        ])
        .unwrap();
        assert_eq!(args.conf, PathBuf::from("/etc/hostsrelay.toml"));
        assert_eq!(args.dns.as_deref(), Some("9.9.9.9:53"));
        assert!(args.debug);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Args::try_parse_from(["hostsrelayd", "--port", "53"]).is_err());
    }
}
