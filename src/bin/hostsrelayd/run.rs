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

//! Implements running the relay.

use std::fmt::Write;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::{Builder as LoggerBuilder, Env};
use log::{error, info, warn, LevelFilter};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime::Builder;

use hostsrelay::io::{TokioIoProvider, Upstream};
use hostsrelay::server::Server;

use crate::args::Args;
use crate::config;

/// Runs the relay.
pub fn run(args: Args) {
    init_logging(args.debug);

    if let Err(e) = try_running(args) {
        let mut message = String::from("Failed to run:");
        for (i, cause) in e.chain().enumerate() {
            write!(message, "\n[{}] {}", i + 1, cause).unwrap();
        }
        message.push_str("\nExiting with failure.");
        error!("{}", message);
        process::exit(1);
    }
    info!("Exiting with success.");
}

/// Sets up logging from `RUST_LOG`, defaulting to the info level.
fn init_logging(debug: bool) {
    logger_builder(Env::new().default_filter_or("info"), debug).init();
}

/// Makes the logger builder. `--debug` turns on debug logging for the
/// relay (the `hostsrelay` library and `hostsrelayd`) whatever the
/// environment says.
fn logger_builder(env: Env, debug: bool) -> LoggerBuilder {
    let mut builder = LoggerBuilder::from_env(env);
    if debug {
        builder.filter_module("hostsrelay", LevelFilter::Debug);
    }
    builder
}

fn try_running(args: Args) -> Result<()> {
    info!(
        "hostsrelay daemon v{}.{}.{} starting.",
        env!("CARGO_PKG_VERSION_MAJOR"),
        env!("CARGO_PKG_VERSION_MINOR"),
        env!("CARGO_PKG_VERSION_PATCH"),
    );

    // Load the configuration and build the table from it. The --dns
    // option wins over the configuration file.
    info!("Loading the configuration from {}.", args.conf.display());
    let mut config =
        config::load_from_path(&args.conf).context("failed to load the configuration")?;
    if let Some(dns) = args.dns {
        config.upstream = dns;
    }
    let table = config
        .build_table()
        .context("failed to load the configuration")?;
    if table.is_empty() {
        warn!("No records are configured; every query will be forwarded.");
    } else {
        info!(
            "Loaded {} exact names and {} wildcard patterns.",
            table.exact_len(),
            table.wildcard_patterns().count(),
        );
    }

    // Set up the runtime and bind the socket.
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the Tokio runtime")?;
    let io_provider = runtime
        .block_on(TokioIoProvider::bind(config.bind, (&config.io).into()))
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = io_provider
        .local_addr()
        .context("failed to get the bound address")?;
    let server = Arc::new(Server::new(Arc::new(table), config.ttl));
    let upstream = Arc::new(Upstream::new(
        config.upstream.clone(),
        config.upstream_timeout(),
    ));

    // Set up signal handling.
    let mut signals = set_up_signal_handling().context("failed to set up signal handling")?;

    // Start the I/O provider.
    info!(
        "Set-up is complete; listening on {} and forwarding to {}.",
        local_addr,
        upstream.addr(),
    );
    let shutdown_controller = {
        let _guard = runtime.enter();
        io_provider.start(&server, &upstream)
    };

    // Wait for a termination signal.
    if let Some(signal) = signals.forever().next() {
        let name = match signal {
            SIGINT => "SIGINT",
            SIGTERM => "SIGTERM",
            _ => unreachable!(),
        };
        info!("Received {}; shutting down.", name);
    }

    // Shut down the server.
    shutdown_controller.blocking_shut_down();
    info!("Shutdown complete.");
    Ok(())
}

fn set_up_signal_handling() -> Result<Signals> {
    let term_signals = &[SIGINT, SIGTERM];
    let already_terminating = Arc::new(AtomicBool::new(false));

    // This sets up signal handlers to exit immediately if a second
    // termination signal arrives before the process finishes shutting
    // down gracefully.
    for sig in term_signals {
        signal_hook::flag::register_conditional_shutdown(*sig, 1, already_terminating.clone())?;
        signal_hook::flag::register(*sig, already_terminating.clone())?;
    }

    Signals::new(term_signals).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use env_logger::Logger;
    use log::{Level, Log, Metadata};

    use super::*;

    fn enabled(logger: &mut Logger, target: &str, level: Level) -> bool {
        let metadata = Metadata::builder().target(target).level(level).build();
        logger.enabled(&metadata)
    }

    #[test]
    fn debug_flag_wins_over_environment() {
        // An unset variable with a fallback stands in for RUST_LOG=warn.
        let env = || Env::new().filter_or("HOSTSRELAYD_TEST_UNSET_LOG", "warn");

        let mut quiet = logger_builder(env(), false).build();
        assert!(!enabled(&mut quiet, "hostsrelay::server", Level::Debug));

        let mut verbose = logger_builder(env(), true).build();
        assert!(enabled(&mut verbose, "hostsrelay::server", Level::Debug));
        assert!(enabled(&mut verbose, "hostsrelayd::run", Level::Debug));
        assert!(!enabled(&mut verbose, "tokio::net", Level::Debug));
        assert!(enabled(&mut verbose, "tokio::net", Level::Warn));
    }
}
