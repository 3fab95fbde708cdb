// Copyright 2023 Matthew Ingwersen.
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

//! Forwarding of queries to the upstream resolver.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use super::MAX_UDP_MESSAGE_SIZE;

/// The upstream resolver to which queries without a local answer are
/// relayed.
///
/// Each [`Upstream::forward`] call is a single, self-contained UDP
/// exchange: the upstream `host:port` is resolved, a fresh socket is
/// bound to an ephemeral port, the query is sent, and the first reply
/// is returned. The whole exchange is bounded by the configured
/// timeout. There are no retries.
#[derive(Clone, Debug)]
pub struct Upstream {
    addr: String,
    timeout: Duration,
}

impl Upstream {
    /// Creates a new `Upstream` for the resolver at `addr`, which is a
    /// `host:port` string (resolved anew on every forward).
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Returns the `host:port` of the upstream resolver.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends `query` verbatim to the upstream resolver and returns its
    /// reply verbatim.
    pub async fn forward(&self, query: &[u8]) -> Result<Vec<u8>> {
        match timeout(self.timeout, self.exchange(query)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>> {
        let target = lookup_host(self.addr.as_str())
            .await
            .map_err(UpstreamError::Resolve)?
            .next()
            .ok_or_else(|| UpstreamError::NoAddress(self.addr.clone()))?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        // The socket is connected, so only the target's replies are
        // received on it.
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        socket.send(query).await?;
        let mut reply = vec![0; MAX_UDP_MESSAGE_SIZE];
        let len = socket.recv(&mut reply).await?;
        reply.truncate(len);
        Ok(reply)
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a query could not be forwarded or that no
/// reply was received.
#[derive(Debug)]
pub enum UpstreamError {
    Resolve(io::Error),
    NoAddress(String),
    Io(io::Error),
    Timeout(Duration),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "failed to resolve upstream: {e}"),
            Self::NoAddress(addr) => write!(f, "upstream {addr} has no addresses"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Timeout(limit) => write!(f, "no reply within {limit:?}"),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolve(e) | Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for UpstreamError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// The type returned by [`Upstream::forward`].
pub type Result<T> = std::result::Result<T, UpstreamError>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
