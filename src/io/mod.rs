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

//! The I/O provider for running a [`Server`](crate::server::Server).
//!
//! The [`Server`](crate::server::Server) structure and its methods
//! implement the decision logic of the relay abstracted from
//! underlying network I/O. Therefore, to actually run a
//! [`Server`](crate::server::Server), an I/O provider is needed.
//!
//! [`TokioIoProvider`] is that provider. It owns the listening UDP
//! socket and, when started, acts as the intermediary between the
//! network on one hand and the [`Server`](crate::server::Server) on the
//! other, using an [`Upstream`] for queries it cannot answer locally.

mod tokio;
mod upstream;

pub use self::tokio::{TokioIoConfig, TokioIoProvider, TokioShutdownController};
pub use upstream::{Upstream, UpstreamError};

/// The largest UDP payload read from or relayed to clients and the
/// upstream resolver.
const MAX_UDP_MESSAGE_SIZE: usize = 4096;
