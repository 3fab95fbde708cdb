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

//! A small DNS relay.
//!
//! The relay answers A queries for a static table of names (including
//! wildcard names such as `*.example.com`) and forwards every other
//! query, byte for byte, to an upstream resolver, relaying the
//! upstream's reply back to the client.
//!
//! The crate is layered the same way from the bottom up:
//!
//! * [`message`] reads and writes DNS messages;
//! * [`table`] holds the names the relay answers for;
//! * [`server`] decides, for each received message, whether to answer
//!   locally or to forward; and
//! * [`io`] connects a [`Server`](server::Server) to the network.

pub mod class;
pub mod io;
pub mod message;
pub mod rr;
pub mod server;
pub mod table;
