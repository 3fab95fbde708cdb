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

//! The decision logic of the relay: answer locally, or forward.
//!
//! The [`Server`] structure is the heart of this module; see its
//! documentation for details.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;

use crate::message::{Message, Resource};
use crate::table::{Hit, LookupTable};

////////////////////////////////////////////////////////////////////////
// SERVER PUBLIC API AND CORE MESSAGE-HANDLING LOGIC                  //
////////////////////////////////////////////////////////////////////////

/// The message-processing logic of the relay, abstracted from any
/// underlying network I/O provider.
///
/// A `Server` receives raw DNS messages through
/// [`Server::handle_message`] and decides what to do with each of them.
/// Queries for names in its [`LookupTable`] are answered locally with a
/// single A record. Everything else is handed back to the I/O provider
/// as [`Response::Forward`]; the provider is then responsible for
/// relaying the *original* bytes to the upstream resolver and relaying
/// the upstream reply back to the client.
///
/// A `Server` holds no per-query state, so a single instance (behind an
/// [`Arc`]) may be shared by any number of concurrent workers.
#[derive(Debug)]
pub struct Server {
    table: Arc<LookupTable>,
    ttl: u32,
}

/// The TTL used for local answers unless another is configured.
pub const DEFAULT_TTL: u32 = 600;

impl Server {
    /// Creates a new `Server` that answers from `table` with records
    /// of the given TTL.
    pub fn new(table: Arc<LookupTable>, ttl: u32) -> Self {
        Self { table, ttl }
    }

    /// Handles a received DNS message. This is the API through which
    /// I/O providers submit messages.
    ///
    /// `received` is the datagram exactly as read from the network, and
    /// `source` is its sender (used only for logging). See [`Response`]
    /// for what the caller must do next.
    pub fn handle_message(&self, received: &[u8], source: SocketAddr) -> Response {
        let mut message = match Message::decode(received) {
            Ok(m) => m,
            Err(e) => {
                debug!("dropping malformed message from {source}: {e}");
                return Response::None;
            }
        };

        // Never answer responses; that way lies packet loops.
        if message.header().flags.qr {
            debug!("dropping response message from {source}");
            return Response::None;
        }

        let (qname, hit) = match message.question() {
            Some(question) => match self.table.lookup(&question.qname) {
                Some(hit) => (question.qname.clone(), hit),
                None => {
                    debug!("forwarding {question} from {source}");
                    return Response::Forward;
                }
            },
            None => {
                debug!("forwarding question-less message from {source}");
                return Response::Forward;
            }
        };

        match hit {
            Hit::Exact(address) => {
                debug!("local answer for {qname} from {source}: {address}");
            }
            Hit::Wildcard { pattern, address } => {
                debug!("wildcard answer for {qname} from {source}: {address} (via {pattern})");
            }
        }

        message.set_response();
        message.add_answer(Resource::a(qname, hit.address(), self.ttl));
        match message.encode() {
            Ok(octets) => Response::Answer(octets),
            Err(e) => {
                debug!("failed to encode answer for {source}: {e}");
                Response::None
            }
        }
    }
}

/// Signals to an I/O provider what to do after [`Server::handle_message`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// A local answer is to be sent back to the client. The encoded
    /// message is included.
    Answer(Vec<u8>),

    /// The received message is to be relayed, unmodified, to the
    /// upstream resolver.
    Forward,

    /// No response is to be sent.
    None,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Answer(octets) => write!(f, "answer ({} octets)", octets.len()),
            Self::Forward => f.write_str("forward"),
            Self::None => f.write_str("none"),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::class::Class;
    use crate::message::{Flags, Question};
    use crate::rr::Type;

    fn server() -> Server {
        let table = LookupTable::new([
            ("foo.com".parse().unwrap(), Ipv4Addr::new(1, 2, 3, 4)),
            ("*.foo.com".parse().unwrap(), Ipv4Addr::new(5, 6, 7, 8)),
        ])
        .unwrap();
        Server::new(Arc::new(table), DEFAULT_TTL)
    }

    fn source() -> SocketAddr {
        (Ipv4Addr::LOCALHOST, 5353).into()
    }

    fn query(qname: &str) -> Vec<u8> {
        let flags = Flags {
            rd: true,
            ..Default::default()
        };
        let mut message = Message::new(0xbeef, flags);
        message.set_question(Question::new(qname, Type::A, Class::IN));
        message.encode().unwrap()
    }

    fn answer(response: Response) -> Message {
        match response {
            Response::Answer(octets) => Message::decode(&octets).unwrap(),
            other => panic!("expected an answer, got {other}"),
        }
    }

    #[test]
    fn answers_exact_match() {
        let response = answer(server().handle_message(&query("foo.com"), source()));
        let header = response.header();
        assert_eq!(header.id, 0xbeef);
        assert!(header.flags.qr);
        assert!(header.flags.rd);
        assert_eq!(header.qdcount(), 1);
        assert_eq!(header.ancount(), 1);
        assert_eq!(response.question().unwrap().qname, "foo.com");

        let rr = &response.answers()[0];
        assert_eq!(rr.owner, "foo.com");
        assert_eq!(rr.rr_type, Type::A);
        assert_eq!(rr.class, Class::IN);
        assert_eq!(rr.ttl, DEFAULT_TTL);
        assert_eq!(rr.rdata, [1, 2, 3, 4]);
    }

    #[test]
    fn answers_wildcard_match() {
        let response = answer(server().handle_message(&query("bar.foo.com"), source()));
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].ipv4(), Some(Ipv4Addr::new(5, 6, 7, 8)));
    }

    #[test]
    fn answer_owner_keeps_query_case() {
        let response = answer(server().handle_message(&query("WwW.Foo.COM"), source()));
        assert_eq!(response.answers()[0].owner, "WwW.Foo.COM");
        assert_eq!(response.answers()[0].ipv4(), Some(Ipv4Addr::new(5, 6, 7, 8)));
    }

    #[test]
    fn uses_configured_ttl() {
        let server = Server::new(server().table.clone(), 30);
        let response = answer(server.handle_message(&query("foo.com"), source()));
        assert_eq!(response.answers()[0].ttl, 30);
    }

    #[test]
    fn forwards_unknown_names() {
        let server = server();
        assert_eq!(server.handle_message(&query("example.org"), source()), Response::Forward);
        assert_eq!(server.handle_message(&query("oo.com"), source()), Response::Forward);
    }

    #[test]
    fn forwards_question_less_messages() {
        let message = Message::new(1, Flags::default()).encode().unwrap();
        assert_eq!(server().handle_message(&message, source()), Response::Forward);
    }

    #[test]
    fn answer_clears_reserved_bits() {
        let mut octets = query("foo.com");
        octets[3] |= 0x20; // AD, as set by dig
        let response = answer(server().handle_message(&octets, source()));
        assert_eq!(response.header().flags.z, 0);
    }

    #[test]
    fn forwards_names_with_arbitrary_label_octets() {
        let server = server();
        let header = b"\xbe\xef\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00";
        let names: [&[u8]; 3] = [
            b"\x01\xff\x07example\x00",
            b"\x03a.b\x00",
            b"\x03f\x00o\x03bar\x03com\x00",
        ];
        for name in names {
            let mut octets = header.to_vec();
            octets.extend_from_slice(name);
            octets.extend_from_slice(b"\x00\x01\x00\x01");
            assert_eq!(
                server.handle_message(&octets, source()),
                Response::Forward,
                "name {name:?}",
            );
        }
    }

    #[test]
    fn answers_wildcard_for_binary_label_with_original_octets() {
        let mut octets = b"\xbe\xef\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00".to_vec();
        octets.extend_from_slice(b"\x02\xff.\x03foo\x03com\x00\x00\x01\x00\x01");
        let response = answer(server().handle_message(&octets, source()));
        let rr = &response.answers()[0];
        assert_eq!(rr.owner, "\\255\\..foo.com");
        assert_eq!(rr.ipv4(), Some(Ipv4Addr::new(5, 6, 7, 8)));

        // The question goes back out exactly as it came in.
        let encoded = response.encode().unwrap();
        assert_eq!(encoded[12..octets.len()], octets[12..]);
    }

    #[test]
    fn drops_malformed_messages() {
        let server = server();
        assert_eq!(server.handle_message(&[], source()), Response::None);
        assert_eq!(server.handle_message(&[0; 11], source()), Response::None);

        let mut truncated = query("foo.com");
        truncated.truncate(truncated.len() - 3);
        assert_eq!(server.handle_message(&truncated, source()), Response::None);
    }

    #[test]
    fn drops_responses() {
        let mut message = Message::decode(&query("foo.com")).unwrap();
        message.set_response();
        let octets = message.encode().unwrap();
        assert_eq!(server().handle_message(&octets, source()), Response::None);
    }
}
