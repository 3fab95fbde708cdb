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

//! Implementation of reading and writing of DNS messages.
//!
//! The [`Message`] type is the structured form of a DNS message. It is
//! decoded from and encoded to the RFC 1035 wire format through a
//! [`ByteCursor`]. Only the subset needed to answer simple A queries is
//! modelled: at most one question, and uncompressed names.

mod constants;
pub mod cursor;
mod header;
mod name;
mod opcode;
mod question;
mod rcode;
pub mod reader;
mod resource;
pub mod writer;

pub use cursor::ByteCursor;
pub use header::{Flags, Header};
pub use opcode::{IntoOpcodeError, Opcode};
pub use question::{Qclass, Qtype, Question};
pub use rcode::{IntoRcodeError, Rcode};
pub use resource::Resource;

////////////////////////////////////////////////////////////////////////
// MESSAGES                                                           //
////////////////////////////////////////////////////////////////////////

/// A DNS message: a [`Header`], at most one [`Question`], and the
/// answer, authority, and additional record sections.
///
/// The sections are only reachable through the methods below, and every
/// method that adds an entry also bumps the matching count in the
/// header. A `Message` therefore always satisfies
/// `header().ancount() == answers().len()` (and likewise for the other
/// sections), and [`Message::encode`] writes exactly the counts of what
/// it encodes.
///
/// A reply to a query is made by mutating the decoded query itself
/// (see [`Message::set_response`] and [`Message::add_answer`]), which
/// keeps the ID, the question, and the RD bit without further work.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Message {
    header: Header,
    question: Option<Question>,
    answer: Vec<Resource>,
    authority: Vec<Resource>,
    additional: Vec<Resource>,
}

impl Message {
    /// Creates an empty message with the given ID and flags.
    pub fn new(id: u16, flags: Flags) -> Self {
        Self {
            header: Header::new(id, flags),
            ..Default::default()
        }
    }

    /// Decodes a message from its on-the-wire form.
    pub fn decode(octets: &[u8]) -> reader::Result<Self> {
        reader::decode(octets)
    }

    /// Encodes the message into its on-the-wire form.
    ///
    /// For any message `m` that encodes successfully,
    /// `Message::decode(&m.encode()?) == Ok(m)`.
    pub fn encode(&self) -> writer::Result<Vec<u8>> {
        writer::encode(self)
    }

    /// Returns the header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the flags for modification. (The section counts cannot
    /// be modified this way.)
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.header.flags
    }

    /// Returns the question, if the message has one.
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Returns the answer section.
    pub fn answers(&self) -> &[Resource] {
        &self.answer
    }

    /// Returns the authority section.
    pub fn authorities(&self) -> &[Resource] {
        &self.authority
    }

    /// Returns the additional section.
    pub fn additionals(&self) -> &[Resource] {
        &self.additional
    }

    /// Sets (or replaces) the question.
    pub fn set_question(&mut self, question: Question) {
        self.question = Some(question);
        self.header.qdcount = 1;
    }

    /// Sets the QR bit, marking the message as a response, and clears
    /// the reserved Z bits.
    pub fn set_response(&mut self) {
        self.header.flags.qr = true;
        self.header.flags.z = 0;
    }

    /// Appends a record to the answer section.
    pub fn add_answer(&mut self, rr: Resource) {
        self.answer.push(rr);
        self.header.ancount = self.header.ancount.wrapping_add(1);
    }

    /// Appends a record to the authority section.
    pub fn add_authority(&mut self, rr: Resource) {
        self.authority.push(rr);
        self.header.nscount = self.header.nscount.wrapping_add(1);
    }

    /// Appends a record to the additional section.
    pub fn add_additional(&mut self, rr: Resource) {
        self.additional.push(rr);
        self.header.arcount = self.header.arcount.wrapping_add(1);
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
