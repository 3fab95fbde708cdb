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

//! Decoding of on-the-wire DNS messages into [`Message`] values.

use std::fmt;

use super::constants::*;
use super::cursor::{ByteCursor, OutOfBounds};
use super::{Header, Message, Question, Resource};

////////////////////////////////////////////////////////////////////////
// DECODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Decodes a whole message. See [`Message::decode`].
pub(super) fn decode(octets: &[u8]) -> Result<Message> {
    if octets.len() < HEADER_SIZE {
        return Err(Error::HeaderTooShort);
    }
    let mut cursor = ByteCursor::new(octets);
    let header = Header::read(&mut cursor)?;
    if header.qdcount > 1 {
        return Err(Error::TooManyQuestions);
    }

    let question = if header.qdcount == 1 {
        Some(Question::read(&mut cursor)?)
    } else {
        None
    };
    let answer = read_section(&mut cursor, header.ancount)?;
    let authority = read_section(&mut cursor, header.nscount)?;
    let additional = read_section(&mut cursor, header.arcount)?;

    Ok(Message {
        header,
        question,
        answer,
        authority,
        additional,
    })
}

/// Reads `count` resource records.
fn read_section(cursor: &mut ByteCursor, count: u16) -> Result<Vec<Resource>> {
    // The count comes off the wire, so don't trust it for allocation;
    // every record takes at least 11 octets.
    let mut records = Vec::with_capacity((count as usize).min(cursor.remaining() / 11));
    for _ in 0..count {
        records.push(Resource::read(cursor)?);
    }
    Ok(records)
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a message could not be decoded.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    HeaderTooShort,
    UnexpectedEom,
    TooManyQuestions,
    CompressedName,
    InvalidLabelType,
    NameTooLong,
}

impl From<OutOfBounds> for Error {
    fn from(_: OutOfBounds) -> Self {
        Self::UnexpectedEom
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEom => f.write_str("unexpected end of message"),
            Self::TooManyQuestions => f.write_str("more than one question"),
            Self::CompressedName => f.write_str("compressed names are not supported"),
            Self::InvalidLabelType => f.write_str("invalid label type"),
            Self::NameTooLong => f.write_str("name too long"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible decoding functions.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::{Opcode, Qclass, Qtype, Rcode};
    use super::*;
    use crate::class::Class;
    use crate::rr::Type;

    /// A query for example.com. IN A as sent by dig, with an EDNS OPT
    /// record (UDP payload size 1232, DO clear) and a cookie option.
    const DIG_QUERY: &[u8] =
        b"\x3a\x5c\x01\x20\x00\x01\x00\x00\x00\x00\x00\x01\x07\x65\x78\x61\
          \x6d\x70\x6c\x65\x03\x63\x6f\x6d\x00\x00\x01\x00\x01\x00\x00\x29\
          \x04\xd0\x00\x00\x00\x00\x00\x0c\x00\x0a\x00\x08\x9c\x5b\x3e\x1f\
          \x71\x0a\x3b\x52";

    #[test]
    fn decodes_dig_query() {
        let message = decode(DIG_QUERY).unwrap();
        let header = message.header();
        assert_eq!(header.id, 0x3a5c);
        assert!(!header.flags.qr);
        assert_eq!(header.flags.opcode, Opcode::Query);
        assert!(header.flags.rd);
        assert!(!header.flags.ra);
        assert_eq!(header.flags.z, 2); // The AD bit, which RFC 1035 reserves.
        assert_eq!(header.flags.rcode, Rcode::NoError);
        assert_eq!(header.qdcount(), 1);
        assert_eq!(header.arcount(), 1);

        let question = message.question().unwrap();
        assert_eq!(question.qname, "example.com");
        assert_eq!(question.qtype, Qtype::from(Type::A));
        assert_eq!(question.qclass, Qclass::from(Class::IN));

        assert!(message.answers().is_empty());
        assert!(message.authorities().is_empty());
        let opt = &message.additionals()[0];
        assert_eq!(opt.owner, "");
        assert_eq!(opt.rr_type, Type::OPT);
        assert_eq!(u16::from(opt.class), 1232);
        assert_eq!(opt.rdata.len(), 12);
    }

    #[test]
    fn rejects_short_message() {
        for size in 0..HEADER_SIZE {
            let buf = vec![0; size];
            assert_eq!(decode(&buf), Err(Error::HeaderTooShort));
        }
    }

    #[test]
    fn rejects_multiple_questions() {
        let octets = b"\x00\x01\x00\x00\x00\x02\x00\x00\x00\x00\x00\x00\
                       \x00\x00\x01\x00\x01\x00\x00\x01\x00\x01";
        assert_eq!(decode(octets), Err(Error::TooManyQuestions));
    }

    #[test]
    fn rejects_counts_larger_than_contents() {
        // ANCOUNT says 1, but the message ends after the question.
        let mut octets = DIG_QUERY[..29].to_vec();
        octets[7] = 1;
        octets[11] = 0;
        assert_eq!(decode(&octets), Err(Error::UnexpectedEom));
    }

    #[test]
    fn accepts_message_without_question() {
        let message = decode(b"\x12\x34\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();
        assert_eq!(message.header().id, 0x1234);
        assert!(message.question().is_none());
    }
}
