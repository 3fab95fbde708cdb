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

//! Encoding of [`Message`] values into on-the-wire DNS messages.

use std::fmt;

use super::cursor::ByteCursor;
use super::{Message, Resource};

////////////////////////////////////////////////////////////////////////
// ENCODING                                                           //
////////////////////////////////////////////////////////////////////////

/// Encodes a whole message. See [`Message::encode`].
///
/// The header counts are written from the lengths of the sections, so
/// the message on the wire always agrees with itself.
pub(super) fn encode(message: &Message) -> Result<Vec<u8>> {
    let counts = [
        section_count(message.question.iter().count())?,
        section_count(message.answer.len())?,
        section_count(message.authority.len())?,
        section_count(message.additional.len())?,
    ];
    debug_assert_eq!(
        counts,
        [
            message.header.qdcount,
            message.header.ancount,
            message.header.nscount,
            message.header.arcount,
        ],
        "header counts out of sync with sections",
    );

    let mut cursor = ByteCursor::writer();
    message.header.write(&mut cursor, counts);
    if let Some(ref question) = message.question {
        question.write(&mut cursor)?;
    }
    write_section(&mut cursor, &message.answer)?;
    write_section(&mut cursor, &message.authority)?;
    write_section(&mut cursor, &message.additional)?;
    Ok(cursor.into_bytes())
}

fn write_section(cursor: &mut ByteCursor, records: &[Resource]) -> Result<()> {
    for rr in records {
        rr.write(cursor)?;
    }
    Ok(())
}

fn section_count(len: usize) -> Result<u16> {
    u16::try_from(len).or(Err(Error::TooManyRecords))
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a message cannot be represented on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    EmptyLabel,
    InvalidEscape,
    NotAscii,
    LabelTooLong,
    NameTooLong,
    RdataTooLong,
    TooManyRecords,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::EmptyLabel => f.write_str("empty label inside a name"),
            Self::InvalidEscape => f.write_str("invalid escape sequence in a name"),
            Self::NotAscii => f.write_str("name is not ASCII"),
            Self::LabelTooLong => f.write_str("label too long"),
            Self::NameTooLong => f.write_str("name too long"),
            Self::RdataTooLong => f.write_str("RDATA too long"),
            Self::TooManyRecords => f.write_str("too many records in a section"),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible encoding functions.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::super::{Flags, Question};
    use super::*;
    use crate::class::Class;
    use crate::rr::Type;

    #[test]
    fn encodes_query_byte_for_byte() {
        let flags = Flags {
            rd: true,
            ..Default::default()
        };
        let mut message = Message::new(0xbeef, flags);
        message.set_question(Question::new("foo.com", Type::A, Class::IN));
        assert_eq!(
            encode(&message).unwrap(),
            b"\xbe\xef\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
              \x03foo\x03com\x00\x00\x01\x00\x01",
        );
    }

    #[test]
    fn encodes_answers_after_question() {
        let mut message = Message::new(1, Flags::default());
        message.set_question(Question::new("a", Type::A, Class::IN));
        message.set_response();
        message.add_answer(Resource::a("a", Ipv4Addr::new(1, 2, 3, 4), 60));
        assert_eq!(
            encode(&message).unwrap(),
            b"\x00\x01\x80\x00\x00\x01\x00\x01\x00\x00\x00\x00\
              \x01a\x00\x00\x01\x00\x01\
              \x01a\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x01\x02\x03\x04",
        );
    }

    #[test]
    fn unrepresentable_owner_fails() {
        let mut message = Message::new(1, Flags::default());
        message.add_answer(Resource::a("bad..name", Ipv4Addr::LOCALHOST, 1));
        assert_eq!(encode(&message), Err(Error::EmptyLabel));
    }

    #[test]
    fn oversized_rdata_fails() {
        let mut message = Message::new(1, Flags::default());
        message.add_additional(Resource {
            owner: String::new(),
            rr_type: Type::TXT,
            class: Class::IN,
            ttl: 0,
            rdata: vec![0; 65536],
        });
        assert_eq!(encode(&message), Err(Error::RdataTooLong));
    }
}
