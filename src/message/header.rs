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

//! Implementation of the DNS message header and its flags word.

use super::constants::*;
use super::cursor::{self, ByteCursor};
use super::{Opcode, Rcode};

////////////////////////////////////////////////////////////////////////
// FLAGS                                                              //
////////////////////////////////////////////////////////////////////////

/// The unpacked view of the 16-bit flags word of the header.
///
/// The wire layout ([RFC 1035 § 4.1.1]), from the most significant bit
/// down, is QR (1 bit), OPCODE (4), AA, TC, RD, RA (1 each), Z (3) and
/// RCODE (4). [`Flags::pack`] and [`Flags::unpack`] are exact inverses,
/// so `z` is carried through as received even though it is reserved;
/// [`Flags::default`] leaves it zero.
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags {
    pub qr: bool,
    pub opcode: Opcode,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: u8,
    pub rcode: Rcode,
}

impl Flags {
    /// Unpacks a flags word as it appears on the wire.
    pub fn unpack(raw: u16) -> Self {
        // Both fields are masked to four bits, which always converts.
        let opcode = (((raw & OPCODE_MASK) >> OPCODE_SHIFT) as u8)
            .try_into()
            .unwrap();
        let rcode = ((raw & RCODE_MASK) as u8).try_into().unwrap();
        Self {
            qr: raw & QR_MASK != 0,
            opcode,
            aa: raw & AA_MASK != 0,
            tc: raw & TC_MASK != 0,
            rd: raw & RD_MASK != 0,
            ra: raw & RA_MASK != 0,
            z: ((raw & Z_MASK) >> Z_SHIFT) as u8,
            rcode,
        }
    }

    /// Packs the flags into their wire representation.
    pub fn pack(&self) -> u16 {
        let mut raw = (u16::from(u8::from(self.opcode)) << OPCODE_SHIFT) & OPCODE_MASK;
        raw |= (u16::from(self.z) << Z_SHIFT) & Z_MASK;
        raw |= u16::from(u8::from(self.rcode)) & RCODE_MASK;
        if self.qr {
            raw |= QR_MASK;
        }
        if self.aa {
            raw |= AA_MASK;
        }
        if self.tc {
            raw |= TC_MASK;
        }
        if self.rd {
            raw |= RD_MASK;
        }
        if self.ra {
            raw |= RA_MASK;
        }
        raw
    }
}

////////////////////////////////////////////////////////////////////////
// HEADER                                                             //
////////////////////////////////////////////////////////////////////////

/// The fixed 12-octet header of a DNS message.
///
/// The section counts are read-only from outside the
/// [`message`](super) module: they only change through the
/// [`Message`](super::Message) mutators that add entries, which is how
/// the counts are kept equal to the number of entries actually present.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub(super) qdcount: u16,
    pub(super) ancount: u16,
    pub(super) nscount: u16,
    pub(super) arcount: u16,
}

impl Header {
    /// Creates a header with the given ID and flags and zero counts.
    pub fn new(id: u16, flags: Flags) -> Self {
        Self {
            id,
            flags,
            ..Default::default()
        }
    }

    /// Returns the number of questions.
    pub fn qdcount(&self) -> u16 {
        self.qdcount
    }

    /// Returns the number of answer records.
    pub fn ancount(&self) -> u16 {
        self.ancount
    }

    /// Returns the number of authority records.
    pub fn nscount(&self) -> u16 {
        self.nscount
    }

    /// Returns the number of additional records.
    pub fn arcount(&self) -> u16 {
        self.arcount
    }

    /// Reads a header with six sequential 16-bit reads.
    pub(super) fn read(cursor: &mut ByteCursor) -> cursor::Result<Self> {
        Ok(Self {
            id: cursor.read_u16()?,
            flags: Flags::unpack(cursor.read_u16()?),
            qdcount: cursor.read_u16()?,
            ancount: cursor.read_u16()?,
            nscount: cursor.read_u16()?,
            arcount: cursor.read_u16()?,
        })
    }

    /// Writes the header with the provided section counts.
    pub(super) fn write(&self, cursor: &mut ByteCursor, counts: [u16; 4]) {
        cursor.write_u16(self.id);
        cursor.write_u16(self.flags.pack());
        for count in counts {
            cursor.write_u16(count);
        }
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
