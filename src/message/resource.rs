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

//! Implementation of the [`Resource`] type for answer, authority, and
//! additional records.

use std::net::Ipv4Addr;

use super::cursor::ByteCursor;
use super::name;
use super::reader;
use super::writer;
use crate::class::Class;
use crate::rr::Type;

/// A resource record as it appears in any of the three record sections
/// of a message.
///
/// The RDATA is kept as raw octets; its interpretation depends on
/// `rr_type`. The only type the server builds itself is
/// [A](Resource::a), whose RDATA is the four octets of an IPv4 address.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Resource {
    pub owner: String,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl Resource {
    /// Builds an IN A record for `owner` pointing at `address`.
    pub fn a(owner: impl Into<String>, address: Ipv4Addr, ttl: u32) -> Self {
        Self {
            owner: owner.into(),
            rr_type: Type::A,
            class: Class::IN,
            ttl,
            rdata: address.octets().to_vec(),
        }
    }

    /// Interprets the RDATA as an IPv4 address, if this is an A record
    /// with well-formed RDATA.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.rr_type != Type::A {
            return None;
        }
        let octets: [u8; 4] = self.rdata.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    pub(super) fn read(cursor: &mut ByteCursor) -> reader::Result<Self> {
        let owner = name::read(cursor)?;
        let rr_type = cursor.read_u16()?.into();
        let class = cursor.read_u16()?.into();
        let ttl = cursor.read_u32()?;
        let rdlength = cursor.read_u16()?;
        let rdata = cursor.read_bytes(rdlength as usize)?.to_vec();
        Ok(Self {
            owner,
            rr_type,
            class,
            ttl,
            rdata,
        })
    }

    pub(super) fn write(&self, cursor: &mut ByteCursor) -> writer::Result<()> {
        let rdlength = u16::try_from(self.rdata.len()).or(Err(writer::Error::RdataTooLong))?;
        name::write(cursor, &self.owner)?;
        cursor.write_u16(self.rr_type.into());
        cursor.write_u16(self.class.into());
        cursor.write_u32(self.ttl);
        cursor.write_u16(rdlength);
        cursor.write_bytes(&self.rdata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_record_carries_address_octets() {
        let rr = Resource::a("foo.com", Ipv4Addr::new(1, 2, 3, 4), 600);
        assert_eq!(rr.rr_type, Type::A);
        assert_eq!(rr.class, Class::IN);
        assert_eq!(rr.rdata, [1, 2, 3, 4]);
        assert_eq!(rr.ipv4(), Some(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn a_record_wire_form() {
        let rr = Resource::a("ab", Ipv4Addr::new(10, 0, 0, 1), 0x0102_0304);
        let mut cursor = ByteCursor::writer();
        rr.write(&mut cursor).unwrap();
        assert_eq!(
            cursor.bytes(),
            b"\x02ab\x00\x00\x01\x00\x01\x01\x02\x03\x04\x00\x04\x0a\x00\x00\x01",
        );
        let mut input = ByteCursor::new(cursor.bytes());
        assert_eq!(Resource::read(&mut input).unwrap(), rr);
    }

    #[test]
    fn truncated_rdata_is_an_error() {
        let mut cursor = ByteCursor::new(b"\x00\x00\x01\x00\x01\x00\x00\x00\x3c\x00\x04\x01\x02");
        assert_eq!(
            Resource::read(&mut cursor),
            Err(reader::Error::UnexpectedEom)
        );
    }

    #[test]
    fn ipv4_requires_four_octet_a_record() {
        let mut rr = Resource::a("x", Ipv4Addr::LOCALHOST, 1);
        rr.rdata.pop();
        assert_eq!(rr.ipv4(), None);
        let rr = Resource {
            rr_type: Type::TXT,
            ..Resource::a("x", Ipv4Addr::LOCALHOST, 1)
        };
        assert_eq!(rr.ipv4(), None);
    }
}
