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

//! Implementation of types relating to DNS questions.

use std::fmt;

use super::cursor::ByteCursor;
use super::name;
use super::reader;
use super::writer;
use crate::class::Class;
use crate::rr::Type;

////////////////////////////////////////////////////////////////////////
// QUESTIONS                                                          //
////////////////////////////////////////////////////////////////////////

/// The question of a DNS query.
///
/// Defined in [RFC 1035 § 4.1.2], a DNS question includes
///
/// * the QNAME, which is the domain name whose records are being
///   queried (held here as its labels joined with `.`, in the case the
///   client sent, without a trailing dot);
/// * the [QTYPE](Qtype), which specifies what types of records are
///   desired; and
/// * the [QCLASS](Qclass), which specifies which DNS class(es) to search.
///
/// [RFC 1035 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.2
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Question {
    pub qname: String,
    pub qtype: Qtype,
    pub qclass: Qclass,
}

impl Question {
    /// Creates a new question.
    pub fn new(qname: impl Into<String>, qtype: impl Into<Qtype>, qclass: impl Into<Qclass>) -> Self {
        Self {
            qname: qname.into(),
            qtype: qtype.into(),
            qclass: qclass.into(),
        }
    }

    pub(super) fn read(cursor: &mut ByteCursor) -> reader::Result<Self> {
        let qname = name::read(cursor)?;
        let qtype = cursor.read_u16()?.into();
        let qclass = cursor.read_u16()?.into();
        Ok(Self {
            qname,
            qtype,
            qclass,
        })
    }

    pub(super) fn write(&self, cursor: &mut ByteCursor) -> writer::Result<()> {
        name::write(cursor, &self.qname)?;
        cursor.write_u16(self.qtype.into());
        cursor.write_u16(self.qclass.into());
        Ok(())
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}. {} {}", self.qname, self.qclass, self.qtype)
    }
}

////////////////////////////////////////////////////////////////////////
// QTYPES                                                             //
////////////////////////////////////////////////////////////////////////

/// The QTYPE of a DNS [question](Question).
///
/// QTYPE values include data TYPEs (see [`Type`]) as well as values
/// that ask for a range of TYPEs, such as [*](Qtype::ANY). A QTYPE is
/// an unsigned 16-bit integer on the wire, so this is basically a
/// wrapper around [`u16`].
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qtype(u16);

impl Qtype {
    // RFC 1035
    pub const AXFR: Self = Self(252);
    pub const MAILB: Self = Self(253);
    pub const MAILA: Self = Self(254);
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qtype {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qtype> for u16 {
    fn from(qtype: Qtype) -> Self {
        qtype.0
    }
}

impl From<Type> for Qtype {
    fn from(rr_type: Type) -> Self {
        Self(rr_type.into())
    }
}

impl fmt::Display for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::AXFR => f.write_str("AXFR"),
            Self::MAILB => f.write_str("MAILB"),
            Self::MAILA => f.write_str("MAILA"),
            Self::ANY => f.write_str("*"),
            _ => fmt::Display::fmt(&Type::from(*self), f),
        }
    }
}

impl fmt::Debug for Qtype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

////////////////////////////////////////////////////////////////////////
// QCLASSES                                                           //
////////////////////////////////////////////////////////////////////////

/// The QCLASS of a DNS [question](Question).
///
/// This may be a defined DNS [CLASS](Class), or another value such as
/// [*](Qclass::ANY) that asks for several classes at once.
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct Qclass(u16);

impl Qclass {
    // RFC 1035
    pub const ANY: Self = Self(255);
}

impl From<u16> for Qclass {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Qclass> for u16 {
    fn from(qclass: Qclass) -> Self {
        qclass.0
    }
}

impl From<Class> for Qclass {
    fn from(class: Class) -> Self {
        Self(class.into())
    }
}

impl fmt::Display for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::ANY => f.write_str("*"),
            _ => fmt::Display::fmt(&Class::from(*self), f),
        }
    }
}

impl fmt::Debug for Qclass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_displays_like_a_zone_file() {
        let question = Question::new("www.Example.com", Type::A, Class::IN);
        assert_eq!(question.to_string(), "www.Example.com. IN A");
        let question = Question::new("example.com", Qtype::ANY, Qclass::ANY);
        assert_eq!(question.to_string(), "example.com. * *");
    }
}
