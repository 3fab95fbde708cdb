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

//! Reading and writing of uncompressed on-the-wire domain names.
//!
//! Names are handled as their labels joined with `.` (the root name is
//! the empty string). Any octet may appear in a label on the wire, so
//! labels are converted to text losslessly with the escapes of
//! [RFC 4343 § 2.1]: a period is written `\.`, a backslash `\\`, other
//! ASCII graphic characters as themselves, and every other octet as
//! `\xyz`, the three-digit decimal value of the octet. Message
//! compression ([RFC 1035 § 4.1.4]) is not supported in either
//! direction.
//!
//! [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
//! [RFC 1035 § 4.1.4]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.4

use std::fmt::Write;
use std::mem;

use super::constants::*;
use super::cursor::ByteCursor;
use super::reader;
use super::writer;

/// Reads a name as a sequence of length-prefixed labels ending with a
/// zero-length label.
///
/// Every iteration consumes at least one octet and the total is capped
/// at [`MAX_NAME_LEN`], so this terminates on any input.
pub fn read(cursor: &mut ByteCursor) -> reader::Result<String> {
    let mut name = String::new();
    let mut wire_len = 0;
    loop {
        let label_len = cursor.read_u8()?;
        match label_len & LABEL_TYPE_MASK {
            0 => (),
            LABEL_TYPE_POINTER => return Err(reader::Error::CompressedName),
            _ => return Err(reader::Error::InvalidLabelType),
        }
        wire_len += label_len as usize + 1;
        if wire_len > MAX_NAME_LEN {
            return Err(reader::Error::NameTooLong);
        } else if label_len == 0 {
            return Ok(name);
        }

        let label = cursor.read_bytes(label_len as usize)?;
        if !name.is_empty() {
            name.push('.');
        }
        push_escaped(&mut name, label);
    }
}

/// Appends the text form of a label to `name`.
fn push_escaped(name: &mut String, label: &[u8]) {
    for &octet in label {
        if octet == b'.' {
            name.push_str("\\.");
        } else if octet == b'\\' {
            name.push_str("\\\\");
        } else if octet.is_ascii_graphic() {
            name.push(octet as char);
        } else {
            write!(name, "\\{octet:03}").unwrap();
        }
    }
}

/// Writes `name` in uncompressed wire form. A single trailing
/// (unescaped) dot is accepted and ignored, so `"example.com."` and
/// `"example.com"` are written identically, and both `""` and `"."` are
/// the root.
pub fn write(cursor: &mut ByteCursor, name: &str) -> writer::Result<()> {
    // Validate everything before writing anything.
    let labels = parse_labels(name)?;
    let mut wire_len = 1;
    for label in &labels {
        if label.is_empty() {
            return Err(writer::Error::EmptyLabel);
        } else if label.len() > MAX_LABEL_LEN {
            return Err(writer::Error::LabelTooLong);
        }
        wire_len += label.len() + 1;
    }
    if wire_len > MAX_NAME_LEN {
        return Err(writer::Error::NameTooLong);
    }

    for label in &labels {
        cursor.write_u8(label.len() as u8);
        cursor.write_bytes(label);
    }
    cursor.write_u8(0);
    Ok(())
}

/// Splits the text form of a name into the octets of its labels,
/// resolving escapes. Empty labels are returned as such; the caller
/// rejects them.
fn parse_labels(name: &str) -> writer::Result<Vec<Vec<u8>>> {
    if name.is_empty() || name == "." {
        return Ok(Vec::new());
    }

    let mut labels = Vec::new();
    let mut label = Vec::new();
    let mut ended_with_dot = false;
    let mut remaining_octets = name.as_bytes();
    while let Some(&octet) = remaining_octets.first() {
        ended_with_dot = false;
        if octet == b'\\' {
            let (value, consumed) = parse_escape(&remaining_octets[1..])?;
            label.push(value);
            remaining_octets = &remaining_octets[consumed + 1..];
        } else if octet == b'.' {
            labels.push(mem::take(&mut label));
            ended_with_dot = true;
            remaining_octets = &remaining_octets[1..];
        } else if !octet.is_ascii() {
            return Err(writer::Error::NotAscii);
        } else {
            label.push(octet);
            remaining_octets = &remaining_octets[1..];
        }
    }
    if !ended_with_dot {
        labels.push(label);
    }
    Ok(labels)
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
fn parse_escape(remaining_octets: &[u8]) -> writer::Result<(u8, usize)> {
    match remaining_octets {
        [] => Err(writer::Error::InvalidEscape),
        [first, ..] if first.is_ascii_digit() => {
            let digits = remaining_octets
                .get(..3)
                .filter(|digits| digits.iter().all(u8::is_ascii_digit))
                .ok_or(writer::Error::InvalidEscape)?;
            let value = digits
                .iter()
                .fold(0, |value, digit| 10 * value + (digit - b'0') as usize);
            u8::try_from(value)
                .map(|value| (value, 3))
                .or(Err(writer::Error::InvalidEscape))
        }
        [first, ..] => Ok((*first, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(name: &str) -> writer::Result<Vec<u8>> {
        let mut cursor = ByteCursor::writer();
        write(&mut cursor, name)?;
        Ok(cursor.into_bytes())
    }

    #[test]
    fn labels_round_trip() {
        let octets = encode("a.bb.ccc").unwrap();
        assert_eq!(octets, b"\x01a\x02bb\x03ccc\x00");
        let mut cursor = ByteCursor::new(&octets);
        assert_eq!(read(&mut cursor).unwrap(), "a.bb.ccc");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn root_is_a_single_zero_octet() {
        assert_eq!(encode("").unwrap(), b"\x00");
        assert_eq!(encode(".").unwrap(), b"\x00");
        let mut cursor = ByteCursor::new(b"\x00");
        assert_eq!(read(&mut cursor).unwrap(), "");
    }

    #[test]
    fn case_is_preserved() {
        let octets = encode("WwW.ExAmple.COM.").unwrap();
        let mut cursor = ByteCursor::new(&octets);
        assert_eq!(read(&mut cursor).unwrap(), "WwW.ExAmple.COM");
    }

    #[test]
    fn read_rejects_malformed_names() {
        let cases: &[(&[u8], reader::Error)] = &[
            (b"\x05abc", reader::Error::UnexpectedEom),
            (b"\x03abc", reader::Error::UnexpectedEom),
            (b"", reader::Error::UnexpectedEom),
            (b"\xc0\x0c", reader::Error::CompressedName),
            (b"\x41abc\x00", reader::Error::InvalidLabelType),
        ];
        for (octets, expected) in cases {
            let mut cursor = ByteCursor::new(octets);
            assert_eq!(read(&mut cursor), Err(*expected), "input {octets:?}");
        }
    }

    #[test]
    fn binary_labels_round_trip_as_escapes() {
        let octets = b"\x03a.b\x02\xff\\\x03\x00 z\x00";
        let mut cursor = ByteCursor::new(octets);
        let name = read(&mut cursor).unwrap();
        assert_eq!(name, "a\\.b.\\255\\\\.\\000\\032z");
        assert_eq!(encode(&name).unwrap(), octets);
    }

    #[test]
    fn escaped_trailing_dot_is_part_of_the_label() {
        assert_eq!(encode("a\\.").unwrap(), b"\x02a.\x00");
        assert_eq!(encode("a\\..").unwrap(), b"\x02a.\x00");
    }

    #[test]
    fn write_rejects_invalid_text() {
        assert_eq!(encode("a\\"), Err(writer::Error::InvalidEscape));
        assert_eq!(encode("\\25"), Err(writer::Error::InvalidEscape));
        assert_eq!(encode("\\256"), Err(writer::Error::InvalidEscape));
        assert_eq!(encode("caf\u{e9}"), Err(writer::Error::NotAscii));
    }

    #[test]
    fn read_rejects_overlong_names() {
        // Five 63-octet labels make 320 octets on the wire.
        let mut octets = Vec::new();
        for _ in 0..5 {
            octets.push(63);
            octets.extend_from_slice(&[b'x'; 63]);
        }
        octets.push(0);
        let mut cursor = ByteCursor::new(&octets);
        assert_eq!(read(&mut cursor), Err(reader::Error::NameTooLong));
    }

    #[test]
    fn write_rejects_unrepresentable_names() {
        assert_eq!(encode("a..b"), Err(writer::Error::EmptyLabel));
        assert_eq!(encode(".a"), Err(writer::Error::EmptyLabel));
        assert_eq!(encode(&"x".repeat(64)), Err(writer::Error::LabelTooLong));
        let long = vec!["x".repeat(63); 4].join(".");
        assert_eq!(encode(&long), Err(writer::Error::NameTooLong));
        assert!(encode(&"x".repeat(63)).is_ok());
    }
}
