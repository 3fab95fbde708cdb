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

//! Implementation of the [`ByteCursor`] type, the sequential
//! big-endian reader/writer underneath the message codec.

use std::borrow::Cow;
use std::fmt;

////////////////////////////////////////////////////////////////////////
// BYTE CURSOR                                                        //
////////////////////////////////////////////////////////////////////////

/// A position-tracking cursor over a byte buffer.
///
/// A `ByteCursor` is used in one of two ways. For decoding, it is
/// constructed over a borrowed slice with [`ByteCursor::new`] and its
/// `read_*` methods consume network-byte-order values, advancing the
/// position. Every read is bounds-checked: if the buffer does not hold
/// enough octets, the read fails with [`OutOfBounds`] and the position
/// is left unchanged. For encoding, it is constructed with
/// [`ByteCursor::writer`] and its `write_*` methods append to the
/// buffer, which grows as needed.
///
/// A cursor is not meant to be shared: each decode or encode operation
/// owns its own.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteCursor<'a> {
    buf: Cow<'a, [u8]>,
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor for reading `octets`, positioned at the start.
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            buf: Cow::Borrowed(octets),
            pos: 0,
        }
    }

    /// Creates an empty cursor for writing.
    pub fn writer() -> ByteCursor<'static> {
        ByteCursor {
            buf: Cow::Owned(Vec::new()),
            pos: 0,
        }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of octets between the read position and the
    /// end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Moves the read position to `pos`. Seeking to the end of the
    /// buffer is allowed; seeking past it is not.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            Err(OutOfBounds)
        } else {
            self.pos = pos;
            Ok(())
        }
    }

    /// Reads one octet.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a network-byte-order `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let octets = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([octets[0], octets[1]]))
    }

    /// Reads a network-byte-order `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let octets = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]))
    }

    /// Reads exactly `n` octets. Fewer than `n` octets remaining is an
    /// error; the read is never truncated.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.pos;
        let end = start.checked_add(n).ok_or(OutOfBounds)?;
        if end > self.buf.len() {
            return Err(OutOfBounds);
        }
        self.pos = end;
        Ok(&self.buf[start..end])
    }

    /// Appends one octet.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.to_mut().push(value);
    }

    /// Appends a network-byte-order `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Appends a network-byte-order `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Appends raw octets.
    pub fn write_bytes(&mut self, octets: &[u8]) {
        self.buf.to_mut().extend_from_slice(octets);
    }

    /// Appends the UTF-8 encoding of `text`, without any length prefix.
    pub fn write_str(&mut self, text: &str) {
        self.write_bytes(text.as_bytes());
    }

    /// Returns the whole underlying buffer: the original input for a
    /// reader, or everything written so far for a writer.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the cursor, returning its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_owned()
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a read or seek went past the end of the
/// buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct OutOfBounds;

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("out of bounds")
    }
}

impl std::error::Error for OutOfBounds {}

/// The type returned by fallible [`ByteCursor`] methods.
pub type Result<T> = std::result::Result<T, OutOfBounds>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_big_endian_and_sequential() {
        let mut cursor = ByteCursor::new(b"\x12\x34\xab\xde\xad\xbe\xef\x01\x02");
        assert_eq!(cursor.read_u16(), Ok(0x1234));
        assert_eq!(cursor.read_u8(), Ok(0xab));
        assert_eq!(cursor.read_u32(), Ok(0xdeadbeef));
        assert_eq!(cursor.position(), 7);
        assert_eq!(cursor.read_bytes(2), Ok(&b"\x01\x02"[..]));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn short_reads_fail_without_moving() {
        let mut cursor = ByteCursor::new(b"\x01\x02\x03");
        cursor.read_u8().unwrap();
        assert_eq!(cursor.read_u32(), Err(OutOfBounds));
        assert_eq!(cursor.read_bytes(3), Err(OutOfBounds));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_u16(), Ok(0x0203));
        assert_eq!(cursor.read_u8(), Err(OutOfBounds));
        assert_eq!(cursor.read_bytes(usize::MAX), Err(OutOfBounds));
    }

    #[test]
    fn seek_is_bounded_by_buffer_length() {
        let mut cursor = ByteCursor::new(b"\x00\x01\x02");
        assert_eq!(cursor.seek(2), Ok(()));
        assert_eq!(cursor.read_u8(), Ok(2));
        assert_eq!(cursor.seek(3), Ok(()));
        assert_eq!(cursor.seek(4), Err(OutOfBounds));
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn writes_append_big_endian() {
        let mut cursor = ByteCursor::writer();
        cursor.write_u16(0xbeef);
        cursor.write_u32(0x0102_0304);
        cursor.write_u8(7);
        cursor.write_str("ab");
        cursor.write_bytes(&[0xff]);
        assert_eq!(cursor.bytes(), b"\xbe\xef\x01\x02\x03\x04\x07ab\xff");
        assert_eq!(cursor.into_bytes().len(), 10);
    }
}
