// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Sequential readers and writers over in-memory byte buffers
//!
//! All integers are big-endian.
//! Strings are terminated by `0x00` in single byte encodings
//! and by `0x00 0x00` (on a two byte boundary) in UTF-16 encodings.

use crate::Error;
use crate::synchsafe::{synchsafe, take_unsynced, unsynchsafe};
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, ByteRead, ByteReader, ByteWrite, ByteWriter};
use encoding_rs::{UTF_8, UTF_16BE, UTF_16LE};

/// An ID3v2 text encoding
///
/// | Byte | Encoding | Tag versions |
/// |-----:|----------|--------------|
/// | 0 | ISO-8859-1 | 2, 3, 4 |
/// | 1 | UTF-16 with byte order mark | 2, 3, 4 |
/// | 2 | UTF-16BE without byte order mark | 4 |
/// | 3 | UTF-8 | 4 |
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Encoding {
    /// ISO-8859-1
    #[default]
    Latin1 = 0,
    /// UTF-16 with byte order mark
    Utf16 = 1,
    /// UTF-16 big-endian without byte order mark
    Utf16Be = 2,
    /// UTF-8
    Utf8 = 3,
}

impl Encoding {
    /// All encodings, in selector byte order
    pub const ALL: [Encoding; 4] = [Self::Latin1, Self::Utf16, Self::Utf16Be, Self::Utf8];

    /// Maps an encoding selector byte through the given tag version's table
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTextEncoding`] if the byte
    /// has no meaning in the given version.
    pub fn from_byte(byte: u8, version: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Latin1),
            1 => Ok(Self::Utf16),
            2 if version >= 4 => Ok(Self::Utf16Be),
            3 if version >= 4 => Ok(Self::Utf8),
            _ => Err(Error::InvalidTextEncoding(byte)),
        }
    }

    /// Whether the encoding may be used in the given tag version
    pub fn supported(self, version: u8) -> bool {
        match self {
            Self::Latin1 | Self::Utf16 => true,
            Self::Utf16Be | Self::Utf8 => version >= 4,
        }
    }

    /// Returns ourself if usable in the given version, or UTF-16 if not
    pub fn for_version(self, version: u8) -> Self {
        if self.supported(version) {
            self
        } else {
            Self::Utf16
        }
    }

    /// The string terminator for this encoding
    pub fn terminator(self) -> &'static [u8] {
        match self {
            Self::Latin1 | Self::Utf8 => &[0x00],
            Self::Utf16 | Self::Utf16Be => &[0x00, 0x00],
        }
    }

    /// Finds the offset of the first terminator in `bytes`
    fn find_terminator(self, bytes: &[u8]) -> Option<usize> {
        match self {
            Self::Latin1 | Self::Utf8 => bytes.iter().position(|b| *b == 0),
            Self::Utf16 | Self::Utf16Be => bytes
                .chunks_exact(2)
                .position(|c| c == [0, 0])
                .map(|p| p * 2),
        }
    }

    /// Decodes bytes in this encoding, without any terminator
    ///
    /// Undecodable sequences are replaced with U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => encoding_rs::mem::decode_latin1(bytes).into_owned(),
            Self::Utf16 => match bytes {
                [0xFE, 0xFF, rest @ ..] => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
                [0xFF, 0xFE, rest @ ..] => UTF_16LE.decode_without_bom_handling(rest).0.into_owned(),
                // no byte order mark, so guess the most common one
                rest => UTF_16LE.decode_without_bom_handling(rest).0.into_owned(),
            },
            Self::Utf16Be => match bytes {
                [0xFE, 0xFF, rest @ ..] => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
                rest => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
            },
            Self::Utf8 => UTF_8.decode_with_bom_removal(bytes).0.into_owned(),
        }
    }

    /// Encodes text in this encoding, without any terminator
    ///
    /// Characters outside of ISO-8859-1 are replaced
    /// when encoding to that character set.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Latin1 => encoding_rs::mem::encode_latin1_lossy(text).into_owned(),
            Self::Utf16 => [0xFF, 0xFE]
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_le_bytes))
                .collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

impl TryFrom<u8> for Encoding {
    type Error = Error;

    /// Uses the widest (ID3v2.4) encoding table
    fn try_from(byte: u8) -> Result<Self, Error> {
        Self::from_byte(byte, 4)
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Latin1 => "ISO-8859-1".fmt(f),
            Self::Utf16 => "UTF-16".fmt(f),
            Self::Utf16Be => "UTF-16BE".fmt(f),
            Self::Utf8 => "UTF-8".fmt(f),
        }
    }
}

/// A sequential reader over a borrowed byte buffer
///
/// # Example
/// ```
/// use id3_codec::binary::{Encoding, Reader};
///
/// let data = b"\x00\x00\x01\x00eng\x00Title\x00";
/// let mut r = Reader::new(data);
/// assert_eq!(r.read_u32().unwrap(), 256);
/// assert_eq!(r.read_fixed_string(3).unwrap(), "eng");
/// assert_eq!(r.read_string(Encoding::Latin1).unwrap(), "");
/// assert_eq!(r.read_string(Encoding::Latin1).unwrap(), "Title");
/// assert!(r.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Builds a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, rest: data }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.data.len() - self.rest.len()
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of bytes not yet read
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Whether every byte has been read
    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Moves to an absolute offset
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedEnd`] if the offset
    /// lies beyond the end of the buffer.
    pub fn seek(&mut self, position: usize) -> Result<(), Error> {
        self.rest = self.data.get(position..).ok_or(Error::UnexpectedEnd)?;
        Ok(())
    }

    /// Moves backward by up to `bytes`
    pub fn rewind(&mut self, bytes: usize) {
        self.rest = &self.data[self.position().saturating_sub(bytes)..];
    }

    /// Returns upcoming bytes without consuming them
    pub fn peek(&self, bytes: usize) -> Option<&'a [u8]> {
        self.rest.get(..bytes)
    }

    fn bytes(&mut self) -> ByteReader<&mut &'a [u8], BigEndian> {
        ByteReader::endian(&mut self.rest, BigEndian)
    }

    /// Reads an unsigned 8-bit integer
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.bytes().read::<u8>().map_err(Error::from)
    }

    /// Reads an unsigned 16-bit integer
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.bytes().read::<u16>().map_err(Error::from)
    }

    /// Reads an unsigned 24-bit integer
    pub fn read_u24(&mut self) -> Result<u32, Error> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    /// Reads an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.bytes().read::<u32>().map_err(Error::from)
    }

    /// Reads a signed 8-bit integer
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        self.bytes().read::<i8>().map_err(Error::from)
    }

    /// Reads a signed 16-bit integer
    pub fn read_i16(&mut self) -> Result<i16, Error> {
        self.bytes().read::<i16>().map_err(Error::from)
    }

    /// Reads a signed 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        self.bytes().read::<i32>().map_err(Error::from)
    }

    /// Reads an unsigned integer between 1 and 4 bytes wide
    pub fn read_uint(&mut self, width: usize) -> Result<u32, Error> {
        match width {
            1 => self.read_u8().map(u32::from),
            2 => self.read_u16().map(u32::from),
            3 => self.read_u24(),
            4 => self.read_u32(),
            _ => Err(Error::ExcessiveValue),
        }
    }

    /// Reads a 4 byte synchsafe integer
    pub fn read_synchsafe(&mut self) -> Result<u32, Error> {
        self.read_u32().map(unsynchsafe)
    }

    /// Reads a fixed number of bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        self.bytes().read::<[u8; N]>().map_err(Error::from)
    }

    /// Borrows the next `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if len > self.rest.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (bytes, rest) = self.rest.split_at(len);
        self.rest = rest;
        Ok(bytes)
    }

    /// Borrows every remaining byte
    pub fn read_rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.rest)
    }

    /// Reads `len` logical bytes from unsynchronised data
    ///
    /// Consumes as many source bytes as are needed to
    /// produce `len` bytes once `0xFF 0x00` stuffing is removed.
    pub fn read_unsynced(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let (bytes, consumed) = take_unsynced(self.rest, len);
        if bytes.len() < len {
            return Err(Error::UnexpectedEnd);
        }
        self.rest = &self.rest[consumed..];
        Ok(bytes)
    }

    /// Reads a single bit-packed flag byte, most significant bit first
    pub fn read_flags(&mut self) -> Result<[bool; 8], Error> {
        let mut r = BitReader::endian(&mut self.rest, BigEndian);
        let mut flags = [false; 8];
        for flag in flags.iter_mut() {
            *flag = r.read_bit().map_err(Error::from)?;
        }
        Ok(flags)
    }

    /// Reads an encoding selector byte through the given version's table
    pub fn read_encoding(&mut self, version: u8) -> Result<Encoding, Error> {
        self.read_u8().and_then(|b| Encoding::from_byte(b, version))
    }

    /// Reads a terminated string
    ///
    /// If no terminator is found, the remainder of the
    /// buffer is taken as the string.
    pub fn read_string(&mut self, encoding: Encoding) -> Result<String, Error> {
        match encoding.find_terminator(self.rest) {
            Some(end) => {
                let text = encoding.decode(&self.rest[..end]);
                self.rest = &self.rest[end + encoding.terminator().len()..];
                Ok(text)
            }
            None => Ok(encoding.decode(self.read_rest())),
        }
    }

    /// Reads the remainder of the buffer as a string
    ///
    /// Trailing terminators are dropped.
    /// Any interior terminators separate multiple values,
    /// which are decoded independently and joined by `'\0'`.
    pub fn read_string_to_end(&mut self, encoding: Encoding) -> Result<String, Error> {
        let mut rest = self.read_rest();
        let terminator = encoding.terminator();
        while rest.len() >= terminator.len()
            && rest.ends_with(terminator)
            && (rest.len() - terminator.len()) % terminator.len() == 0
        {
            rest = &rest[..rest.len() - terminator.len()];
        }

        let mut values = Vec::new();
        let mut r = Reader::new(rest);
        while !r.is_empty() {
            values.push(r.read_string(encoding)?);
        }
        Ok(values.join("\0"))
    }

    /// Reads a terminated ISO-8859-1 string
    pub fn read_latin1(&mut self) -> Result<String, Error> {
        self.read_string(Encoding::Latin1)
    }

    /// Reads a fixed-size ISO-8859-1 field
    ///
    /// The field ends at its first NUL byte, if any,
    /// and trailing spaces are trimmed.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, Error> {
        let field = self.read_bytes(len)?;
        let field = match field.iter().position(|b| *b == 0) {
            Some(end) => &field[..end],
            None => field,
        };
        Ok(Encoding::Latin1.decode(field).trim_end_matches(' ').to_owned())
    }
}

/// A sequential writer into an owned byte buffer
///
/// # Example
/// ```
/// use id3_codec::binary::{Encoding, Writer};
///
/// let mut w = Writer::new();
/// w.write_encoding(Encoding::Latin1).unwrap();
/// w.write_fixed_string("eng", 3).unwrap();
/// w.write_string(Encoding::Latin1, "", true).unwrap();
/// w.write_string(Encoding::Latin1, "Comment", false).unwrap();
/// assert_eq!(w.into_inner(), b"\x00eng\x00Comment");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Builds an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrows the bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the bytes written
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn bytes(&mut self) -> ByteWriter<&mut Vec<u8>, BigEndian> {
        ByteWriter::endian(&mut self.buf, BigEndian)
    }

    /// Writes an unsigned 8-bit integer
    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.bytes().write::<u8>(value).map_err(Error::Io)
    }

    /// Writes an unsigned 16-bit integer
    pub fn write_u16(&mut self, value: u16) -> Result<(), Error> {
        self.bytes().write::<u16>(value).map_err(Error::Io)
    }

    /// Writes an unsigned 24-bit integer
    pub fn write_u24(&mut self, value: u32) -> Result<(), Error> {
        self.write_uint(value, 3)
    }

    /// Writes an unsigned 32-bit integer
    pub fn write_u32(&mut self, value: u32) -> Result<(), Error> {
        self.bytes().write::<u32>(value).map_err(Error::Io)
    }

    /// Writes a signed 8-bit integer
    pub fn write_i8(&mut self, value: i8) -> Result<(), Error> {
        self.bytes().write::<i8>(value).map_err(Error::Io)
    }

    /// Writes a signed 16-bit integer
    pub fn write_i16(&mut self, value: i16) -> Result<(), Error> {
        self.bytes().write::<i16>(value).map_err(Error::Io)
    }

    /// Writes a signed 32-bit integer
    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        self.bytes().write::<i32>(value).map_err(Error::Io)
    }

    /// Writes an unsigned integer between 1 and 4 bytes wide
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExcessiveValue`] if the value
    /// doesn't fit in the given width.
    pub fn write_uint(&mut self, value: u32, width: usize) -> Result<(), Error> {
        if !(1..=4).contains(&width) || (width < 4 && value >> (width * 8) != 0) {
            return Err(Error::ExcessiveValue);
        }
        self.write_bytes(&value.to_be_bytes()[4 - width..])
    }

    /// Writes a 4 byte synchsafe integer
    pub fn write_synchsafe(&mut self, value: u32) -> Result<(), Error> {
        match value <= crate::synchsafe::SYNCHSAFE_MAX {
            true => self.write_u32(synchsafe(value)),
            false => Err(Error::ExcessiveValue),
        }
    }

    /// Writes raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.bytes().write_bytes(bytes).map_err(Error::Io)
    }

    /// Writes `len` zero bytes
    pub fn pad(&mut self, len: usize) -> Result<(), Error> {
        self.buf.resize(self.buf.len() + len, 0);
        Ok(())
    }

    /// Writes a single bit-packed flag byte, most significant bit first
    pub fn write_flags(&mut self, flags: [bool; 8]) -> Result<(), Error> {
        let mut w = BitWriter::endian(&mut self.buf, BigEndian);
        flags
            .into_iter()
            .try_for_each(|flag| w.write_bit(flag))
            .map_err(Error::Io)
    }

    /// Writes an encoding selector byte
    pub fn write_encoding(&mut self, encoding: Encoding) -> Result<(), Error> {
        self.write_u8(encoding as u8)
    }

    /// Writes a string, optionally followed by its terminator
    pub fn write_string(
        &mut self,
        encoding: Encoding,
        text: &str,
        terminated: bool,
    ) -> Result<(), Error> {
        // interior NULs separate values, each encoded on its own
        for (i, value) in text.split('\0').enumerate() {
            if i > 0 {
                self.write_bytes(encoding.terminator())?;
            }
            self.write_bytes(&encoding.encode(value))?;
        }
        match terminated {
            true => self.write_bytes(encoding.terminator()),
            false => Ok(()),
        }
    }

    /// Writes a terminated ISO-8859-1 string
    pub fn write_latin1(&mut self, text: &str) -> Result<(), Error> {
        self.write_string(Encoding::Latin1, text, true)
    }

    /// Writes a fixed-size ISO-8859-1 field, padded with NUL bytes
    ///
    /// Text longer than the field is truncated.
    pub fn write_fixed_string(&mut self, text: &str, len: usize) -> Result<(), Error> {
        let mut field = Encoding::Latin1.encode(text);
        field.resize(len, 0);
        self.write_bytes(&field)
    }
}
