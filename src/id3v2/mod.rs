// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling ID3v2 tags
//!
//! An ID3v2 tag is laid out as follows:
//!
//! | Bytes | Field |
//! |------:|-------|
//! | 10 | tag header |
//! | varies | extended header (optional) |
//! | varies | frames |
//! | varies | padding (all `0x00`) |
//! | 10 | footer (optional, ID3v2.4 only) |
//!
//! Each frame starts with a header whose layout
//! depends on the tag's major version:
//!
//! | Version | ID | Size | Flags |
//! |--------:|---:|------|------:|
//! | 2 | 3 bytes | 3 bytes | none |
//! | 3 | 4 bytes | 4 bytes | 2 bytes |
//! | 4 | 4 bytes | 4 bytes, synchsafe | 2 bytes |
//!
//! Frames are located by their IDs.
//! If bytes which don't look like a frame ID turn up
//! where a frame should start, they're skipped one at a time
//! until a real frame is found, and the skipped bytes are
//! appended to the frame before them.

pub mod registry;
pub mod value;

use crate::Error;
use crate::binary::{Encoding, Reader, Writer};
use crate::synchsafe::{
    SYNCHSAFE_MAX, insert_unsync, needs_unsync, remove_unsync, synchsafe, synchsafe_u35, unsynchsafe,
    unsynchsafe_u35,
};
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, ToBitStream};
use registry::Registry;
use value::{FrameValue, ParseContext, WriteContext};

/// The marker at the start of every ID3v2 tag
pub const TAG_MARKER: [u8; 3] = *b"ID3";

/// The marker at the start of an ID3v2.4 footer
pub const FOOTER_MARKER: [u8; 3] = *b"3DI";

/// Tag-wide flags
///
/// | Bit | v2.2 | v2.3 | v2.4 |
/// |----:|------|------|------|
/// | 7 | unsynchronisation | unsynchronisation | unsynchronisation |
/// | 6 | compression | extended header | extended header |
/// | 5 | | experimental | experimental |
/// | 4 | | | footer |
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TagFlags {
    /// Whether unsynchronisation has been applied
    pub unsynchronisation: bool,
    /// Whether an extended header follows the tag header
    pub extended_header: bool,
    /// Whether the tag is compressed (ID3v2.2 only)
    pub compression: bool,
    /// Whether the tag is experimental
    pub experimental: bool,
    /// Whether a footer follows the padding (ID3v2.4 only)
    pub footer: bool,
}

/// The 10 byte header at the start of every tag
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TagHeader {
    /// The major version, from 2 to 4
    pub version: u8,
    /// The revision number
    pub revision: u8,
    /// Tag-wide flags
    pub flags: TagFlags,
    /// Size of everything after the header, excluding any footer
    pub size: u32,
    /// The size field exactly as stored
    pub raw_size: u32,
    /// The size field decoded as synchsafe
    ///
    /// ID3v2.2 stores its size as a plain integer,
    /// but some writers synchsafe-encode it anyway.
    pub synchsafe_size: u32,
}

impl TagHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 10;

    /// Builds a header for a tag of the given version and size
    pub fn new(version: u8, size: u32) -> Self {
        let raw_size = match version {
            2 => size,
            _ => synchsafe(size),
        };
        Self {
            version,
            revision: 0,
            flags: TagFlags::default(),
            size,
            raw_size,
            synchsafe_size: unsynchsafe(raw_size),
        }
    }

    /// Total bytes occupied by the tag, including header and footer
    pub fn total_size(&self) -> u64 {
        let footer = if self.flags.footer { Self::SIZE } else { 0 };
        (Self::SIZE + footer) as u64 + u64::from(self.size)
    }
}

impl FromBitStream for TagHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        if r.read_to::<[u8; 3]>()? != TAG_MARKER {
            return Err(Error::InvalidTagMarker);
        }

        let version = r.read_to::<u8>()?;
        let revision = r.read_to::<u8>()?;
        if !(2..=4).contains(&version) || revision == 0xFF {
            return Err(Error::UnsupportedVersion(version));
        }

        let unsynchronisation = r.read_bit()?;
        let bit6 = r.read_bit()?;
        let experimental = r.read_bit()?;
        let footer = r.read_bit()?;
        r.skip(4)?;

        let raw_size = r.read_to::<u32>()?;
        let size = match version {
            2 => raw_size,
            _ if raw_size & 0x8080_8080 != 0 => return Err(Error::InvalidTagSize),
            _ => unsynchsafe(raw_size),
        };

        Ok(Self {
            version,
            revision,
            flags: TagFlags {
                unsynchronisation,
                extended_header: bit6 && version >= 3,
                compression: bit6 && version == 2,
                experimental: experimental && version >= 3,
                footer: footer && version == 4,
            },
            size,
            raw_size,
            synchsafe_size: unsynchsafe(raw_size),
        })
    }
}

impl ToBitStream for TagHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        let size = match self.version {
            2 => self.size,
            _ if self.size > SYNCHSAFE_MAX => return Err(Error::InvalidTagSize),
            _ => synchsafe(self.size),
        };

        w.write_bytes(&TAG_MARKER)?;
        w.write_from(self.version)?;
        w.write_from(self.revision)?;
        w.write_bit(self.flags.unsynchronisation)?;
        w.write_bit(match self.version {
            2 => self.flags.compression,
            _ => self.flags.extended_header,
        })?;
        w.write_bit(self.flags.experimental)?;
        w.write_bit(self.flags.footer)?;
        w.write::<4, u8>(0)?;
        w.write_from::<u32>(size)?;
        Ok(())
    }
}

/// The optional extended header
///
/// In ID3v2.3:
///
/// | Bytes | Field |
/// |------:|-------|
/// | 4 | size, excluding this field (6 or 10) |
/// | 2 | flags (`0x8000` = CRC present) |
/// | 4 | padding size |
/// | 4 | CRC-32 (optional) |
///
/// In ID3v2.4:
///
/// | Bytes | Field |
/// |------:|-------|
/// | 4 | synchsafe size, including this field |
/// | 1 | number of flag bytes (1) |
/// | 1 | flags (`0x40` update, `0x20` CRC, `0x10` restrictions) |
/// | 1 | `0x00` length of update data (optional) |
/// | 1+5 | `0x05` then CRC-32 as 35-bit synchsafe (optional) |
/// | 1+1 | `0x01` then restrictions (optional) |
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ExtendedHeader {
    /// Whether this tag updates an earlier one (ID3v2.4)
    pub update: bool,
    /// CRC-32 of the tag's frame data
    pub crc: Option<u32>,
    /// Declared padding size (ID3v2.3)
    pub padding_size: u32,
    /// Tag restrictions (ID3v2.4)
    pub restrictions: Option<u8>,
}

impl ExtendedHeader {
    /// Parses an extended header, leaving the reader at its end
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExtendedHeader`] if the header
    /// is truncated or its fields don't fit its declared size.
    pub fn parse(r: &mut Reader<'_>, version: u8) -> Result<Self, Error> {
        let start = r.position();
        let (header, size) = match version {
            3 => Self::parse_v3(r),
            4 => Self::parse_v4(r),
            _ => Err(Error::InvalidExtendedHeader),
        }
        .map_err(|_| Error::InvalidExtendedHeader)?;

        // fields must fit within the declared size
        if size < r.position() - start {
            return Err(Error::InvalidExtendedHeader);
        }
        r.seek(start + size)
            .map_err(|_| Error::InvalidExtendedHeader)?;
        Ok(header)
    }

    fn parse_v3(r: &mut Reader<'_>) -> Result<(Self, usize), Error> {
        let size = r.read_u32()? as usize;
        let flags = r.read_u16()?;
        let padding_size = r.read_u32()?;
        let crc = match flags & 0x8000 {
            0 => None,
            _ => Some(r.read_u32()?),
        };
        let header = Self {
            update: false,
            crc,
            padding_size,
            restrictions: None,
        };
        Ok((header, size + 4))
    }

    fn parse_v4(r: &mut Reader<'_>) -> Result<(Self, usize), Error> {
        let size = r.read_synchsafe()? as usize;
        let flag_bytes = r.read_u8()?;
        if flag_bytes == 0 {
            return Err(Error::InvalidExtendedHeader);
        }
        let flags = r.read_u8()?;
        r.read_bytes(usize::from(flag_bytes - 1))?;

        let mut header = Self::default();
        if flags & 0x40 != 0 {
            r.read_u8()?;
            header.update = true;
        }
        if flags & 0x20 != 0 {
            if r.read_u8()? != 5 {
                return Err(Error::InvalidExtendedHeader);
            }
            header.crc = Some(unsynchsafe_u35(r.read_array()?));
        }
        if flags & 0x10 != 0 {
            if r.read_u8()? != 1 {
                return Err(Error::InvalidExtendedHeader);
            }
            header.restrictions = Some(r.read_u8()?);
        }
        Ok((header, size))
    }

    /// Encodes the header for the given version
    ///
    /// `crc` replaces any stored CRC, and `padding`
    /// replaces the stored padding size.
    pub fn to_bytes(&self, version: u8, crc: Option<u32>, padding: u32) -> Result<Vec<u8>, Error> {
        let mut w = Writer::new();
        match version {
            3 => {
                w.write_u32(if crc.is_some() { 10 } else { 6 })?;
                w.write_u16(if crc.is_some() { 0x8000 } else { 0 })?;
                w.write_u32(padding)?;
                if let Some(crc) = crc {
                    w.write_u32(crc)?;
                }
            }
            4 => {
                let mut fields = Writer::new();
                let mut flags = 0;
                if self.update {
                    flags |= 0x40;
                    fields.write_u8(0)?;
                }
                if let Some(crc) = crc {
                    flags |= 0x20;
                    fields.write_u8(5)?;
                    fields.write_bytes(&synchsafe_u35(crc))?;
                }
                if let Some(restrictions) = self.restrictions {
                    flags |= 0x10;
                    fields.write_u8(1)?;
                    fields.write_u8(restrictions)?;
                }
                w.write_synchsafe(6 + fields.len() as u32)?;
                w.write_u8(1)?;
                w.write_u8(flags)?;
                w.write_bytes(fields.as_slice())?;
            }
            _ => return Err(Error::InvalidExtendedHeader),
        }
        Ok(w.into_inner())
    }
}

/// Frame status flags
///
/// | Flag | v2.3 bit | v2.4 bit |
/// |------|---------:|---------:|
/// | tag alter preservation | `0x80` | `0x40` |
/// | file alter preservation | `0x40` | `0x20` |
/// | read only | `0x20` | `0x10` |
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StatusFlags {
    /// Whether to discard the frame if the tag is altered
    pub tag_alter_preservation: bool,
    /// Whether to discard the frame if the audio is altered
    pub file_alter_preservation: bool,
    /// Whether the frame is intended to be read only
    pub read_only: bool,
}

impl StatusFlags {
    /// Decodes the status byte of the given version
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedFrameFlags`] if any reserved bit is set.
    pub fn from_byte(byte: u8, version: u8) -> Result<Self, Error> {
        let (reserved, shift) = match version {
            3 => (0x1F, 0),
            4 => (0x8F, 1),
            _ => return Ok(Self::default()),
        };
        match byte & reserved {
            0 => Ok(Self {
                tag_alter_preservation: byte & (0x80 >> shift) != 0,
                file_alter_preservation: byte & (0x40 >> shift) != 0,
                read_only: byte & (0x20 >> shift) != 0,
            }),
            _ => Err(Error::ReservedFrameFlags),
        }
    }

    /// Encodes the status byte of the given version
    pub fn to_byte(self, version: u8) -> u8 {
        let shift = u8::from(version == 4);
        [
            (self.tag_alter_preservation, 0x80),
            (self.file_alter_preservation, 0x40),
            (self.read_only, 0x20),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(0, |byte, (_, bit)| byte | (bit >> shift))
    }
}

/// Frame format flags
///
/// | Flag | v2.3 bit | v2.4 bit |
/// |------|---------:|---------:|
/// | grouping | `0x20` | `0x40` |
/// | compression | `0x80` | `0x08` |
/// | encryption | `0x40` | `0x04` |
/// | unsynchronisation | | `0x02` |
/// | data length indicator | | `0x01` |
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FormatFlags {
    /// Whether a group ID byte precedes the payload
    pub grouping: bool,
    /// Whether the payload is zlib-compressed
    pub compression: bool,
    /// Whether the payload is encrypted
    pub encryption: bool,
    /// Whether unsynchronisation was applied to the payload
    pub unsynchronisation: bool,
    /// Whether a synchsafe data length precedes the payload
    pub data_length_indicator: bool,
}

impl FormatFlags {
    /// Decodes the format byte of the given version
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReservedFrameFlags`] if any reserved bit is set.
    pub fn from_byte(byte: u8, version: u8) -> Result<Self, Error> {
        match version {
            3 if byte & 0x1F != 0 => Err(Error::ReservedFrameFlags),
            3 => Ok(Self {
                compression: byte & 0x80 != 0,
                encryption: byte & 0x40 != 0,
                grouping: byte & 0x20 != 0,
                ..Self::default()
            }),
            4 if byte & 0xB0 != 0 => Err(Error::ReservedFrameFlags),
            4 => Ok(Self {
                grouping: byte & 0x40 != 0,
                compression: byte & 0x08 != 0,
                encryption: byte & 0x04 != 0,
                unsynchronisation: byte & 0x02 != 0,
                data_length_indicator: byte & 0x01 != 0,
            }),
            _ => Ok(Self::default()),
        }
    }

    /// Encodes the format byte of the given version
    pub fn to_byte(self, version: u8) -> u8 {
        let bits = match version {
            3 => [
                (self.compression, 0x80),
                (self.encryption, 0x40),
                (self.grouping, 0x20),
                (false, 0),
                (false, 0),
            ],
            4 => [
                (self.grouping, 0x40),
                (self.compression, 0x08),
                (self.encryption, 0x04),
                (self.unsynchronisation, 0x02),
                (self.data_length_indicator, 0x01),
            ],
            _ => [(false, 0); 5],
        };
        bits.into_iter()
            .filter(|(set, _)| *set)
            .fold(0, |byte, (_, bit)| byte | bit)
    }
}

/// A frame as found in a tag, before its payload is decoded
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawFrame {
    /// The frame ID, without any trailing padding
    pub id: String,
    /// Offset of the frame header from the start of the frame data
    pub offset: usize,
    /// The declared payload size
    pub size: usize,
    /// The status and format flag bytes, zero for ID3v2.2
    pub flags: [u8; 2],
    /// The payload, plus any bytes skipped after it
    pub data: Vec<u8>,
}

/// Why a frame couldn't be decoded
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidFrame {
    /// A description of the failure
    pub reason: String,
    /// The payload exactly as found in the tag
    pub raw: Vec<u8>,
    /// The version of the tag the frame came from
    pub version: u8,
}

/// A single decoded frame
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// The frame ID
    pub id: String,
    /// The frame's title, if its ID is known
    pub title: Option<&'static str>,
    /// The decoded payload
    ///
    /// For invalid frames this is always [`FrameValue::Binary`]
    /// holding the payload exactly as found in the tag.
    pub value: FrameValue,
    /// Status flags
    pub status: StatusFlags,
    /// Format flags
    pub format: FormatFlags,
    /// Group ID, for grouped frames
    pub group_id: Option<u8>,
    /// Set if the payload couldn't be decoded
    pub invalid: Option<InvalidFrame>,
}

impl Frame {
    /// Builds a frame with default flags
    pub fn new<S: Into<String>>(id: S, value: FrameValue) -> Self {
        Self {
            id: id.into(),
            title: None,
            value,
            status: StatusFlags::default(),
            format: FormatFlags::default(),
            group_id: None,
            invalid: None,
        }
    }

    /// Builds a text frame using the tag's default encoding
    pub fn text<I: Into<String>, S: Into<String>>(id: I, text: S) -> Self {
        Self::new(id, FrameValue::text(text))
    }

    /// Whether the frame's payload was decoded
    pub fn is_valid(&self) -> bool {
        self.invalid.is_none()
    }
}

/// ID3v2 writing options
#[derive(Clone, Debug, Default)]
pub struct WriteOptions {
    default_encoding: Option<Encoding>,
    padding_size: Option<u32>,
    keep_backup: bool,
    unsynchronisation: bool,
    compress_frames: bool,
}

impl WriteOptions {
    /// Text encoding for frames which don't specify one
    ///
    /// If unset, ISO-8859-1 is used before ID3v2.4
    /// and UTF-8 afterward.
    pub fn default_encoding(self, default_encoding: Encoding) -> Self {
        Self {
            default_encoding: Some(default_encoding),
            ..self
        }
    }

    /// Number of zero bytes to place after the last frame
    ///
    /// If unset, the padding found when the tag was read is kept.
    pub fn padding(self, padding_size: u32) -> Self {
        Self {
            padding_size: Some(padding_size),
            ..self
        }
    }

    /// Whether to keep the original file as a `.bak` sibling
    /// when rewriting in place
    pub fn keep_backup(self, keep_backup: bool) -> Self {
        Self { keep_backup, ..self }
    }

    /// Whether to apply unsynchronisation when writing
    pub fn unsynchronisation(self, unsynchronisation: bool) -> Self {
        Self {
            unsynchronisation,
            ..self
        }
    }

    /// Whether to compress every frame when writing
    ///
    /// Has no effect on ID3v2.2, which has no frame compression.
    pub fn compression(self, compress_frames: bool) -> Self {
        Self {
            compress_frames,
            ..self
        }
    }

    /// Whether a backup should be kept
    pub fn keeps_backup(&self) -> bool {
        self.keep_backup
    }
}

/// A complete ID3v2 tag
///
/// # Example
/// ```
/// use id3_codec::id3v2::{Frame, Tag, WriteOptions, registry::Registry};
///
/// let registry = Registry::new();
///
/// let mut tag = Tag::new(4);
/// tag.frames.push(Frame::text("TIT2", "Title"));
/// tag.frames.push(Frame::text("TPE1", "Artist"));
///
/// let bytes = tag.to_bytes(4, &WriteOptions::default().padding(10), &registry).unwrap();
///
/// let tag = Tag::parse(&bytes, &registry).unwrap();
/// assert_eq!(tag.text("TIT2"), Some("Title"));
/// assert_eq!(tag.text("TPE1"), Some("Artist"));
/// assert_eq!(tag.padding, 10);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    /// The tag header as read, or as it will be written
    pub header: TagHeader,
    /// The extended header, if any
    pub extended: Option<ExtendedHeader>,
    /// The tag's frames, in order
    pub frames: Vec<Frame>,
    /// Bytes of padding after the last frame
    pub padding: u32,
    /// Offset of the tag in its stream
    pub offset: u64,
}

impl Tag {
    /// Builds an empty tag of the given version
    pub fn new(version: u8) -> Self {
        Self {
            header: TagHeader::new(version, 0),
            extended: None,
            frames: Vec::new(),
            padding: 0,
            offset: 0,
        }
    }

    /// Total bytes occupied by the tag as read
    pub fn total_size(&self) -> u64 {
        self.header.total_size()
    }

    /// Offset of the first byte after the tag
    pub fn end(&self) -> u64 {
        self.offset + self.total_size()
    }

    /// The first frame with the given ID
    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// The text of the first text frame with the given ID
    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|f| f.value.as_text())
    }

    /// Replaces any frames having the given ID with a single text frame
    pub fn set_text<S: Into<String>>(&mut self, id: &str, text: S) {
        self.remove(id);
        self.frames.push(Frame::text(id, text));
    }

    /// Removes every frame with the given ID, returning how many there were
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.frames.len();
        self.frames.retain(|f| f.id != id);
        before - self.frames.len()
    }

    /// Parses a complete tag from the start of `bytes`
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid,
    /// if `bytes` is shorter than the declared tag size,
    /// or if the extended header is invalid.
    /// Problems with individual frames are not errors;
    /// those frames are marked invalid instead.
    pub fn parse(bytes: &[u8], registry: &Registry) -> Result<Self, Error> {
        let header: TagHeader = BitReader::endian(bytes, BigEndian).parse()?;
        let body = bytes
            .get(TagHeader::SIZE..TagHeader::SIZE + header.size as usize)
            .ok_or(Error::UnexpectedEnd)?;
        Self::from_body(header, body, registry)
    }

    /// Parses a tag from its header and the bytes after it
    ///
    /// `body` may be shorter than the declared size
    /// if the tag was truncated.
    pub fn from_body(header: TagHeader, body: &[u8], registry: &Registry) -> Result<Self, Error> {
        let mut r = Reader::new(body);

        let extended = match header.flags.extended_header {
            true => Some(ExtendedHeader::parse(&mut r, header.version)?),
            false => None,
        };
        let frame_data = r.read_rest();

        if header.flags.compression {
            log::warn!("skipping frames of compressed ID3v2.2 tag");
            return Ok(Self {
                header,
                extended,
                frames: Vec::new(),
                padding: frame_data.len() as u32,
                offset: 0,
            });
        }

        let ctx = ParseContext {
            version: header.version,
            registry,
            unsynchronisation: header.flags.unsynchronisation,
        };
        let (raw_frames, consumed) = read_raw_frames(frame_data, &ctx);

        if let Some(expected) = extended.and_then(|e| e.crc) {
            let covered = match header.version {
                3 => consumed,
                _ => frame_data.len(),
            };
            let mut crc = flate2::Crc::new();
            crc.update(&frame_data[..covered]);
            if crc.sum() != expected {
                log::warn!("tag CRC mismatch: stored {expected:#010x}, computed {:#010x}", crc.sum());
            }
        }

        Ok(Self {
            header,
            extended,
            frames: raw_frames
                .into_iter()
                .map(|raw| decode_frame(raw, &ctx))
                .collect(),
            padding: (frame_data.len() - consumed) as u32,
            offset: 0,
        })
    }

    /// Encodes the tag as the given version
    ///
    /// Frames are mapped to the target version's IDs where needed.
    /// Frames with no equivalent in the target version are dropped,
    /// as are invalid frames unless the target version matches
    /// the version they were read from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] if the version
    /// isn't 2, 3 or 4, [`Error::MissingGroupId`] if a grouped
    /// frame has no group ID, or [`Error::InvalidTagSize`]
    /// if the tag is too large.
    pub fn to_bytes(
        &self,
        version: u8,
        options: &WriteOptions,
        registry: &Registry,
    ) -> Result<Vec<u8>, Error> {
        if !(2..=4).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let ctx = WriteContext::new(version, registry, options);
        let mut frames = encode_frames(&self.frames, &ctx)?;

        let unsynchronisation = match version {
            4 => options.unsynchronisation,
            _ => options.unsynchronisation && needs_unsync(&frames),
        };
        if unsynchronisation && version < 4 {
            frames = insert_unsync(&frames);
        }

        let footer = version == 4 && self.header.flags.footer;
        let padding = match footer {
            true => 0,
            false => options.padding_size.unwrap_or(self.padding),
        };

        let extended = match (self.extended, version) {
            (Some(extended), 3 | 4) => {
                let crc = extended.crc.map(|_| {
                    let mut crc = flate2::Crc::new();
                    crc.update(&frames);
                    if version == 4 {
                        crc.update(&vec![0; padding as usize]);
                    }
                    crc.sum()
                });
                extended.to_bytes(version, crc, padding)?
            }
            _ => Vec::new(),
        };

        let size = u32::try_from(extended.len() + frames.len())
            .ok()
            .and_then(|size| size.checked_add(padding))
            .ok_or(Error::InvalidTagSize)?;

        let header = TagHeader {
            flags: TagFlags {
                unsynchronisation,
                extended_header: !extended.is_empty(),
                compression: false,
                experimental: self.header.flags.experimental && version >= 3,
                footer,
            },
            ..TagHeader::new(version, size)
        };

        let mut output = Vec::with_capacity(header.total_size() as usize);
        BitWriter::endian(&mut output, BigEndian).build(&header)?;
        output.extend_from_slice(&extended);
        output.extend_from_slice(&frames);
        output.resize(output.len() + padding as usize, 0);
        if footer {
            let mut footer = Vec::with_capacity(TagHeader::SIZE);
            BitWriter::endian(&mut footer, BigEndian).build(&header)?;
            footer[..3].copy_from_slice(&FOOTER_MARKER);
            output.extend_from_slice(&footer);
        }
        Ok(output)
    }
}

/// Returns the ID length and frame header length of a version
fn frame_layout(version: u8) -> (usize, usize) {
    match version {
        2 => (3, 6),
        _ => (4, 10),
    }
}

/// Reads a single frame header, validating it
fn read_frame_header(
    r: &mut Reader<'_>,
    ctx: &ParseContext<'_>,
) -> Result<(String, usize, [u8; 2]), Error> {
    let (id_len, header_len) = frame_layout(ctx.version);

    // tag-wide unsynchronisation covers frame headers too
    let header = match ctx.unsynchronisation && ctx.version < 4 {
        true => r.read_unsynced(header_len)?,
        false => r.read_bytes(header_len)?.to_vec(),
    };
    let mut h = Reader::new(&header);

    let id = h.read_bytes(id_len)?;
    if !ctx.registry.is_valid_id(id) {
        return Err(Error::InvalidFrameId);
    }

    let size = match ctx.version {
        2 => h.read_u24()?,
        3 => h.read_u32()?,
        _ => h.read_synchsafe()?,
    } as usize;

    let flags = match ctx.version {
        2 => [0, 0],
        _ => h.read_array()?,
    };
    StatusFlags::from_byte(flags[0], ctx.version)?;
    FormatFlags::from_byte(flags[1], ctx.version)?;

    if size > r.remaining() {
        return Err(Error::ExcessiveFrameSize);
    }

    Ok((
        Encoding::Latin1.decode(registry::trim_id(id)),
        size,
        flags,
    ))
}

/// Splits frame data into raw frames
///
/// Returns the frames along with the number of bytes
/// they occupy, which is where padding begins.
pub fn read_raw_frames(data: &[u8], ctx: &ParseContext<'_>) -> (Vec<RawFrame>, usize) {
    let (_, header_len) = frame_layout(ctx.version);
    let mut r = Reader::new(data);
    let mut frames: Vec<RawFrame> = Vec::new();
    let mut skip = 0;

    while r.remaining() >= header_len {
        let start = r.position();
        if r.peek(1) == Some(&[0]) {
            break;
        }

        let frame = read_frame_header(&mut r, ctx).and_then(|(id, size, flags)| {
            let payload = match ctx.unsynchronisation && ctx.version < 4 {
                true => r.read_unsynced(size)?,
                false => r.read_bytes(size)?.to_vec(),
            };
            Ok(RawFrame {
                id,
                offset: start,
                size,
                flags,
                data: payload,
            })
        });

        match frame {
            Ok(frame) => {
                if skip > 0 {
                    match frames.last_mut() {
                        Some(previous) => {
                            log::debug!("appending {skip} skipped bytes to frame {}", previous.id);
                            previous.data.extend_from_slice(&data[start - skip..start]);
                        }
                        None => log::debug!("dropping {skip} bytes before first frame"),
                    }
                    skip = 0;
                }
                frames.push(frame);
            }
            Err(_) => {
                // try again one byte later
                if r.seek(start + 1).is_err() {
                    break;
                }
                skip += 1;
            }
        }
    }

    (frames, r.position() - skip)
}

/// Strips a payload's frame-level encodings
///
/// Returns the group ID, if any, and the plain payload.
fn decode_payload(
    data: &[u8],
    format: FormatFlags,
    ctx: &ParseContext<'_>,
) -> Result<(Option<u8>, Vec<u8>), Error> {
    let mut r = Reader::new(data);
    let mut group_id = None;

    match ctx.version {
        3 => {
            if format.compression {
                // decompressed size
                r.read_u32()?;
            }
            if format.encryption {
                return Err(Error::EncryptedFrame);
            }
            if format.grouping {
                group_id = Some(r.read_u8()?);
            }
        }
        4 => {
            if format.grouping {
                group_id = Some(r.read_u8()?);
            }
            if format.encryption {
                return Err(Error::EncryptedFrame);
            }
            if format.data_length_indicator {
                r.read_synchsafe()?;
            }
        }
        _ => {}
    }

    let payload = match ctx.version == 4 && (format.unsynchronisation || ctx.unsynchronisation) {
        true => remove_unsync(r.read_rest()),
        false => r.read_rest().to_vec(),
    };

    match format.compression {
        true => decompress(&payload).map(|payload| (group_id, payload)),
        false => Ok((group_id, payload)),
    }
}

/// Inflates zlib data, falling back to raw deflate
fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut output = Vec::new();
    if flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut output)
        .is_ok()
    {
        return Ok(output);
    }

    output.clear();
    match flate2::read::DeflateDecoder::new(data).read_to_end(&mut output) {
        Ok(_) => Ok(output),
        Err(_) => Err(Error::Decompression),
    }
}

fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Write;

    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decodes a raw frame's payload through its registered codec
///
/// Decoding never fails outright; frames which can't be decoded
/// are marked invalid and keep their payload as raw bytes.
pub fn decode_frame(raw: RawFrame, ctx: &ParseContext<'_>) -> Frame {
    let def = ctx.registry.find(&raw.id);
    let status = StatusFlags::from_byte(raw.flags[0], ctx.version).unwrap_or_default();
    let format = FormatFlags::from_byte(raw.flags[1], ctx.version).unwrap_or_default();

    let decoded = decode_payload(&raw.data, format, ctx).and_then(|(group_id, payload)| {
        def.codec
            .parse(&mut Reader::new(&payload), ctx)
            .map(|value| (group_id, value))
    });

    let mut frame = Frame {
        id: raw.id,
        title: def.known_title(),
        value: FrameValue::Binary(Vec::new()),
        status,
        format,
        group_id: None,
        invalid: None,
    };

    match decoded {
        Ok((group_id, value)) => {
            frame.group_id = group_id;
            frame.value = value;
        }
        Err(err) => {
            log::warn!("frame {} is invalid: {err}", frame.id);
            frame.invalid = Some(InvalidFrame {
                reason: err.to_string(),
                raw: raw.data.clone(),
                version: ctx.version,
            });
            frame.value = FrameValue::Binary(raw.data);
        }
    }

    frame
}

/// Parses nested frames, such as those inside a chapter
///
/// Any unsynchronisation has already been removed
/// from the enclosing frame's payload.
pub fn parse_frames(data: &[u8], ctx: &ParseContext<'_>) -> Vec<Frame> {
    let ctx = ParseContext {
        unsynchronisation: false,
        ..*ctx
    };
    read_raw_frames(data, &ctx)
        .0
        .into_iter()
        .map(|raw| decode_frame(raw, &ctx))
        .collect()
}

/// Encodes frames for the context's version, in order
///
/// Frames which can't be represented in that version are skipped.
///
/// # Errors
///
/// Returns [`Error::MissingGroupId`] if a grouped frame
/// has no group ID.
pub fn encode_frames(frames: &[Frame], ctx: &WriteContext<'_>) -> Result<Vec<u8>, Error> {
    let mut w = Writer::new();
    for frame in frames {
        if let Some(encoded) = encode_frame(frame, ctx)? {
            w.write_bytes(&encoded)?;
        }
    }
    Ok(w.into_inner())
}

fn write_frame_header(
    w: &mut Writer,
    id: &str,
    size: usize,
    flags: [u8; 2],
    version: u8,
) -> Result<(), Error> {
    w.write_bytes(id.as_bytes())?;
    let size = u32::try_from(size).map_err(|_| Error::ExcessiveFrameSize)?;
    match version {
        2 => w.write_u24(size),
        3 => w.write_u32(size),
        _ => w.write_synchsafe(size),
    }
    .map_err(|_| Error::ExcessiveFrameSize)?;
    match version {
        2 => Ok(()),
        _ => w.write_bytes(&flags),
    }
}

/// Encodes a single frame, or returns `None` if it must be dropped
fn encode_frame(frame: &Frame, ctx: &WriteContext<'_>) -> Result<Option<Vec<u8>>, Error> {
    let version = ctx.version;
    let (id_len, _) = frame_layout(version);
    let mut w = Writer::new();

    if let Some(invalid) = &frame.invalid {
        if invalid.version != version || frame.id.len() != id_len {
            log::warn!("dropping invalid frame {} from ID3v2.{version} tag", frame.id);
            return Ok(None);
        }
        let flags = [frame.status.to_byte(version), frame.format.to_byte(version)];
        return match write_frame_header(&mut w, &frame.id, invalid.raw.len(), flags, version) {
            Ok(()) => {
                w.write_bytes(&invalid.raw)?;
                Ok(Some(w.into_inner()))
            }
            Err(err) => {
                log::warn!("dropping frame {}: {err}", frame.id);
                Ok(None)
            }
        };
    }

    let Some(def) = ctx.registry.resolve_for_version(&frame.id, version) else {
        log::warn!("dropping frame {} with no ID3v2.{version} equivalent", frame.id);
        return Ok(None);
    };
    let id = if def.is_known() { def.id } else { frame.id.as_str() };
    if id.len() != id_len || !id.is_ascii() {
        log::warn!("dropping frame {id} whose ID doesn't fit ID3v2.{version}");
        return Ok(None);
    }

    let mut payload = Writer::new();
    if let Err(err) = def.codec.write(&frame.value, &mut payload, ctx) {
        log::warn!("dropping frame {id}: {err}");
        return Ok(None);
    }
    let mut data = payload.into_inner();
    let data_length = data.len();

    let mut format = FormatFlags {
        encryption: false,
        ..frame.format
    };
    match version {
        2 => format = FormatFlags::default(),
        3 => {
            format.compression |= ctx.options.compress_frames;
            format.unsynchronisation = false;
            format.data_length_indicator = false;
        }
        _ => {
            format.compression |= ctx.options.compress_frames;
            format.unsynchronisation |= ctx.options.unsynchronisation;
            format.data_length_indicator |= format.compression;
        }
    }

    if format.compression {
        data = compress(&data)?;
    }
    if format.unsynchronisation {
        data = insert_unsync(&data);
    }

    let mut extras = Writer::new();
    let group_id = match format.grouping {
        true => Some(frame.group_id.ok_or(Error::MissingGroupId)?),
        false => None,
    };
    match version {
        3 => {
            if format.compression {
                extras.write_u32(data_length as u32)?;
            }
            if let Some(group_id) = group_id {
                extras.write_u8(group_id)?;
            }
        }
        4 => {
            if let Some(group_id) = group_id {
                extras.write_u8(group_id)?;
            }
            if format.data_length_indicator {
                extras.write_synchsafe(data_length as u32)?;
            }
        }
        _ => {}
    }

    let flags = [frame.status.to_byte(version), format.to_byte(version)];
    match write_frame_header(&mut w, id, extras.len() + data.len(), flags, version) {
        Ok(()) => {
            w.write_bytes(extras.as_slice())?;
            w.write_bytes(&data)?;
            Ok(Some(w.into_inner()))
        }
        Err(err) => {
            log::warn!("dropping frame {id}: {err}");
            Ok(None)
        }
    }
}
