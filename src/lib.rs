// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for reading and writing ID3 tags
//! and locating the MPEG audio frames they're attached to.
//!
//! ID3v2 tags (versions 2.2, 2.3 and 2.4) are handled by [`id3v2`],
//! ID3v1 trailers by [`id3v1`] and audio frames by [`mpeg`].
//! The [`file`] module ties them together over
//! the asynchronous byte streams in [`stream`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod binary;
pub mod file;
pub mod id3v1;
pub mod id3v2;
pub mod mpeg;
pub mod stream;
pub mod synchsafe;

/// A possible error when reading or writing tags
#[derive(Debug)]
pub enum Error {
    /// A general I/O error from the underlying stream
    Io(std::io::Error),
    /// Data ended before a field was complete
    UnexpectedEnd,
    /// An ID3v2 tag didn't start with `"ID3"`
    InvalidTagMarker,
    /// An ID3v2 tag's size was not synchsafe or is too large
    InvalidTagSize,
    /// An ID3v2 tag version other than 2, 3 or 4
    UnsupportedVersion(u8),
    /// An extended header didn't fit its declared size
    InvalidExtendedHeader,
    /// Bytes where a frame should start aren't a frame ID
    InvalidFrameId,
    /// A frame header sets reserved flag bits
    ReservedFrameFlags,
    /// A frame's declared size exceeds the bytes remaining
    ExcessiveFrameSize,
    /// A frame is encrypted
    EncryptedFrame,
    /// A compressed frame couldn't be inflated
    Decompression,
    /// A text encoding byte is undefined or unsupported by the tag version
    InvalidTextEncoding(u8),
    /// A picture type is undefined
    InvalidPictureType,
    /// A frame value doesn't have the shape its frame ID requires
    ValueMismatch,
    /// A value doesn't fit in its field
    ExcessiveValue,
    /// A grouped frame has no group ID
    MissingGroupId,
    /// An ID3v1 tag didn't start with `"TAG"` or wasn't 128 bytes
    InvalidId3v1,
    /// An MPEG frame header didn't start with a sync pattern
    InvalidSyncCode,
    /// An MPEG frame header uses the reserved version
    ReservedMpegVersion,
    /// An MPEG frame header uses the reserved layer
    ReservedLayer,
    /// An MPEG frame header uses a free-format or invalid bit rate
    InvalidBitRate,
    /// An MPEG frame header uses the reserved sample rate
    ReservedSampleRate,
    /// An MPEG frame header uses the reserved emphasis
    ReservedEmphasis,
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEnd,
            _ => Self::Io(error),
        }
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::UnexpectedEnd => "unexpected end of data".fmt(f),
            Self::InvalidTagMarker => "missing ID3 tag marker".fmt(f),
            Self::InvalidTagSize => "invalid ID3v2 tag size".fmt(f),
            Self::UnsupportedVersion(v) => write!(f, "unsupported ID3v2 version 2.{v}"),
            Self::InvalidExtendedHeader => "invalid extended header".fmt(f),
            Self::InvalidFrameId => "invalid frame ID".fmt(f),
            Self::ReservedFrameFlags => "reserved frame flags set".fmt(f),
            Self::ExcessiveFrameSize => "frame size exceeds tag size".fmt(f),
            Self::EncryptedFrame => "encrypted frames are unsupported".fmt(f),
            Self::Decompression => "unable to decompress frame".fmt(f),
            Self::InvalidTextEncoding(e) => write!(f, "invalid text encoding {e}"),
            Self::InvalidPictureType => "reserved picture type".fmt(f),
            Self::ValueMismatch => "frame value doesn't match frame type".fmt(f),
            Self::ExcessiveValue => "value too large for field".fmt(f),
            Self::MissingGroupId => "grouped frame missing group ID".fmt(f),
            Self::InvalidId3v1 => "invalid ID3v1 tag".fmt(f),
            Self::InvalidSyncCode => "invalid MPEG frame sync code".fmt(f),
            Self::ReservedMpegVersion => "reserved MPEG version".fmt(f),
            Self::ReservedLayer => "reserved MPEG layer".fmt(f),
            Self::InvalidBitRate => "invalid MPEG bit rate".fmt(f),
            Self::ReservedSampleRate => "reserved MPEG sample rate".fmt(f),
            Self::ReservedEmphasis => "reserved MPEG emphasis".fmt(f),
        }
    }
}
