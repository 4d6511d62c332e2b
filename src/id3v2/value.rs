// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decoded ID3v2 frame payloads
//!
//! Each payload shape is its own type implementing [`ValueCodec`],
//! and [`FrameValue`] is the closed set of all of them.
//! The registry assigns a [`Codec`] to every frame ID,
//! which picks the shape to parse a payload into.
//!
//! Frames whose text encoding is `None` are written
//! using the tag-wide default encoding from [`super::WriteOptions`].

use super::registry::Registry;
use super::{Frame, WriteOptions};
use crate::Error;
use crate::binary::{Encoding, Reader, Writer};
use arrayvec::ArrayVec;

/// Everything a codec needs to know while parsing
#[derive(Copy, Clone, Debug)]
pub struct ParseContext<'r> {
    /// The tag's major version
    pub version: u8,
    /// Used to parse nested frames
    pub registry: &'r Registry,
    /// Whether the tag-level unsynchronisation flag was set
    pub unsynchronisation: bool,
}

impl<'r> ParseContext<'r> {
    /// Builds a context for the given version
    pub fn new(version: u8, registry: &'r Registry) -> Self {
        Self {
            version,
            registry,
            unsynchronisation: false,
        }
    }
}

/// Everything a codec needs to know while writing
#[derive(Copy, Clone, Debug)]
pub struct WriteContext<'r> {
    /// The major version being written
    pub version: u8,
    /// Used to resolve nested frames
    pub registry: &'r Registry,
    /// Tag-wide options
    pub options: &'r WriteOptions,
}

impl<'r> WriteContext<'r> {
    /// Builds a context for the given version
    pub fn new(version: u8, registry: &'r Registry, options: &'r WriteOptions) -> Self {
        Self {
            version,
            registry,
            options,
        }
    }

    /// The encoding actually written for a frame's preferred encoding
    ///
    /// Frames without a preference use the tag-wide default,
    /// which is ISO-8859-1 before ID3v2.4 and UTF-8 afterward.
    /// Encodings the version doesn't support become UTF-16.
    pub fn encoding(&self, preferred: Option<Encoding>) -> Encoding {
        preferred
            .or(self.options.default_encoding)
            .unwrap_or(match self.version {
                4 => Encoding::Utf8,
                _ => Encoding::Latin1,
            })
            .for_version(self.version)
    }
}

/// Parsing, writing and simplifying a single payload shape
pub trait ValueCodec: Sized {
    /// Parses a value from a frame's payload
    ///
    /// # Errors
    ///
    /// Returns an error if the payload doesn't fit the shape.
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error>;

    /// Writes the value as a frame's payload
    ///
    /// # Errors
    ///
    /// Returns an error if some field can't be represented.
    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error>;

    /// Renders the value as a short human-readable string
    fn simplify(&self) -> String;
}

/// The codec assigned to a frame ID
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Codec {
    /// [`Text`]
    Text,
    /// [`Url`]
    Url,
    /// [`IdText`]
    IdText,
    /// [`IdUrl`]
    IdUrl,
    /// [`LangDescText`]
    LangDescText,
    /// [`TermsOfUse`]
    TermsOfUse,
    /// [`Pairs`]
    Pairs,
    /// [`Picture`]
    Picture,
    /// Opaque bytes
    Binary,
    /// [`IdBinary`]
    IdBinary,
    /// [`Number`]
    Number,
    /// [`Popularimeter`]
    Popularimeter,
    /// [`Boolean`]
    Boolean,
    /// [`VolumeAdjustment`]
    VolumeAdjustment,
    /// [`VolumeAdjustment2`]
    VolumeAdjustment2,
    /// [`Chapter`]
    Chapter,
    /// [`ChapterToc`]
    ChapterToc,
    /// [`EventTiming`]
    EventTiming,
    /// [`SyncedLyrics`]
    SyncedLyrics,
    /// [`EncapsulatedObject`]
    EncapsulatedObject,
    /// [`LinkedInfo`]
    LinkedInfo,
    /// [`AudioEncryption`]
    AudioEncryption,
    /// [`Registration`]
    Registration,
    /// [`Ownership`]
    Ownership,
    /// [`PositionSync`]
    PositionSync,
    /// [`BufferSize`]
    BufferSize,
}

/// A decoded frame payload
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameValue {
    /// Text information (`T***`)
    Text(Text),
    /// A URL link (`W***`)
    Url(Url),
    /// User-defined text (`TXXX`)
    IdText(IdText),
    /// User-defined URL (`WXXX`)
    IdUrl(IdUrl),
    /// Comments and unsynchronised lyrics (`COMM`, `USLT`)
    LangDescText(LangDescText),
    /// Terms of use (`USER`)
    TermsOfUse(TermsOfUse),
    /// Involved people and musician credits (`IPLS`, `TIPL`, `TMCL`)
    Pairs(Pairs),
    /// An attached picture (`APIC`)
    Picture(Picture),
    /// Raw payload bytes, used for uninterpreted and invalid frames
    Binary(Vec<u8>),
    /// Owner-identified binary data (`UFID`, `PRIV`)
    IdBinary(IdBinary),
    /// A single counter (`PCNT`, `SEEK`)
    Number(Number),
    /// Rating and play count (`POPM`)
    Popularimeter(Popularimeter),
    /// A flag stored as text (`TCMP`)
    Boolean(Boolean),
    /// Relative volume adjustment (`RVAD`)
    VolumeAdjustment(VolumeAdjustment),
    /// Relative volume adjustment (`RVA2`)
    VolumeAdjustment2(VolumeAdjustment2),
    /// A chapter (`CHAP`)
    Chapter(Chapter),
    /// A table of contents (`CTOC`)
    ChapterToc(ChapterToc),
    /// Event timing codes (`ETCO`)
    EventTiming(EventTiming),
    /// Synchronised lyrics (`SYLT`)
    SyncedLyrics(SyncedLyrics),
    /// A general encapsulated object (`GEOB`)
    EncapsulatedObject(EncapsulatedObject),
    /// Linked information (`LINK`)
    LinkedInfo(LinkedInfo),
    /// Audio encryption (`AENC`)
    AudioEncryption(AudioEncryption),
    /// Encryption and group registrations (`ENCR`, `GRID`)
    Registration(Registration),
    /// Ownership (`OWNE`)
    Ownership(Ownership),
    /// Position synchronisation (`POSS`)
    PositionSync(PositionSync),
    /// Recommended buffer size (`RBUF`)
    BufferSize(BufferSize),
}

macro_rules! codecs {
    ($($codec:ident),* $(,)?) => {
        impl Codec {
            /// Parses a payload into this codec's shape
            ///
            /// # Errors
            ///
            /// Returns an error if the payload doesn't fit the shape.
            pub fn parse(self, r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<FrameValue, Error> {
                match self {
                    $(Self::$codec => $codec::parse(r, ctx).map(FrameValue::$codec),)*
                    Self::Binary => Ok(FrameValue::Binary(r.read_rest().to_vec())),
                }
            }

            /// Writes a value as this codec's payload
            ///
            /// Raw bytes are accepted by every codec and written verbatim.
            ///
            /// # Errors
            ///
            /// Returns [`Error::ValueMismatch`] if the value
            /// has some other codec's shape.
            pub fn write(self, value: &FrameValue, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
                match (self, value) {
                    (_, FrameValue::Binary(raw)) => w.write_bytes(raw),
                    $((Self::$codec, FrameValue::$codec(v)) => v.write(w, ctx),)*
                    _ => Err(Error::ValueMismatch),
                }
            }
        }

        impl FrameValue {
            /// The codec matching this value's shape
            pub fn codec(&self) -> Codec {
                match self {
                    $(Self::$codec(_) => Codec::$codec,)*
                    Self::Binary(_) => Codec::Binary,
                }
            }

            /// Renders the value as a short human-readable string
            pub fn simplify(&self) -> String {
                match self {
                    $(Self::$codec(v) => v.simplify(),)*
                    Self::Binary(raw) => format!("<{} bytes>", raw.len()),
                }
            }
        }
    };
}

codecs!(
    Text,
    Url,
    IdText,
    IdUrl,
    LangDescText,
    TermsOfUse,
    Pairs,
    Picture,
    IdBinary,
    Number,
    Popularimeter,
    Boolean,
    VolumeAdjustment,
    VolumeAdjustment2,
    Chapter,
    ChapterToc,
    EventTiming,
    SyncedLyrics,
    EncapsulatedObject,
    LinkedInfo,
    AudioEncryption,
    Registration,
    Ownership,
    PositionSync,
    BufferSize,
);

impl FrameValue {
    /// Builds a text value using the tag's default encoding
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text(Text {
            encoding: None,
            text: text.into(),
        })
    }

    /// Returns the text of a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(Text { text, .. }) => Some(text),
            _ => None,
        }
    }
}

fn read_language(r: &mut Reader<'_>) -> Result<String, Error> {
    r.read_fixed_string(3)
}

fn write_language(w: &mut Writer, language: &str) -> Result<(), Error> {
    w.write_fixed_string(language, 3)
}

/// Reads a big-endian unsigned integer of up to 8 bytes
fn read_counter(bytes: &[u8]) -> Result<u64, Error> {
    match bytes.len() {
        0 => Err(Error::UnexpectedEnd),
        1..=8 => Ok(bytes.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))),
        _ => Err(Error::ExcessiveValue),
    }
}

/// Writes a counter using at least 4 bytes
fn write_counter(w: &mut Writer, value: u64) -> Result<(), Error> {
    let needed = 8 - (value.leading_zeros() / 8) as usize;
    w.write_bytes(&value.to_be_bytes()[8 - needed.max(4)..])
}

/// Writes an integer using exactly `width` bytes
fn write_sized(w: &mut Writer, value: u64, width: usize) -> Result<(), Error> {
    match width {
        0 if value == 0 => Ok(()),
        1..=7 if value >> (width * 8) == 0 => w.write_bytes(&value.to_be_bytes()[8 - width..]),
        8 => w.write_bytes(&value.to_be_bytes()),
        _ => Err(Error::ExcessiveValue),
    }
}

/// Bytes needed to hold a value of the given bit width
fn bits_to_bytes(bits: u8) -> Result<usize, Error> {
    match usize::from(bits).div_ceil(8) {
        bytes @ 0..=8 => Ok(bytes),
        _ => Err(Error::ExcessiveValue),
    }
}

/// Text information frames
///
/// ID3v2.4 allows multiple values separated by NUL,
/// which are kept joined by `'\0'` in `text`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Text {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// The text itself
    pub text: String,
}

impl ValueCodec for Text {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            text: r.read_string_to_end(encoding)?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_string(encoding, &self.text, false)
    }

    fn simplify(&self) -> String {
        self.text.replace('\0', " / ")
    }
}

/// URL link frames
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Url {
    /// The URL, in ISO-8859-1
    pub url: String,
}

impl ValueCodec for Url {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            url: r.read_latin1()?,
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_string(Encoding::Latin1, &self.url, false)
    }

    fn simplify(&self) -> String {
        self.url.clone()
    }
}

/// User-defined text
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdText {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// Identifies this text among others
    pub description: String,
    /// The text itself
    pub text: String,
}

impl ValueCodec for IdText {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            description: r.read_string(encoding)?,
            text: r.read_string_to_end(encoding)?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_string(encoding, &self.description, true)?;
        w.write_string(encoding, &self.text, false)
    }

    fn simplify(&self) -> String {
        format!("{}: {}", self.description, self.text.replace('\0', " / "))
    }
}

/// User-defined URL link
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdUrl {
    /// The description's text encoding
    pub encoding: Option<Encoding>,
    /// Identifies this link among others
    pub description: String,
    /// The URL, in ISO-8859-1
    pub url: String,
}

impl ValueCodec for IdUrl {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            description: r.read_string(encoding)?,
            url: r.read_latin1()?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_string(encoding, &self.description, true)?;
        w.write_string(Encoding::Latin1, &self.url, false)
    }

    fn simplify(&self) -> String {
        format!("{}: {}", self.description, self.url)
    }
}

/// Text with a language and a content description
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LangDescText {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// ISO-639-2 language code
    pub language: String,
    /// Identifies this text among others
    pub description: String,
    /// The text itself
    pub text: String,
}

impl ValueCodec for LangDescText {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            language: read_language(r)?,
            description: r.read_string(encoding)?,
            text: r.read_string_to_end(encoding)?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        write_language(w, &self.language)?;
        w.write_string(encoding, &self.description, true)?;
        w.write_string(encoding, &self.text, false)
    }

    fn simplify(&self) -> String {
        match self.description.is_empty() {
            true => format!("[{}] {}", self.language, self.text),
            false => format!("[{}] {}: {}", self.language, self.description, self.text),
        }
    }
}

/// Terms of use
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TermsOfUse {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// ISO-639-2 language code
    pub language: String,
    /// The terms themselves
    pub text: String,
}

impl ValueCodec for TermsOfUse {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            language: read_language(r)?,
            text: r.read_string_to_end(encoding)?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        write_language(w, &self.language)?;
        w.write_string(encoding, &self.text, false)
    }

    fn simplify(&self) -> String {
        format!("[{}] {}", self.language, self.text)
    }
}

/// A list of (role, name) pairs
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pairs {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// The pairs, in order
    pub pairs: Vec<(String, String)>,
}

impl ValueCodec for Pairs {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        let mut pairs = Vec::new();
        while !r.is_empty() {
            let key = r.read_string(encoding)?;
            let value = match r.is_empty() {
                true => String::new(),
                false => r.read_string(encoding)?,
            };
            pairs.push((key, value));
        }
        Ok(Self {
            encoding: Some(encoding),
            pairs,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        self.pairs.iter().try_for_each(|(key, value)| {
            w.write_string(encoding, key, true)?;
            w.write_string(encoding, value, true)
        })
    }

    fn simplify(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Defined variants of picture type
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum PictureType {
    /// Other
    Other = 0,
    /// PNG file icon of 32x32 pixels
    Png32x32 = 1,
    /// General file icon
    GeneralFileIcon = 2,
    /// Front cover
    #[default]
    FrontCover = 3,
    /// Back cover
    BackCover = 4,
    /// Liner notes page
    LinerNotes = 5,
    /// Media label (e.g., CD, Vinyl or Cassette label)
    MediaLabel = 6,
    /// Lead artist, lead performer, or soloist
    LeadArtist = 7,
    /// Artist or performer
    Artist = 8,
    /// Conductor
    Conductor = 9,
    /// Band or orchestra
    Band = 10,
    /// Composer
    Composer = 11,
    /// Lyricist or text writer
    Lyricist = 12,
    /// Recording location
    RecordingLocation = 13,
    /// During recording
    DuringRecording = 14,
    /// During performance
    DuringPerformance = 15,
    /// Movie or video screen capture
    ScreenCapture = 16,
    /// A bright colored fish
    Fish = 17,
    /// Illustration
    Illustration = 18,
    /// Band or artist logotype
    BandLogo = 19,
    /// Publisher or studio logotype
    PublisherLogo = 20,
}

impl TryFrom<u8> for PictureType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Other),
            1 => Ok(Self::Png32x32),
            2 => Ok(Self::GeneralFileIcon),
            3 => Ok(Self::FrontCover),
            4 => Ok(Self::BackCover),
            5 => Ok(Self::LinerNotes),
            6 => Ok(Self::MediaLabel),
            7 => Ok(Self::LeadArtist),
            8 => Ok(Self::Artist),
            9 => Ok(Self::Conductor),
            10 => Ok(Self::Band),
            11 => Ok(Self::Composer),
            12 => Ok(Self::Lyricist),
            13 => Ok(Self::RecordingLocation),
            14 => Ok(Self::DuringRecording),
            15 => Ok(Self::DuringPerformance),
            16 => Ok(Self::ScreenCapture),
            17 => Ok(Self::Fish),
            18 => Ok(Self::Illustration),
            19 => Ok(Self::BandLogo),
            20 => Ok(Self::PublisherLogo),
            _ => Err(Error::InvalidPictureType),
        }
    }
}

impl std::fmt::Display for PictureType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Other => "other".fmt(f),
            Self::Png32x32 => "32x32 file icon".fmt(f),
            Self::GeneralFileIcon => "file icon".fmt(f),
            Self::FrontCover => "front cover".fmt(f),
            Self::BackCover => "back cover".fmt(f),
            Self::LinerNotes => "liner notes".fmt(f),
            Self::MediaLabel => "media label".fmt(f),
            Self::LeadArtist => "lead artist".fmt(f),
            Self::Artist => "artist".fmt(f),
            Self::Conductor => "conductor".fmt(f),
            Self::Band => "band".fmt(f),
            Self::Composer => "composer".fmt(f),
            Self::Lyricist => "lyricist".fmt(f),
            Self::RecordingLocation => "recording location".fmt(f),
            Self::DuringRecording => "during recording".fmt(f),
            Self::DuringPerformance => "during performance".fmt(f),
            Self::ScreenCapture => "screen capture".fmt(f),
            Self::Fish => "fish".fmt(f),
            Self::Illustration => "illustration".fmt(f),
            Self::BandLogo => "band logo".fmt(f),
            Self::PublisherLogo => "publisher logo".fmt(f),
        }
    }
}

/// An attached picture
///
/// ID3v2.2 stores a three character image format
/// rather than a MIME type; those are converted
/// to and from MIME types on the way through.
///
/// | v2.2 format | MIME type |
/// |-------------|-----------|
/// | `JPG` | `image/jpeg` |
/// | `PNG` | `image/png` |
/// | `-->` | `-->` (linked image) |
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Picture {
    /// The description's text encoding
    pub encoding: Option<Encoding>,
    /// The picture's MIME type
    pub mime_type: String,
    /// What the picture depicts
    pub picture_type: PictureType,
    /// A description of the picture
    pub description: String,
    /// The binary picture data
    pub data: Vec<u8>,
}

fn format_to_mime(format: &str) -> String {
    match format {
        "JPG" => "image/jpeg".to_owned(),
        "-->" => format.to_owned(),
        format => format!("image/{}", format.to_ascii_lowercase()),
    }
}

fn mime_to_format(mime_type: &str) -> String {
    match mime_type {
        "image/jpeg" | "image/jpg" => "JPG".to_owned(),
        "-->" => mime_type.to_owned(),
        mime_type => mime_type
            .strip_prefix("image/")
            .unwrap_or(mime_type)
            .to_ascii_uppercase(),
    }
}

impl ValueCodec for Picture {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            mime_type: match ctx.version {
                2 => format_to_mime(&r.read_fixed_string(3)?),
                _ => r.read_latin1()?,
            },
            picture_type: r.read_u8()?.try_into()?,
            description: r.read_string(encoding)?,
            data: r.read_rest().to_vec(),
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        match ctx.version {
            2 => w.write_fixed_string(&mime_to_format(&self.mime_type), 3)?,
            _ => w.write_latin1(&self.mime_type)?,
        }
        w.write_u8(self.picture_type as u8)?;
        w.write_string(encoding, &self.description, true)?;
        w.write_bytes(&self.data)
    }

    fn simplify(&self) -> String {
        format!(
            "{} ({}, {} bytes)",
            self.picture_type,
            self.mime_type,
            self.data.len()
        )
    }
}

/// Binary data identified by an owner
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdBinary {
    /// Owner identifier, usually a URL or email address
    pub owner: String,
    /// The owner's data
    pub data: Vec<u8>,
}

impl ValueCodec for IdBinary {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            owner: r.read_latin1()?,
            data: r.read_rest().to_vec(),
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.owner)?;
        w.write_bytes(&self.data)
    }

    fn simplify(&self) -> String {
        format!("{}: {} bytes", self.owner, self.data.len())
    }
}

/// A single counter
///
/// Written using at least 4 bytes,
/// and more if the value needs them.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Number {
    /// The counter's value
    pub value: u64,
}

impl ValueCodec for Number {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        read_counter(r.read_rest()).map(|value| Self { value })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        write_counter(w, self.value)
    }

    fn simplify(&self) -> String {
        self.value.to_string()
    }
}

/// A user's rating and play count
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Popularimeter {
    /// The rating user's email address
    pub email: String,
    /// Rating from 1 (worst) to 255 (best), or 0 for unknown
    pub rating: u8,
    /// Optional play counter
    pub counter: Option<u64>,
}

impl ValueCodec for Popularimeter {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            email: r.read_latin1()?,
            rating: r.read_u8()?,
            counter: match r.read_rest() {
                [] => None,
                counter => Some(read_counter(counter)?),
            },
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.email)?;
        w.write_u8(self.rating)?;
        match self.counter {
            Some(counter) => write_counter(w, counter),
            None => Ok(()),
        }
    }

    fn simplify(&self) -> String {
        match self.counter {
            Some(counter) => format!("{} {}/255 ({counter} plays)", self.email, self.rating),
            None => format!("{} {}/255", self.email, self.rating),
        }
    }
}

/// A flag stored as the text `"1"` or `"0"`
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Boolean {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// The flag itself
    pub value: bool,
}

impl ValueCodec for Boolean {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            value: r.read_string_to_end(encoding)?.trim() == "1",
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_string(encoding, if self.value { "1" } else { "0" }, false)
    }

    fn simplify(&self) -> String {
        self.value.to_string()
    }
}

/// One channel's relative volume change and peak
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChannelAdjustment {
    /// Signed relative volume change
    pub adjustment: i64,
    /// Peak volume
    pub peak: u64,
}

/// Relative volume adjustment as stored by ID3v2.2 and ID3v2.3
///
/// Channels are stored in the order
/// right, left, right back, left back, center, bass,
/// and a frame holds 2, 4, 5 or 6 of them.
///
/// | Bytes | Field |
/// |------:|-------|
/// | 1 | increment flags, one bit per channel |
/// | 1 | bits per volume field |
/// | n × 4 | right and left changes, then right and left peaks |
/// | n × 4 | right back and left back changes, then peaks (optional) |
/// | n × 2 | center change, then peak (optional) |
/// | n × 2 | bass change, then peak (optional) |
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeAdjustment {
    /// Bits used by each volume field
    pub bits: u8,
    /// Per-channel values
    pub channels: ArrayVec<ChannelAdjustment, 6>,
}

impl Default for VolumeAdjustment {
    fn default() -> Self {
        Self {
            bits: 16,
            channels: [ChannelAdjustment::default(); 2].into_iter().collect(),
        }
    }
}

/// Channel index ranges of each group of fields
const VOLUME_GROUPS: [std::ops::Range<usize>; 4] = [0..2, 2..4, 4..5, 5..6];

impl ValueCodec for VolumeAdjustment {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        let increments = r.read_u8()?;
        let bits = r.read_u8()?;
        let width = match bits_to_bytes(bits)? {
            0 => return Err(Error::ValueMismatch),
            width => width,
        };
        let mut channels = ArrayVec::new();

        for (group, range) in VOLUME_GROUPS.into_iter().enumerate() {
            if group > 0 && r.is_empty() {
                break;
            }
            let mut adjustments = ArrayVec::<i64, 2>::new();
            for channel in range {
                let magnitude = i64::try_from(read_counter(r.read_bytes(width)?)?)
                    .map_err(|_| Error::ExcessiveValue)?;
                adjustments.push(match increments & (1 << channel) {
                    0 => magnitude.checked_neg().ok_or(Error::ExcessiveValue)?,
                    _ => magnitude,
                });
            }
            for adjustment in adjustments {
                channels.push(ChannelAdjustment {
                    adjustment,
                    peak: read_counter(r.read_bytes(width)?)?,
                });
            }
        }

        Ok(Self { bits, channels })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        if !matches!(self.channels.len(), 2 | 4 | 5 | 6) {
            return Err(Error::ValueMismatch);
        }
        let width = match bits_to_bytes(self.bits)? {
            0 => return Err(Error::ValueMismatch),
            width => width,
        };

        w.write_u8(
            self.channels
                .iter()
                .enumerate()
                .filter(|(_, c)| c.adjustment >= 0)
                .fold(0, |flags, (i, _)| flags | (1 << i)),
        )?;
        w.write_u8(self.bits)?;

        for range in VOLUME_GROUPS {
            let Some(group) = self.channels.get(range) else {
                break;
            };
            for channel in group {
                write_sized(w, channel.adjustment.unsigned_abs(), width)?;
            }
            for channel in group {
                write_sized(w, channel.peak, width)?;
            }
        }
        Ok(())
    }

    fn simplify(&self) -> String {
        self.channels
            .iter()
            .map(|c| format!("{:+} (peak {})", c.adjustment, c.peak))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One channel of an ID3v2.4 volume adjustment
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rva2Channel {
    /// Channel type, where 1 is the master volume
    pub channel_type: u8,
    /// Volume change in units of 1/512 dB
    pub adjustment: i16,
    /// Bits used by the peak field
    pub peak_bits: u8,
    /// Peak volume
    pub peak: u64,
}

/// Relative volume adjustment as stored by ID3v2.4
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VolumeAdjustment2 {
    /// Identifies the situation this adjustment applies to
    pub identification: String,
    /// Per-channel values
    pub channels: Vec<Rva2Channel>,
}

impl ValueCodec for VolumeAdjustment2 {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        let identification = r.read_latin1()?;
        let mut channels = Vec::new();
        while !r.is_empty() {
            let channel_type = r.read_u8()?;
            let adjustment = r.read_i16()?;
            let peak_bits = r.read_u8()?;
            let peak = match bits_to_bytes(peak_bits)? {
                0 => 0,
                width => read_counter(r.read_bytes(width)?)?,
            };
            channels.push(Rva2Channel {
                channel_type,
                adjustment,
                peak_bits,
                peak,
            });
        }
        Ok(Self {
            identification,
            channels,
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.identification)?;
        self.channels.iter().try_for_each(|channel| {
            w.write_u8(channel.channel_type)?;
            w.write_i16(channel.adjustment)?;
            w.write_u8(channel.peak_bits)?;
            write_sized(w, channel.peak, bits_to_bytes(channel.peak_bits)?)
        })
    }

    fn simplify(&self) -> String {
        let channels = self
            .channels
            .iter()
            .map(|c| {
                format!(
                    "channel {}: {:+.2} dB",
                    c.channel_type,
                    f64::from(c.adjustment) / 512.0
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {channels}", self.identification)
    }
}

/// A chapter, with its own nested frames
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Chapter {
    /// Unique identifier for the chapter
    pub element_id: String,
    /// Start time in milliseconds
    pub start_time: u32,
    /// End time in milliseconds
    pub end_time: u32,
    /// Start offset in bytes, or `0xFFFFFFFF` if unused
    pub start_offset: u32,
    /// End offset in bytes, or `0xFFFFFFFF` if unused
    pub end_offset: u32,
    /// Frames describing the chapter, such as its title
    pub frames: Vec<Frame>,
}

impl ValueCodec for Chapter {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            element_id: r.read_latin1()?,
            start_time: r.read_u32()?,
            end_time: r.read_u32()?,
            start_offset: r.read_u32()?,
            end_offset: r.read_u32()?,
            frames: super::parse_frames(r.read_rest(), ctx),
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.element_id)?;
        w.write_u32(self.start_time)?;
        w.write_u32(self.end_time)?;
        w.write_u32(self.start_offset)?;
        w.write_u32(self.end_offset)?;
        w.write_bytes(&super::encode_frames(&self.frames, ctx)?)
    }

    fn simplify(&self) -> String {
        format!(
            "{} ({}-{} ms, {} frames)",
            self.element_id,
            self.start_time,
            self.end_time,
            self.frames.len()
        )
    }
}

/// A table of contents
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ChapterToc {
    /// Unique identifier for the table
    pub element_id: String,
    /// Whether this is the root of the table hierarchy
    pub top_level: bool,
    /// Whether the children are in playback order
    pub ordered: bool,
    /// Element IDs of the child chapters and tables
    pub children: Vec<String>,
    /// Frames describing the table, such as its title
    pub frames: Vec<Frame>,
}

impl ValueCodec for ChapterToc {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let element_id = r.read_latin1()?;
        let flags = r.read_flags()?;
        let count = r.read_u8()?;
        Ok(Self {
            element_id,
            top_level: flags[6],
            ordered: flags[7],
            children: (0..count)
                .map(|_| r.read_latin1())
                .collect::<Result<_, _>>()?,
            frames: super::parse_frames(r.read_rest(), ctx),
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.element_id)?;
        w.write_flags([
            false,
            false,
            false,
            false,
            false,
            false,
            self.top_level,
            self.ordered,
        ])?;
        w.write_u8(
            self.children
                .len()
                .try_into()
                .map_err(|_| Error::ExcessiveValue)?,
        )?;
        for child in &self.children {
            w.write_latin1(child)?;
        }
        w.write_bytes(&super::encode_frames(&self.frames, ctx)?)
    }

    fn simplify(&self) -> String {
        format!("{}: {}", self.element_id, self.children.join(", "))
    }
}

/// A single timed event
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Event {
    /// The event type, such as 0x03 for "start of song"
    pub event_type: u8,
    /// When the event occurs
    pub timestamp: u32,
}

/// Event timing codes
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventTiming {
    /// Timestamp units, 1 for MPEG frames or 2 for milliseconds
    pub format: u8,
    /// The events, in chronological order
    pub events: Vec<Event>,
}

impl ValueCodec for EventTiming {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        let format = r.read_u8()?;
        let mut events = Vec::new();
        while !r.is_empty() {
            events.push(Event {
                event_type: r.read_u8()?,
                timestamp: r.read_u32()?,
            });
        }
        Ok(Self { format, events })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_u8(self.format)?;
        self.events.iter().try_for_each(|event| {
            w.write_u8(event.event_type)?;
            w.write_u32(event.timestamp)
        })
    }

    fn simplify(&self) -> String {
        format!("{} events", self.events.len())
    }
}

/// A single synchronised line
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncedText {
    /// The line's text
    pub text: String,
    /// When the line begins
    pub timestamp: u32,
}

/// Synchronised lyrics or text
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SyncedLyrics {
    /// The text encoding
    pub encoding: Option<Encoding>,
    /// ISO-639-2 language code
    pub language: String,
    /// Timestamp units, 1 for MPEG frames or 2 for milliseconds
    pub format: u8,
    /// Content type, such as 1 for lyrics
    pub content_type: u8,
    /// Identifies this text among others
    pub description: String,
    /// The lines, in chronological order
    pub lines: Vec<SyncedText>,
}

impl ValueCodec for SyncedLyrics {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        let language = read_language(r)?;
        let format = r.read_u8()?;
        let content_type = r.read_u8()?;
        let description = r.read_string(encoding)?;
        let mut lines = Vec::new();
        while !r.is_empty() {
            lines.push(SyncedText {
                text: r.read_string(encoding)?,
                timestamp: r.read_u32()?,
            });
        }
        Ok(Self {
            encoding: Some(encoding),
            language,
            format,
            content_type,
            description,
            lines,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        write_language(w, &self.language)?;
        w.write_u8(self.format)?;
        w.write_u8(self.content_type)?;
        w.write_string(encoding, &self.description, true)?;
        self.lines.iter().try_for_each(|line| {
            w.write_string(encoding, &line.text, true)?;
            w.write_u32(line.timestamp)
        })
    }

    fn simplify(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// An arbitrary embedded file
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EncapsulatedObject {
    /// The text encoding of the file name and description
    pub encoding: Option<Encoding>,
    /// The object's MIME type
    pub mime_type: String,
    /// The object's file name
    pub filename: String,
    /// Identifies this object among others
    pub description: String,
    /// The object itself
    pub data: Vec<u8>,
}

impl ValueCodec for EncapsulatedObject {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            mime_type: r.read_latin1()?,
            filename: r.read_string(encoding)?,
            description: r.read_string(encoding)?,
            data: r.read_rest().to_vec(),
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_latin1(&self.mime_type)?;
        w.write_string(encoding, &self.filename, true)?;
        w.write_string(encoding, &self.description, true)?;
        w.write_bytes(&self.data)
    }

    fn simplify(&self) -> String {
        format!(
            "{} ({}, {} bytes)",
            self.filename,
            self.mime_type,
            self.data.len()
        )
    }
}

/// A pointer to a frame stored elsewhere
///
/// The linked frame ID is 3 bytes in ID3v2.2 and 4 bytes afterward.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkedInfo {
    /// The ID of the linked frame
    pub frame_id: String,
    /// Where the linked frame can be found
    pub url: String,
    /// Additional data identifying the linked frame
    pub additional: Vec<String>,
}

impl ValueCodec for LinkedInfo {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let frame_id = r.read_fixed_string(if ctx.version == 2 { 3 } else { 4 })?;
        let url = r.read_latin1()?;
        let mut additional = Vec::new();
        while !r.is_empty() {
            additional.push(r.read_latin1()?);
        }
        Ok(Self {
            frame_id,
            url,
            additional,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        w.write_fixed_string(&self.frame_id, if ctx.version == 2 { 3 } else { 4 })?;
        w.write_latin1(&self.url)?;
        self.additional
            .iter()
            .try_for_each(|additional| w.write_latin1(additional))
    }

    fn simplify(&self) -> String {
        format!("{} -> {}", self.frame_id, self.url)
    }
}

/// Audio encryption information
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AudioEncryption {
    /// Owner identifier
    pub owner: String,
    /// First unencrypted frame of the preview
    pub preview_start: u16,
    /// Number of unencrypted frames in the preview
    pub preview_length: u16,
    /// Data needed for decryption
    pub data: Vec<u8>,
}

impl ValueCodec for AudioEncryption {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            owner: r.read_latin1()?,
            preview_start: r.read_u16()?,
            preview_length: r.read_u16()?,
            data: r.read_rest().to_vec(),
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.owner)?;
        w.write_u16(self.preview_start)?;
        w.write_u16(self.preview_length)?;
        w.write_bytes(&self.data)
    }

    fn simplify(&self) -> String {
        self.owner.clone()
    }
}

/// An encryption method or group registration
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registration {
    /// Owner identifier
    pub owner: String,
    /// The method or group symbol used by frames
    pub symbol: u8,
    /// Method- or group-specific data
    pub data: Vec<u8>,
}

impl ValueCodec for Registration {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            owner: r.read_latin1()?,
            symbol: r.read_u8()?,
            data: r.read_rest().to_vec(),
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_latin1(&self.owner)?;
        w.write_u8(self.symbol)?;
        w.write_bytes(&self.data)
    }

    fn simplify(&self) -> String {
        format!("{:#04x}: {}", self.symbol, self.owner)
    }
}

/// Ownership information
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Ownership {
    /// The seller's text encoding
    pub encoding: Option<Encoding>,
    /// Currency code followed by the price paid
    pub price: String,
    /// Date of purchase as `YYYYMMDD`
    pub date: String,
    /// Name of the seller
    pub seller: String,
}

impl ValueCodec for Ownership {
    fn parse(r: &mut Reader<'_>, ctx: &ParseContext<'_>) -> Result<Self, Error> {
        let encoding = r.read_encoding(ctx.version)?;
        Ok(Self {
            encoding: Some(encoding),
            price: r.read_latin1()?,
            date: r.read_fixed_string(8)?,
            seller: r.read_string_to_end(encoding)?,
        })
    }

    fn write(&self, w: &mut Writer, ctx: &WriteContext<'_>) -> Result<(), Error> {
        let encoding = ctx.encoding(self.encoding);
        w.write_encoding(encoding)?;
        w.write_latin1(&self.price)?;
        w.write_fixed_string(&self.date, 8)?;
        w.write_string(encoding, &self.seller, false)
    }

    fn simplify(&self) -> String {
        format!("{} from {} on {}", self.price, self.seller, self.date)
    }
}

/// Position synchronisation
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PositionSync {
    /// Position units, 1 for MPEG frames or 2 for milliseconds
    pub format: u8,
    /// Position in the audio stream
    pub position: u32,
}

impl ValueCodec for PositionSync {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            format: r.read_u8()?,
            position: r.read_u32()?,
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_u8(self.format)?;
        w.write_u32(self.position)
    }

    fn simplify(&self) -> String {
        self.position.to_string()
    }
}

/// Recommended buffer size
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BufferSize {
    /// Buffer size in bytes, up to 24 bits
    pub size: u32,
    /// Whether tags may be embedded later in the stream
    pub embedded: bool,
    /// Offset to the next tag, if any
    pub offset: Option<u32>,
}

impl ValueCodec for BufferSize {
    fn parse(r: &mut Reader<'_>, _: &ParseContext<'_>) -> Result<Self, Error> {
        Ok(Self {
            size: r.read_u24()?,
            embedded: r.read_flags()?[7],
            offset: match r.is_empty() {
                true => None,
                false => Some(r.read_u32()?),
            },
        })
    }

    fn write(&self, w: &mut Writer, _: &WriteContext<'_>) -> Result<(), Error> {
        w.write_u24(self.size)?;
        w.write_u8(u8::from(self.embedded))?;
        match self.offset {
            Some(offset) => w.write_u32(offset),
            None => Ok(()),
        }
    }

    fn simplify(&self) -> String {
        format!("{} bytes", self.size)
    }
}
