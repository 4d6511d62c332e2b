// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling ID3v1 and ID3v1.1 tags
//!
//! An ID3v1 tag occupies the final 128 bytes of a file:
//!
//! | Bytes | Field |
//! |------:|-------|
//! | 3 | `"TAG"` |
//! | 30 | title |
//! | 30 | artist |
//! | 30 | album |
//! | 4 | year |
//! | 30 | comment |
//! | 1 | genre |
//!
//! ID3v1.1 shortens the comment to 28 bytes,
//! followed by a `0x00` byte and a track number.
//!
//! Text fields are ISO-8859-1, padded with NUL bytes or spaces.

use crate::Error;
use crate::binary::Encoding;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, ToBitStream};

/// The marker at the start of an ID3v1 tag
pub const MARKER: [u8; 3] = *b"TAG";

/// An ID3v1 or ID3v1.1 tag
///
/// # Example
/// ```
/// use id3_codec::id3v1::Id3v1;
///
/// let tag = Id3v1 {
///     title: "Title".to_owned(),
///     artist: "Artist".to_owned(),
///     track: Some(3),
///     genre: 17,
///     ..Id3v1::default()
/// };
///
/// let bytes = tag.to_bytes().unwrap();
/// assert_eq!(bytes.len(), Id3v1::SIZE);
/// assert_eq!(&bytes[..3], b"TAG");
///
/// let parsed = Id3v1::parse(&bytes).unwrap();
/// assert_eq!(parsed, tag);
/// assert_eq!(parsed.genre_name(), Some("Rock"));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Id3v1 {
    /// Up to 30 characters
    pub title: String,
    /// Up to 30 characters
    pub artist: String,
    /// Up to 30 characters
    pub album: String,
    /// Up to 4 characters
    pub year: String,
    /// Up to 30 characters, or 28 if a track number is present
    pub comment: String,
    /// Track number, making this an ID3v1.1 tag
    pub track: Option<u8>,
    /// Index into the genre list, 255 for none
    pub genre: u8,
}

impl Id3v1 {
    /// Size of the tag in bytes
    pub const SIZE: usize = 128;

    /// Parses a tag from exactly 128 bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId3v1`] if the bytes
    /// are the wrong length or lack the `"TAG"` marker.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        match bytes.len() {
            Self::SIZE => BitReader::endian(bytes, BigEndian).parse(),
            _ => Err(Error::InvalidId3v1),
        }
    }

    /// Encodes the tag as 128 bytes
    ///
    /// Fields too long for their slots are truncated.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        BitWriter::endian(&mut bytes, BigEndian).build(self)?;
        Ok(bytes)
    }

    /// The genre's name, if its index is a known one
    pub fn genre_name(&self) -> Option<&'static str> {
        GENRES.get(usize::from(self.genre)).copied()
    }
}

fn read_field<const N: usize, R: BitRead + ?Sized>(r: &mut R) -> Result<String, Error> {
    let bytes = r.read_to::<[u8; N]>()?;
    Ok(decode_field(&bytes))
}

fn decode_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Encoding::Latin1
        .decode(&bytes[..end])
        .trim_end_matches(' ')
        .to_owned()
}

fn write_field<const N: usize, W: BitWrite + ?Sized>(w: &mut W, text: &str) -> Result<(), Error> {
    let mut field = [0; N];
    let encoded = Encoding::Latin1.encode(text);
    let len = encoded.len().min(N);
    field[..len].copy_from_slice(&encoded[..len]);
    w.write_bytes(&field).map_err(Error::Io)
}

impl FromBitStream for Id3v1 {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        if r.read_to::<[u8; 3]>()? != MARKER {
            return Err(Error::InvalidId3v1);
        }

        let title = read_field::<30, _>(r)?;
        let artist = read_field::<30, _>(r)?;
        let album = read_field::<30, _>(r)?;
        let year = read_field::<4, _>(r)?;
        let comment = r.read_to::<[u8; 30]>()?;
        let genre = r.read_to::<u8>()?;

        // a zero byte followed by a non-zero byte ends a v1.1 comment
        let (comment, track) = match comment[28..] {
            [0, track] if track != 0 => (decode_field(&comment[..28]), Some(track)),
            _ => (decode_field(&comment), None),
        };

        Ok(Self {
            title,
            artist,
            album,
            year,
            comment,
            track,
            genre,
        })
    }
}

impl ToBitStream for Id3v1 {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bytes(&MARKER)?;
        write_field::<30, _>(w, &self.title)?;
        write_field::<30, _>(w, &self.artist)?;
        write_field::<30, _>(w, &self.album)?;
        write_field::<4, _>(w, &self.year)?;
        match self.track {
            Some(track) => {
                write_field::<28, _>(w, &self.comment)?;
                w.write_from::<u8>(0)?;
                w.write_from(track)?;
            }
            None => write_field::<30, _>(w, &self.comment)?,
        }
        w.write_from(self.genre)?;
        Ok(())
    }
}

/// Genre names, indexed by their ID3v1 genre byte
///
/// Indexes 0 to 79 are the original list,
/// and the rest are the common Winamp extensions.
pub static GENRES: &[&str] = &[
    "Blues",
    "Classic Rock",
    "Country",
    "Dance",
    "Disco",
    "Funk",
    "Grunge",
    "Hip-Hop",
    "Jazz",
    "Metal",
    "New Age",
    "Oldies",
    "Other",
    "Pop",
    "R&B",
    "Rap",
    "Reggae",
    "Rock",
    "Techno",
    "Industrial",
    "Alternative",
    "Ska",
    "Death Metal",
    "Pranks",
    "Soundtrack",
    "Euro-Techno",
    "Ambient",
    "Trip-Hop",
    "Vocal",
    "Jazz+Funk",
    "Fusion",
    "Trance",
    "Classical",
    "Instrumental",
    "Acid",
    "House",
    "Game",
    "Sound Clip",
    "Gospel",
    "Noise",
    "AlternRock",
    "Bass",
    "Soul",
    "Punk",
    "Space",
    "Meditative",
    "Instrumental Pop",
    "Instrumental Rock",
    "Ethnic",
    "Gothic",
    "Darkwave",
    "Techno-Industrial",
    "Electronic",
    "Pop-Folk",
    "Eurodance",
    "Dream",
    "Southern Rock",
    "Comedy",
    "Cult",
    "Gangsta",
    "Top 40",
    "Christian Rap",
    "Pop/Funk",
    "Jungle",
    "Native American",
    "Cabaret",
    "New Wave",
    "Psychadelic",
    "Rave",
    "Showtunes",
    "Trailer",
    "Lo-Fi",
    "Tribal",
    "Acid Punk",
    "Acid Jazz",
    "Polka",
    "Retro",
    "Musical",
    "Rock & Roll",
    "Hard Rock",
    "Folk",
    "Folk-Rock",
    "National Folk",
    "Swing",
    "Fast Fusion",
    "Bebob",
    "Latin",
    "Revival",
    "Celtic",
    "Bluegrass",
    "Avantgarde",
    "Gothic Rock",
    "Progressive Rock",
    "Psychedelic Rock",
    "Symphonic Rock",
    "Slow Rock",
    "Big Band",
    "Chorus",
    "Easy Listening",
    "Acoustic",
    "Humour",
    "Speech",
    "Chanson",
    "Opera",
    "Chamber Music",
    "Sonata",
    "Symphony",
    "Booty Bass",
    "Primus",
    "Porn Groove",
    "Satire",
    "Slow Jam",
    "Club",
    "Tango",
    "Samba",
    "Folklore",
    "Ballad",
    "Power Ballad",
    "Rhythmic Soul",
    "Freestyle",
    "Duet",
    "Punk Rock",
    "Drum Solo",
    "A capella",
    "Euro-House",
    "Dance Hall",
    "Goa",
    "Drum & Bass",
    "Club-House",
    "Hardcore",
    "Terror",
    "Indie",
    "BritPop",
    "Negerpunk",
    "Polsk Punk",
    "Beat",
    "Christian Gangsta Rap",
    "Heavy Metal",
    "Black Metal",
    "Crossover",
    "Contemporary Christian",
    "Christian Rock",
    "Merengue",
    "Salsa",
    "Thrash Metal",
    "Anime",
    "JPop",
    "Synthpop",
];
