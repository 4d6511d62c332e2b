// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For reading and writing tags in whole files and streams
//!
//! Everything here is asynchronous,
//! pulling bytes through a [`ByteStream`] and
//! pushing them through a [`ByteSink`] only as needed.

use crate::Error;
use crate::id3v1::Id3v1;
use crate::id3v2::registry::Registry;
use crate::id3v2::{TAG_MARKER, Tag, TagHeader};
use crate::mpeg::{AudioSummary, Chain, LOOKAHEAD, MpegFrame, find_candidates, select_frames};
use crate::stream::{ByteSink, ByteStream, DEFAULT_CHUNK_SIZE};
use bitstream_io::{BigEndian, BitRead, BitReader};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

pub use crate::id3v2::WriteOptions;
pub use crate::mpeg::ScanOptions;

/// Reads the first valid ID3v2 tag in a stream
///
/// Everything before the tag is discarded and the stream
/// is left positioned just past the tag.
/// Markers whose headers turn out to be invalid are skipped
/// and the search continues after them.
/// Returns `Ok(None)` if the stream ends without a valid tag,
/// in which case the stream is exhausted.
///
/// # Errors
///
/// Passes along any I/O error from the stream.
///
/// # Example
/// ```
/// use id3_codec::file::read_tag;
/// use id3_codec::id3v2::{Frame, Tag, WriteOptions, registry::Registry};
/// use id3_codec::stream::ByteStream;
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let registry = Registry::new();
///
/// let mut tag = Tag::new(3);
/// tag.frames.push(Frame::text("TALB", "Album"));
///
/// // some junk ahead of the tag
/// let mut data = b"junk".to_vec();
/// data.extend(tag.to_bytes(3, &WriteOptions::default(), &registry).unwrap());
///
/// let mut stream = ByteStream::new(data.as_slice());
/// let tag = read_tag(&mut stream, &registry).await.unwrap().unwrap();
/// assert_eq!(tag.offset, 4);
/// assert_eq!(tag.text("TALB"), Some("Album"));
/// assert_eq!(stream.position(), tag.end());
/// # });
/// # }
/// ```
pub async fn read_tag<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
    registry: &Registry,
) -> Result<Option<Tag>, Error> {
    loop {
        let Some(offset) = stream.scan(&TAG_MARKER).await? else {
            return Ok(None);
        };

        let mut header_bytes = stream.read(TagHeader::SIZE).await?;
        let parsed = BitReader::endian(header_bytes.as_slice(), BigEndian).parse::<TagHeader>();
        let header = match parsed {
            Ok(header) => header,
            Err(err) => {
                log::warn!("skipping ID3v2 marker at {offset}: {err}");
                header_bytes.remove(0);
                stream.unshift(header_bytes);
                continue;
            }
        };

        let body = stream.read(header.size as usize).await?;
        if body.len() < header.size as usize {
            log::warn!(
                "ID3v2 tag at {offset} truncated to {} of {} bytes",
                body.len(),
                header.size
            );
        }

        match Tag::from_body(header, &body, registry) {
            Ok(mut tag) => {
                if header.flags.footer {
                    stream.skip(TagHeader::SIZE as u64).await?;
                }
                tag.offset = offset;
                return Ok(Some(tag));
            }
            Err(err) => {
                log::warn!("skipping ID3v2 tag at {offset}: {err}");
                header_bytes.remove(0);
                stream.unshift(body);
                stream.unshift(header_bytes);
            }
        }
    }
}

/// Writes a tag as the given version
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if the tag can't be encoded
/// or on any I/O error from the sink.
pub async fn write_tag<W: AsyncWrite + Unpin>(
    sink: &mut ByteSink<W>,
    tag: &Tag,
    version: u8,
    options: &WriteOptions,
    registry: &Registry,
) -> Result<u64, Error> {
    let bytes = tag.to_bytes(version, options, registry)?;
    sink.write(&bytes).await?;
    Ok(bytes.len() as u64)
}

/// The result of scanning a stream for audio frames
#[derive(Clone, Debug, PartialEq)]
pub struct AudioScan {
    /// The likeliest sequence of real frames
    pub frames: Vec<MpegFrame>,
    /// The chain which seeded the sequence
    pub chain: Option<Chain>,
    /// Number of plausible frame headers found
    pub candidates: usize,
    /// Stream properties derived from the frames
    pub summary: Option<AudioSummary>,
}

/// Scans the rest of a stream for MPEG audio frames
///
/// # Errors
///
/// Passes along any I/O error from the stream.
pub async fn scan_audio<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
    options: &ScanOptions,
) -> Result<AudioScan, Error> {
    let mut window: Vec<u8> = Vec::new();
    let mut base = stream.position();
    let mut candidates = Vec::new();

    loop {
        let chunk = stream.read(DEFAULT_CHUNK_SIZE).await?;
        let finished = chunk.is_empty();
        window.extend_from_slice(&chunk);

        // keep enough bytes to examine candidates near the end
        let limit = match finished {
            true => window.len(),
            false => window.len().saturating_sub(LOOKAHEAD),
        };
        candidates.extend(find_candidates(&window, base, limit));

        if finished {
            break;
        }
        window.drain(..limit);
        base += limit as u64;
    }

    let (chain, frames) = match select_frames(&candidates, options) {
        Some((chain, frames)) => (Some(chain), frames),
        None => (None, Vec::new()),
    };
    log::debug!(
        "{} of {} candidates selected as audio frames",
        frames.len(),
        candidates.len()
    );

    Ok(AudioScan {
        summary: AudioSummary::from_chain(&frames),
        frames,
        chain,
        candidates: candidates.len(),
    })
}

/// Which kind of tag to remove
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TagKind {
    /// The 128 byte trailer
    Id3v1,
    /// A tag at the start of the file
    Id3v2,
}

/// Reads a tag header from the start of a stream
///
/// If there's no valid header, the bytes are returned to the stream.
async fn read_leading_header<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
) -> Result<Option<TagHeader>, Error> {
    let bytes = stream.read(TagHeader::SIZE).await?;
    let parsed = BitReader::endian(bytes.as_slice(), BigEndian).parse::<TagHeader>();
    match parsed {
        Ok(header) => Ok(Some(header)),
        Err(_) => {
            stream.unshift(bytes);
            Ok(None)
        }
    }
}

/// Builds a sibling path by appending a suffix to the file name
fn sibling(path: &Path, suffix: &str) -> std::io::Result<PathBuf> {
    let mut name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"))?
        .to_owned();
    name.push(suffix);
    Ok(path.with_file_name(name))
}

/// Replaces a file's contents with a prefix and the rest of a stream
///
/// The new contents are written to a temporary sibling
/// which replaces the original once complete.
async fn rewrite<R: AsyncRead + Unpin>(
    path: &Path,
    prefix: &[u8],
    rest: &mut ByteStream<R>,
    keep_backup: bool,
) -> Result<(), Error> {
    let temp = sibling(path, ".id3tmp")?;

    let mut sink = ByteSink::create(&temp).await?;
    let copied = async move {
        sink.write(prefix).await?;
        sink.pipe(rest).await?;
        sink.finish().await
    }
    .await;
    if let Err(err) = copied {
        // best effort, the copy error matters more
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(err.into());
    }

    if keep_backup {
        tokio::fs::rename(path, sibling(path, ".bak")?).await?;
    }
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}

/// Removes a tag from a file
///
/// Returns `true` if a tag was removed, or `false` if none was found.
///
/// # Errors
///
/// Passes along any I/O error from reading or rewriting the file.
pub async fn remove_tag<P: AsRef<Path>>(path: P, kind: TagKind) -> Result<bool, Error> {
    let path = path.as_ref();
    match kind {
        TagKind::Id3v1 => {
            let mut file = tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .await?;
            match find_id3v1(&mut file).await? {
                Some((offset, _)) => {
                    file.set_len(offset).await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        TagKind::Id3v2 => {
            let mut stream = ByteStream::open(path).await?;
            let Some(header) = read_leading_header(&mut stream).await? else {
                return Ok(false);
            };
            stream.skip(header.total_size() - TagHeader::SIZE as u64).await?;
            rewrite(path, &[], &mut stream, false).await?;
            Ok(true)
        }
    }
}

/// Locates and parses the ID3v1 trailer of an open file
async fn find_id3v1(file: &mut tokio::fs::File) -> Result<Option<(u64, Id3v1)>, Error> {
    let len = file.metadata().await?.len();
    let Some(offset) = len.checked_sub(Id3v1::SIZE as u64) else {
        return Ok(None);
    };

    file.seek(std::io::SeekFrom::Start(offset)).await?;
    let mut bytes = [0; Id3v1::SIZE];
    file.read_exact(&mut bytes).await?;

    match Id3v1::parse(&bytes) {
        Ok(tag) => Ok(Some((offset, tag))),
        Err(Error::InvalidId3v1) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Reads a file's ID3v1 trailer, if any
pub async fn read_id3v1<P: AsRef<Path>>(path: P) -> Result<Option<Id3v1>, Error> {
    let mut file = tokio::fs::File::open(path).await?;
    Ok(find_id3v1(&mut file).await?.map(|(_, tag)| tag))
}

/// Writes a file's ID3v1 trailer, replacing any existing one
pub async fn write_id3v1<P: AsRef<Path>>(path: P, tag: &Id3v1) -> Result<(), Error> {
    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .await?;
    let offset = match find_id3v1(&mut file).await? {
        Some((offset, _)) => offset,
        None => file.metadata().await?.len(),
    };
    file.seek(std::io::SeekFrom::Start(offset)).await?;
    file.write_all(&tag.to_bytes()?).await?;
    file.flush().await?;
    Ok(())
}

/// Writes a tag to the start of a file in place
///
/// Any existing ID3v2 tag at the start of the file is replaced.
/// If the options ask to keep a backup,
/// the original file is renamed with a `.bak` suffix.
///
/// # Errors
///
/// Returns an error if the tag can't be encoded
/// or on any I/O error.
pub async fn write_to_path<P: AsRef<Path>>(
    path: P,
    tag: &Tag,
    version: u8,
    options: &WriteOptions,
    registry: &Registry,
) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = tag.to_bytes(version, options, registry)?;

    let mut stream = ByteStream::open(path).await?;
    if let Some(header) = read_leading_header(&mut stream).await? {
        stream.skip(header.total_size() - TagHeader::SIZE as u64).await?;
    }
    let result = rewrite(path, &bytes, &mut stream, options.keeps_backup()).await;
    stream.close();
    result
}

/// Which parts of a file [`read_mp3`] collects
#[derive(Clone, Debug)]
pub struct ReadOptions {
    id3v2: bool,
    mpeg: bool,
    id3v1: bool,
    scan: ScanOptions,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            id3v2: true,
            mpeg: true,
            id3v1: true,
            scan: ScanOptions::default(),
        }
    }
}

impl ReadOptions {
    /// Whether to read the ID3v2 tag
    pub fn id3v2(self, id3v2: bool) -> Self {
        Self { id3v2, ..self }
    }

    /// Whether to scan for audio frames
    pub fn mpeg(self, mpeg: bool) -> Self {
        Self { mpeg, ..self }
    }

    /// Whether to read the ID3v1 trailer
    pub fn id3v1(self, id3v1: bool) -> Self {
        Self { id3v1, ..self }
    }

    /// Options for the audio frame scan
    pub fn scan(self, scan: ScanOptions) -> Self {
        Self { scan, ..self }
    }
}

/// Everything found in an MPEG audio file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mp3 {
    /// The file's ID3v2 tag
    pub id3v2: Option<Tag>,
    /// The file's audio frames
    pub audio: Option<AudioScan>,
    /// The file's ID3v1 trailer
    pub id3v1: Option<Id3v1>,
}

/// Reads the tags and audio frames of a file
///
/// The audio scan begins just past an ID3v2 tag at the very
/// start of the file, or at the start of the file otherwise.
///
/// # Errors
///
/// Passes along any I/O error.
pub async fn read_mp3<P: AsRef<Path>>(
    path: P,
    registry: &Registry,
    options: &ReadOptions,
) -> Result<Mp3, Error> {
    let path = path.as_ref();
    let mut mp3 = Mp3::default();

    let mut stream = ByteStream::open(path).await?;
    if options.id3v2 {
        mp3.id3v2 = read_tag(&mut stream, registry).await?;
    }

    if options.mpeg {
        let leading = matches!(&mp3.id3v2, Some(tag) if tag.offset == 0);
        if !leading {
            stream = ByteStream::open(path).await?;
        }
        mp3.audio = Some(scan_audio(&mut stream, &options.scan).await?);
    }

    if options.id3v1 {
        mp3.id3v1 = read_id3v1(path).await?;
    }

    Ok(mp3)
}
