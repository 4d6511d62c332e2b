// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For locating MPEG audio frames
//!
//! Every MPEG audio frame starts with a 4 byte header:
//!
//! | Bits | Field |
//! |-----:|-------|
//! | 11 | sync (all 1s) |
//! | 2 | version (`00` = 2.5, `01` reserved, `10` = 2, `11` = 1) |
//! | 2 | layer (`00` reserved, `01` = III, `10` = II, `11` = I) |
//! | 1 | protection (0 = CRC follows the header) |
//! | 4 | bit rate index |
//! | 2 | sample rate index |
//! | 1 | padding |
//! | 1 | private |
//! | 2 | channel mode |
//! | 2 | mode extension |
//! | 1 | copyright |
//! | 1 | original |
//! | 2 | emphasis |
//!
//! Because the sync pattern is short, stray bytes in a file
//! often look like headers.
//! The real frames are the ones which chain together,
//! each frame ending exactly where the next one begins.

use crate::Error;
use crate::binary::Reader;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, FromBitStream, ToBitStream};
use std::time::Duration;

/// Maximum number of chain starts tried by [`best_chain`]
pub const MAX_SEEDS: usize = 50;

/// The MPEG audio version
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MpegVersion {
    /// MPEG-1
    Mpeg1,
    /// MPEG-2
    Mpeg2,
    /// The unofficial MPEG-2.5 extension
    Mpeg25,
}

impl std::fmt::Display for MpegVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Mpeg1 => "MPEG-1".fmt(f),
            Self::Mpeg2 => "MPEG-2".fmt(f),
            Self::Mpeg25 => "MPEG-2.5".fmt(f),
        }
    }
}

/// The MPEG audio layer
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Layer {
    /// Layer I
    Layer1,
    /// Layer II
    Layer2,
    /// Layer III
    Layer3,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Layer1 => "Layer I".fmt(f),
            Self::Layer2 => "Layer II".fmt(f),
            Self::Layer3 => "Layer III".fmt(f),
        }
    }
}

/// The frame's channel assignment
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelMode {
    /// Two independent channels
    Stereo,
    /// Two channels sharing some information
    JointStereo,
    /// Two unrelated mono channels
    DualChannel,
    /// A single channel
    Mono,
}

/// De-emphasis to apply on playback
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Emphasis {
    /// No emphasis
    #[default]
    None,
    /// 50/15 µs
    Ms5015,
    /// CCITT J.17
    CcittJ17,
}

macro_rules! bit_rates {
    ($($name:ident = [$($kbps:literal),*];)+) => {
        $(const $name: [u32; 14] = [$($kbps),*];)+
    };
}

bit_rates! {
    V1_L1 = [32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448];
    V1_L2 = [32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384];
    V1_L3 = [32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
    V2_L1 = [32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256];
    V2_L23 = [8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];
}

/// A decoded MPEG audio frame header
///
/// Bit rate and sample rate are stored as their table indexes,
/// which are always valid for a parsed header.
///
/// # Example
/// ```
/// use id3_codec::mpeg::{FrameHeader, Layer, MpegVersion};
///
/// // MPEG-1 Layer III, 128 kbps, 44100 Hz, joint stereo
/// let header = FrameHeader::parse(&[0xFF, 0xFB, 0x90, 0x64]).unwrap();
/// assert_eq!(header.version, MpegVersion::Mpeg1);
/// assert_eq!(header.layer, Layer::Layer3);
/// assert_eq!(header.bit_rate(), 128);
/// assert_eq!(header.sample_rate(), 44100);
/// assert_eq!(header.size(), 417);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// MPEG version
    pub version: MpegVersion,
    /// MPEG layer
    pub layer: Layer,
    /// Whether a 16-bit CRC follows the header
    pub protected: bool,
    /// Bit rate table index, from 1 to 14
    pub bit_rate_index: u8,
    /// Sample rate table index, from 0 to 2
    pub sample_rate_index: u8,
    /// Whether the frame carries an extra slot
    pub padding: bool,
    /// Application-specific bit
    pub private: bool,
    /// Channel assignment
    pub channel_mode: ChannelMode,
    /// Joint stereo mode extension
    pub mode_extension: u8,
    /// Whether the audio is copyrighted
    pub copyright: bool,
    /// Whether this is an original copy
    pub original: bool,
    /// De-emphasis to apply
    pub emphasis: Emphasis,
}

impl FrameHeader {
    /// Size of the header in bytes
    pub const SIZE: usize = 4;

    /// Parses a header from the start of some bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes lack a sync pattern
    /// or any field holds a reserved or invalid value.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        BitReader::endian(bytes, BigEndian).parse()
    }

    /// Whether a byte pair could begin a frame header
    #[inline]
    pub fn is_sync(first: u8, second: u8) -> bool {
        first == 0xFF && second & 0xE0 == 0xE0
    }

    /// Bit rate in kilobits per second
    pub fn bit_rate(&self) -> u32 {
        let table = match (self.version, self.layer) {
            (MpegVersion::Mpeg1, Layer::Layer1) => &V1_L1,
            (MpegVersion::Mpeg1, Layer::Layer2) => &V1_L2,
            (MpegVersion::Mpeg1, Layer::Layer3) => &V1_L3,
            (_, Layer::Layer1) => &V2_L1,
            (_, Layer::Layer2 | Layer::Layer3) => &V2_L23,
        };
        table[usize::from(self.bit_rate_index.clamp(1, 14) - 1)]
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        let rates = match self.version {
            MpegVersion::Mpeg1 => [44100, 48000, 32000],
            MpegVersion::Mpeg2 => [22050, 24000, 16000],
            MpegVersion::Mpeg25 => [11025, 12000, 8000],
        };
        rates[usize::from(self.sample_rate_index.min(2))]
    }

    /// Number of channels
    pub fn channels(&self) -> u8 {
        match self.channel_mode {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }

    /// PCM samples per channel encoded by the frame
    pub fn samples_per_frame(&self) -> u32 {
        match (self.version, self.layer) {
            (_, Layer::Layer1) => 384,
            (_, Layer::Layer2) | (MpegVersion::Mpeg1, Layer::Layer3) => 1152,
            (_, Layer::Layer3) => 576,
        }
    }

    /// Size of a padding slot in bytes
    pub fn slot_size(&self) -> u32 {
        match self.layer {
            Layer::Layer1 => 4,
            _ => 1,
        }
    }

    /// Total frame size in bytes, including the header
    pub fn size(&self) -> u32 {
        let base = self.samples_per_frame() / 8 * self.bit_rate() * 1000 / self.sample_rate();
        match self.padding {
            true => base + self.slot_size(),
            false => base,
        }
    }

    /// Size of the Layer III side information
    /// which follows the header (and CRC, if any)
    ///
    /// Zero for other layers.
    pub fn side_info_len(&self) -> usize {
        match (self.layer, self.version, self.channel_mode) {
            (Layer::Layer3, MpegVersion::Mpeg1, ChannelMode::Mono) => 17,
            (Layer::Layer3, MpegVersion::Mpeg1, _) => 32,
            (Layer::Layer3, _, ChannelMode::Mono) => 9,
            (Layer::Layer3, _, _) => 17,
            _ => 0,
        }
    }

    /// Duration of the audio in a single frame
    pub fn duration(&self) -> Duration {
        frames_duration(1, self.samples_per_frame(), self.sample_rate())
    }

    /// Whether two headers share the same version and layer
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.version == other.version && self.layer == other.layer
    }
}

impl FromBitStream for FrameHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        if r.read::<11, u16>()? != 0x7FF {
            return Err(Error::InvalidSyncCode);
        }

        let version = match r.read::<2, u8>()? {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return Err(Error::ReservedMpegVersion),
        };

        let layer = match r.read::<2, u8>()? {
            0b01 => Layer::Layer3,
            0b10 => Layer::Layer2,
            0b11 => Layer::Layer1,
            _ => return Err(Error::ReservedLayer),
        };

        let protected = !r.read_bit()?;

        let bit_rate_index = match r.read::<4, u8>()? {
            index @ 1..=14 => index,
            _ => return Err(Error::InvalidBitRate),
        };

        let sample_rate_index = match r.read::<2, u8>()? {
            3 => return Err(Error::ReservedSampleRate),
            index => index,
        };

        let padding = r.read_bit()?;
        let private = r.read_bit()?;

        let channel_mode = match r.read::<2, u8>()? {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        let mode_extension = r.read::<2, u8>()?;
        let copyright = r.read_bit()?;
        let original = r.read_bit()?;

        let emphasis = match r.read::<2, u8>()? {
            0 => Emphasis::None,
            1 => Emphasis::Ms5015,
            3 => Emphasis::CcittJ17,
            _ => return Err(Error::ReservedEmphasis),
        };

        Ok(Self {
            version,
            layer,
            protected,
            bit_rate_index,
            sample_rate_index,
            padding,
            private,
            channel_mode,
            mode_extension,
            copyright,
            original,
            emphasis,
        })
    }
}

impl ToBitStream for FrameHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        if !(1..=14).contains(&self.bit_rate_index) {
            return Err(Error::InvalidBitRate);
        }
        if self.sample_rate_index > 2 {
            return Err(Error::ReservedSampleRate);
        }

        w.write::<11, u16>(0x7FF)?;
        w.write::<2, u8>(match self.version {
            MpegVersion::Mpeg25 => 0b00,
            MpegVersion::Mpeg2 => 0b10,
            MpegVersion::Mpeg1 => 0b11,
        })?;
        w.write::<2, u8>(match self.layer {
            Layer::Layer3 => 0b01,
            Layer::Layer2 => 0b10,
            Layer::Layer1 => 0b11,
        })?;
        w.write_bit(!self.protected)?;
        w.write::<4, u8>(self.bit_rate_index)?;
        w.write::<2, u8>(self.sample_rate_index)?;
        w.write_bit(self.padding)?;
        w.write_bit(self.private)?;
        w.write::<2, u8>(match self.channel_mode {
            ChannelMode::Stereo => 0,
            ChannelMode::JointStereo => 1,
            ChannelMode::DualChannel => 2,
            ChannelMode::Mono => 3,
        })?;
        w.write::<2, u8>(self.mode_extension & 0b11)?;
        w.write_bit(self.copyright)?;
        w.write_bit(self.original)?;
        w.write::<2, u8>(match self.emphasis {
            Emphasis::None => 0,
            Emphasis::Ms5015 => 1,
            Emphasis::CcittJ17 => 3,
        })?;
        Ok(())
    }
}

/// The kind of header found in the first audio frame
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VbrKind {
    /// A `Xing` header, written by VBR encoders
    Xing,
    /// An `Info` header, the `Xing` layout written by CBR encoders
    Info,
    /// A Fraunhofer `VBRI` header
    Vbri,
}

/// A Xing, Info or VBRI header
///
/// These occupy the payload of the first frame of a stream
/// and describe the whole stream.
/// The frame carrying one holds no audio of its own.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VbrHeader {
    /// Which header this is
    pub kind: VbrKind,
    /// Number of audio frames in the stream
    pub frames: Option<u32>,
    /// Number of bytes in the stream
    pub bytes: Option<u32>,
    /// Seek table
    pub toc: Option<Vec<u8>>,
    /// Encoder quality indicator
    pub quality: Option<u32>,
}

impl VbrHeader {
    /// Offset of a VBRI header from the start of its frame
    pub const VBRI_OFFSET: usize = 4 + 32;

    /// Looks for a header in a frame's bytes, starting with its header
    ///
    /// Returns `None` if the frame doesn't carry one
    /// or if it's truncated.
    pub fn parse(frame: &[u8], header: &FrameHeader) -> Option<Self> {
        let crc = if header.protected { 2 } else { 0 };
        let xing = frame.get(FrameHeader::SIZE + crc + header.side_info_len()..);
        xing.and_then(Self::parse_xing)
            .or_else(|| frame.get(Self::VBRI_OFFSET..).and_then(Self::parse_vbri))
    }

    fn parse_xing(bytes: &[u8]) -> Option<Self> {
        let mut r = Reader::new(bytes);
        let kind = match r.read_bytes(4).ok()? {
            b"Xing" => VbrKind::Xing,
            b"Info" => VbrKind::Info,
            _ => return None,
        };
        let flags = r.read_u32().ok()?;
        let mut field = |bit: u32| match flags & bit {
            0 => Ok(None),
            _ => r.read_u32().map(Some),
        };
        let frames = field(0x1).ok()?;
        let bytes = field(0x2).ok()?;
        let toc = match flags & 0x4 {
            0 => None,
            _ => Some(r.read_bytes(100).ok()?.to_vec()),
        };
        let quality = match flags & 0x8 {
            0 => None,
            _ => Some(r.read_u32().ok()?),
        };

        Some(Self {
            kind,
            frames,
            bytes,
            toc,
            quality,
        })
    }

    fn parse_vbri(bytes: &[u8]) -> Option<Self> {
        let mut r = Reader::new(bytes);
        if r.read_bytes(4).ok()? != b"VBRI" {
            return None;
        }
        // version and delay
        r.read_u16().ok()?;
        r.read_u16().ok()?;
        let quality = r.read_u16().ok()?;
        let bytes = r.read_u32().ok()?;
        let frames = r.read_u32().ok()?;

        Some(Self {
            kind: VbrKind::Vbri,
            frames: Some(frames),
            bytes: Some(bytes),
            toc: None,
            quality: Some(u32::from(quality)),
        })
    }
}

/// A frame header located in a stream
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MpegFrame {
    /// Absolute offset of the header
    pub offset: u64,
    /// The decoded header
    pub header: FrameHeader,
    /// A Xing, Info or VBRI header carried by the frame
    pub vbr: Option<VbrHeader>,
}

impl MpegFrame {
    /// Offset of the first byte after the frame
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.header.size())
    }
}

/// Bytes needed past a candidate's start to examine
/// any Xing, Info or VBRI header it may carry
pub const LOOKAHEAD: usize = VbrHeader::VBRI_OFFSET + 26 + 120;

/// Finds every plausible frame header in a buffer
///
/// `base` is the absolute offset of the buffer's first byte.
/// Only positions before `limit` are considered,
/// but headers and VBR data may extend past it.
pub fn find_candidates(data: &[u8], base: u64, limit: usize) -> Vec<MpegFrame> {
    let limit = limit.min(data.len().saturating_sub(FrameHeader::SIZE - 1));
    (0..limit)
        .filter(|&i| FrameHeader::is_sync(data[i], data[i + 1]))
        .filter_map(|i| {
            let header = FrameHeader::parse(&data[i..]).ok()?;
            Some(MpegFrame {
                offset: base + i as u64,
                vbr: VbrHeader::parse(&data[i..], &header),
                header,
            })
        })
        .collect()
}

/// A run of chained candidates
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Chain {
    /// Index of the first candidate
    pub start: usize,
    /// Number of links followed from the first candidate
    pub count: usize,
}

/// Finds the candidate which begins exactly where another one ends
///
/// Candidates must be sorted by offset.
pub fn next_match(candidates: &[MpegFrame], index: usize) -> Option<usize> {
    let target = candidates.get(index)?.end();
    candidates
        .get(index + 1..)?
        .iter()
        .take_while(|c| c.offset <= target)
        .position(|c| c.offset == target)
        .map(|position| index + 1 + position)
}

/// Selects the first candidate which begins a chain
///
/// Up to [`MAX_SEEDS`] unvisited candidates are tried as starts,
/// each followed for at most `max_chain` links.
/// The first which links to anything is selected.
/// If none do, the first candidate is returned with a count of 0.
/// Returns `None` only if there are no candidates.
///
/// # Example
/// ```
/// use id3_codec::mpeg::{best_chain, FrameHeader, MpegFrame};
///
/// let header = FrameHeader::parse(&[0xFF, 0xFB, 0x90, 0x64]).unwrap();
/// let frame = |offset| MpegFrame { offset, header, vbr: None };
///
/// // a stray header, then three chained 417 byte frames
/// let candidates = [frame(100), frame(1000), frame(1417), frame(1834)];
///
/// let chain = best_chain(&candidates, 50).unwrap();
/// assert_eq!(chain.start, 1);
/// assert_eq!(chain.count, 2);
/// ```
pub fn best_chain(candidates: &[MpegFrame], max_chain: usize) -> Option<Chain> {
    if candidates.is_empty() {
        return None;
    }

    let mut visited = vec![false; candidates.len()];
    let mut seeds = 0;

    for start in 0..candidates.len() {
        if seeds == MAX_SEEDS {
            break;
        }
        if visited[start] {
            continue;
        }
        visited[start] = true;
        seeds += 1;

        let mut count = 0;
        let mut current = start;
        while count < max_chain {
            match next_match(candidates, current) {
                Some(next) => {
                    visited[next] = true;
                    current = next;
                    count += 1;
                }
                None => break,
            }
        }

        if count > 0 {
            log::debug!(
                "chain of {count} starting at offset {}",
                candidates[start].offset
            );
            return Some(Chain { start, count });
        }
    }

    log::debug!("no chained frames, falling back to first candidate");
    Some(Chain { start: 0, count: 0 })
}

/// Extends a chain from its starting candidate
/// through the rest of the candidates
///
/// Candidates overlapping the previous frame are skipped.
/// A candidate beginning after the previous frame's end
/// is accepted only if it matches that frame's version and layer.
pub fn follow_chain(candidates: &[MpegFrame], start: usize) -> Vec<MpegFrame> {
    let Some(first) = candidates.get(start) else {
        return Vec::new();
    };

    let mut frames = vec![first.clone()];
    let mut expected = first.end();
    let mut header = first.header;

    for candidate in &candidates[start + 1..] {
        if candidate.offset < expected {
            continue;
        }
        if candidate.offset == expected || candidate.header.is_compatible(&header) {
            expected = candidate.end();
            header = candidate.header;
            frames.push(candidate.clone());
        }
    }

    frames
}

/// Scanning options
#[derive(Clone, Debug)]
pub struct ScanOptions {
    max_chain: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { max_chain: 50 }
    }
}

impl ScanOptions {
    /// Maximum number of links followed when testing a chain start
    pub fn max_chain(self, max_chain: usize) -> Self {
        Self { max_chain }
    }
}

/// Picks out the likeliest sequence of real audio frames
///
/// Returns the selected chain along with its extended frames,
/// or `None` if there are no candidates.
pub fn select_frames(
    candidates: &[MpegFrame],
    options: &ScanOptions,
) -> Option<(Chain, Vec<MpegFrame>)> {
    best_chain(candidates, options.max_chain)
        .map(|chain| (chain, follow_chain(candidates, chain.start)))
}

/// Whether a stream's bit rate varies
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BitrateMode {
    /// Constant bit rate
    Cbr,
    /// Variable bit rate
    Vbr,
}

/// Stream-wide properties derived from its frames
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSummary {
    /// Constant or variable bit rate
    pub mode: BitrateMode,
    /// Total playing time
    pub duration: Duration,
    /// Average bit rate in bits per second
    pub bit_rate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u8,
    /// Number of audio frames
    pub frame_count: u64,
    /// Number of audio bytes
    pub audio_bytes: u64,
    /// The stream's VBR header, if any
    pub vbr: Option<VbrHeader>,
}

fn frames_duration(frames: u64, samples_per_frame: u32, sample_rate: u32) -> Duration {
    let samples = u128::from(frames) * u128::from(samples_per_frame);
    let nanos = samples * 1_000_000_000 / u128::from(sample_rate.max(1));
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl AudioSummary {
    /// Summarizes a chain of frames
    ///
    /// A Xing, Info or VBRI header on the first frame
    /// supplies the frame and byte counts when present;
    /// otherwise they're totalled from the chain itself.
    pub fn from_chain(frames: &[MpegFrame]) -> Option<Self> {
        let first = frames.first()?;
        let header = first.header;

        let (audio, vbr) = match &first.vbr {
            Some(vbr) => (&frames[1..], Some(vbr.clone())),
            None => (frames, None),
        };

        let frame_count = vbr
            .as_ref()
            .and_then(|v| v.frames)
            .map(u64::from)
            .unwrap_or(audio.len() as u64);
        let audio_bytes = vbr
            .as_ref()
            .and_then(|v| v.bytes)
            .map(u64::from)
            .unwrap_or_else(|| audio.iter().map(|f| u64::from(f.header.size())).sum());

        let mode = match vbr.as_ref().map(|v| v.kind) {
            Some(VbrKind::Xing | VbrKind::Vbri) => BitrateMode::Vbr,
            Some(VbrKind::Info) => BitrateMode::Cbr,
            None => match audio
                .iter()
                .all(|f| f.header.bit_rate_index == header.bit_rate_index)
            {
                true => BitrateMode::Cbr,
                false => BitrateMode::Vbr,
            },
        };

        let duration = frames_duration(frame_count, header.samples_per_frame(), header.sample_rate());

        let bit_rate = match mode {
            BitrateMode::Cbr => audio.first().unwrap_or(first).header.bit_rate() * 1000,
            BitrateMode::Vbr => match duration.as_nanos() {
                0 => 0,
                nanos => u32::try_from(u128::from(audio_bytes) * 8 * 1_000_000_000 / nanos)
                    .unwrap_or(u32::MAX),
            },
        };

        Some(Self {
            mode,
            duration,
            bit_rate,
            sample_rate: header.sample_rate(),
            channels: header.channels(),
            frame_count,
            audio_bytes,
            vbr,
        })
    }
}
