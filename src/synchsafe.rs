// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synchsafe integers and ID3v2 unsynchronisation
//!
//! Both schemes exist so that no byte sequence inside a tag
//! can be mistaken for an MPEG frame sync pattern
//! (eleven set bits in a row).
//!
//! A synchsafe integer stores 28 bits of value in four bytes,
//! each of which uses only its low 7 bits:
//!
//! ```text
//! 0000_1111 1111_1111 1111_1111 1111_1111  (0x0FFFFFFF)
//!          ↓
//! 0111_1111 0111_1111 0111_1111 0111_1111  (0x7F7F7F7F)
//! ```

/// Largest value a 4 byte synchsafe integer can hold
pub const SYNCHSAFE_MAX: u32 = 0x0FFF_FFFF;

/// Spreads the low 28 bits of `x` into the low 7 bits of each byte
///
/// Values above [`SYNCHSAFE_MAX`] wrap modulo 2²⁸,
/// so every output byte is always below `0x80`.
///
/// # Example
/// ```
/// use id3_codec::synchsafe::{synchsafe, unsynchsafe};
///
/// assert_eq!(synchsafe(0x0FFF_FFFF), 0x7F7F_7F7F);
/// assert_eq!(synchsafe(0x80), 0x0100);
/// assert_eq!(synchsafe(0x1000_0000), 0);  // wraps
/// assert_eq!(unsynchsafe(synchsafe(1234567)), 1234567);
/// ```
pub fn synchsafe(x: u32) -> u32 {
    let mut x = x & SYNCHSAFE_MAX;
    let mut mask: u32 = 0x7F;

    while mask != 0x7FFF_FFFF {
        x = ((x & !mask) << 1) | (x & mask);
        mask = ((mask + 1) << 8) - 1;
    }

    x
}

/// Recombines the low 7 bits of each byte of `x`
///
/// The high bit of each byte is ignored.
pub fn unsynchsafe(x: u32) -> u32 {
    let mut out = 0;
    let mut mask: u32 = 0x7F00_0000;

    while mask != 0 {
        out >>= 1;
        out |= x & mask;
        mask >>= 8;
    }

    out
}

/// Encodes a 32-bit value as a 35-bit, five byte synchsafe integer
///
/// Used for the CRC-32 field of an ID3v2.4 extended header.
pub fn synchsafe_u35(x: u32) -> [u8; 5] {
    [
        ((x >> 28) & 0x0F) as u8,
        ((x >> 21) & 0x7F) as u8,
        ((x >> 14) & 0x7F) as u8,
        ((x >> 7) & 0x7F) as u8,
        (x & 0x7F) as u8,
    ]
}

/// Decodes a 35-bit, five byte synchsafe integer
///
/// Any bits beyond the lowest 32 are discarded.
pub fn unsynchsafe_u35(bytes: [u8; 5]) -> u32 {
    bytes
        .iter()
        .fold(0u64, |acc, b| (acc << 7) | u64::from(b & 0x7F)) as u32
}

/// Removes unsynchronisation from a buffer
///
/// Every `0x00` which directly follows a `0xFF` in the source
/// is dropped, and everything else is copied verbatim.
/// The preceding byte is taken from the input rather than the output,
/// which makes this the exact inverse of [`insert_unsync`].
///
/// # Example
/// ```
/// use id3_codec::synchsafe::remove_unsync;
///
/// assert_eq!(remove_unsync(&[0xFF, 0x00, 0xE0, 0x01]), vec![0xFF, 0xE0, 0x01]);
/// assert_eq!(remove_unsync(&[0xFF, 0x00, 0x00]), vec![0xFF, 0x00]);
/// ```
pub fn remove_unsync(bytes: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(bytes.len());
    let mut previous = None;

    for &byte in bytes {
        if !(byte == 0x00 && previous == Some(0xFF)) {
            output.push(byte);
        }
        previous = Some(byte);
    }

    output
}

/// Applies unsynchronisation to a buffer
///
/// A `0x00` is inserted after every `0xFF` which is followed by
/// a byte of `0xE0` or above, by `0x00`, or by nothing at all.
///
/// # Example
/// ```
/// use id3_codec::synchsafe::{insert_unsync, remove_unsync};
///
/// let data = [0xFF, 0xFB, 0x90, 0xFF];
/// let unsynced = insert_unsync(&data);
/// assert_eq!(unsynced, vec![0xFF, 0x00, 0xFB, 0x90, 0xFF, 0x00]);
/// assert_eq!(remove_unsync(&unsynced), data);
/// ```
pub fn insert_unsync(bytes: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(bytes.len() + bytes.len() / 8);

    for (i, &byte) in bytes.iter().enumerate() {
        output.push(byte);
        if byte == 0xFF {
            match bytes.get(i + 1) {
                Some(&next) if next < 0xE0 && next != 0x00 => {}
                _ => output.push(0x00),
            }
        }
    }

    output
}

/// Returns whether the buffer needs unsynchronisation at all
pub fn needs_unsync(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().any(|(i, &b)| {
        b == 0xFF && !matches!(bytes.get(i + 1), Some(&next) if next < 0xE0 && next != 0x00)
    })
}

/// Removes unsynchronisation until `len` bytes have been produced
///
/// Returns the decoded bytes along with how many
/// source bytes were consumed to produce them.
/// If the source runs out, fewer than `len` bytes are returned.
pub fn take_unsynced(source: &[u8], len: usize) -> (Vec<u8>, usize) {
    let mut output = Vec::with_capacity(len);
    let mut consumed = 0;
    let mut previous = None;

    while output.len() < len && consumed < source.len() {
        let byte = source[consumed];
        consumed += 1;
        if !(byte == 0x00 && previous == Some(0xFF)) {
            output.push(byte);
        }
        previous = Some(byte);
    }

    // a stuffed zero directly after the final byte belongs to us too
    if previous == Some(0xFF) && source.get(consumed) == Some(&0x00) {
        consumed += 1;
    }

    (output, consumed)
}
