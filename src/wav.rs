// Wavfeed -- A wav decoding, encoding and streaming library in Rust
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Building blocks for working with the RIFF container.
//!
//! A WAVE file is a RIFF header followed by a sequence of _chunks_. Every
//! chunk starts with an 8-byte header: a four-character tag and a
//! little-endian length. The decoder in `read.rs` walks these headers until
//! it finds the data chunk, and the encoder in `write.rs` emits them in the
//! canonical order. Both go through the types in this module so that the
//! byte layout lives in one place.

use crate::{Error, Result};

trait Bytes {
    fn read_4_bytes(&self) -> [u8; 4];
    fn read_le_u32(&self) -> u32;

    fn write_le_u32(&mut self, x: u32);
}

impl Bytes for [u8] {
    #[inline(always)]
    fn read_4_bytes(&self) -> [u8; 4] {
        [self[0], self[1], self[2], self[3]]
    }

    #[inline(always)]
    fn read_le_u32(&self) -> u32 {
        u32::from_le_bytes(self.read_4_bytes())
    }

    #[inline(always)]
    fn write_le_u32(&mut self, x: u32) {
        self[..4].copy_from_slice(&x.to_le_bytes());
    }
}

/// The outermost header of a wav file: the RIFF header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiffHeader {
    /// The length in bytes of the data that follows the header.
    ///
    /// This does not include the length of the 8-byte RIFF header, but it does
    /// include the length of the 4-byte WAVE tag. Therefore the size of a wav
    /// file is 8 bytes more than this inner length.
    ///
    /// The decoder does not rely on this value; many writers leave it at zero
    /// or at `u32::MAX` when streaming.
    pub inner_len: u32,
}

impl RiffHeader {
    /// Parse the RIFF WAVE header.
    ///
    /// Aside from returning the length of the file, this can be used to test
    /// the magic bytes to see if a file might be a wav file at all.
    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 12]) -> Result<RiffHeader> {
        if &bytes.read_4_bytes() != b"RIFF" {
            return Err(Error::FormatError("no RIFF tag found"));
        }
        if &bytes[8..].read_4_bytes() != b"WAVE" {
            return Err(Error::FormatError("no WAVE tag found"));
        }
        Ok(RiffHeader {
            inner_len: bytes[4..].read_le_u32(),
        })
    }

    /// Serialize the header for writing to a file.
    #[inline(always)]
    pub fn to_bytes(self) -> [u8; 12] {
        let mut result: [u8; 12] = *b"RIFF\0\0\0\0WAVE";
        result[4..].write_le_u32(self.inner_len);
        result
    }
}

/// The kinds of chunk that the decoder distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    Fmt,
    Data,
    /// Any other chunk. The tag is kept so it can be logged.
    Other([u8; 4]),
}

impl ChunkKind {
    fn from_tag(tag: [u8; 4]) -> ChunkKind {
        match &tag {
            b"fmt " => ChunkKind::Fmt,
            b"data" => ChunkKind::Data,
            _ => ChunkKind::Other(tag),
        }
    }

    fn tag(self) -> [u8; 4] {
        match self {
            ChunkKind::Fmt => *b"fmt ",
            ChunkKind::Data => *b"data",
            ChunkKind::Other(tag) => tag,
        }
    }
}

/// The 8-byte header that precedes every chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub kind: ChunkKind,
    /// Length of the chunk body in bytes, excluding this header.
    pub len: u32,
}

impl ChunkHeader {
    #[inline(always)]
    pub fn from_bytes(bytes: [u8; 8]) -> ChunkHeader {
        ChunkHeader {
            kind: ChunkKind::from_tag(bytes.read_4_bytes()),
            len: bytes[4..].read_le_u32(),
        }
    }

    #[inline(always)]
    pub fn to_bytes(self) -> [u8; 8] {
        let mut result = [0u8; 8];
        result[..4].copy_from_slice(&self.kind.tag());
        result[4..].write_le_u32(self.len);
        result
    }
}

/// Format code of uncompressed integer PCM, the only encoding supported.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;

/// The body of a 16-byte `fmt ` chunk, the PCMWAVEFORMAT struct.
///
/// ```text
/// typedef struct {
///     WORD  wFormatTag;
///     WORD  nChannels;
///     DWORD nSamplesPerSec;
///     DWORD nAvgBytesPerSec;
///     WORD  nBlockAlign;
///     WORD  wBitsPerSample;
/// } PCMWAVEFORMAT;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// Size of the serialized struct, and so of the `fmt ` chunk body.
    pub const LEN: u32 = 16;

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Returns `None` if the byte rate does not fit the 32-bit field.
    pub fn byte_rate(&self) -> Option<u32> {
        self.sample_rate.checked_mul(self.block_align() as u32)
    }

    pub fn to_bytes(self) -> Result<[u8; 16]> {
        let byte_rate = self.byte_rate()
                            .ok_or(Error::FormatError("sample rate too high"))?;
        let mut result = [0u8; 16];
        result[0..2].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        result[2..4].copy_from_slice(&self.channels.to_le_bytes());
        result[4..8].copy_from_slice(&self.sample_rate.to_le_bytes());
        result[8..12].copy_from_slice(&byte_rate.to_le_bytes());
        result[12..14].copy_from_slice(&self.block_align().to_le_bytes());
        result[14..16].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        Ok(result)
    }
}

#[test]
fn riff_header_rejects_bad_magic() {
    assert!(RiffHeader::from_bytes(*b"RIFX\0\0\0\0WAVE").is_err());
    assert!(RiffHeader::from_bytes(*b"RIFF\0\0\0\0AVI ").is_err());
    let header = RiffHeader::from_bytes(*b"RIFF\x24\x08\0\0WAVE").unwrap();
    assert_eq!(header.inner_len, 0x0824);
}

#[test]
fn chunk_header_keeps_unknown_tags() {
    let header = ChunkHeader::from_bytes(*b"LIST\x1a\0\0\0");
    assert_eq!(header.kind, ChunkKind::Other(*b"LIST"));
    assert_eq!(header.len, 26);
    assert_eq!(&header.to_bytes(), b"LIST\x1a\0\0\0");

    let data = ChunkHeader { kind: ChunkKind::Data, len: 4 };
    assert_eq!(ChunkHeader::from_bytes(data.to_bytes()), data);
}

#[test]
fn pcm_format_derives_rates() {
    let format = PcmFormat {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
    };
    assert_eq!(format.block_align(), 4);
    assert_eq!(format.byte_rate(), Some(176_400));
    assert_eq!(&format.to_bytes().unwrap(),
               b"\x01\x00\x02\x00\x44\xac\x00\x00\x10\xb1\x02\x00\x04\x00\x10\x00");
}

#[test]
fn pcm_format_rejects_byte_rate_overflow() {
    let format = PcmFormat {
        channels: 2,
        sample_rate: 3_000_000_000,
        bits_per_sample: 16,
    };
    assert_eq!(format.byte_rate(), None);
    match format.to_bytes() {
        Err(Error::FormatError(..)) => {}
        other => panic!("expected a format error, got {:?}", other),
    }

    // The largest rate that still fits.
    let format = PcmFormat { sample_rate: u32::MAX / 4, ..format };
    assert_eq!(format.byte_rate(), Some(u32::MAX / 4 * 4));
}
