// Wavfeed -- A wav decoding, encoding and streaming library in Rust
// Copyright (C) 2015 Ruud van Asseldonk
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;
use std::io;
use std::io::Write;
use std::path;

use tracing::{debug, warn};

use crate::wav::{ChunkHeader, ChunkKind, PcmFormat, RiffHeader};
use crate::{u8_from_signed, Error, Result, SampleBuffer, SampleData};

/// Extends the functionality of `io::Write` with additional methods.
///
/// The methods may be used on any type that implements `io::Write`.
pub trait WriteExt: io::Write {
    /// Writes an unsigned 8-bit integer.
    fn write_u8(&mut self, x: u8) -> io::Result<()>;

    /// Writes a signed 16-bit integer in little endian format.
    fn write_le_i16(&mut self, x: i16) -> io::Result<()>;
}

impl<W> WriteExt for W where W: io::Write {
    #[inline(always)]
    fn write_u8(&mut self, x: u8) -> io::Result<()> {
        self.write_all(&[x])
    }

    #[inline(always)]
    fn write_le_i16(&mut self, x: i16) -> io::Result<()> {
        self.write_all(&x.to_le_bytes())
    }
}

/// Rescales a signed 24-bit sample to 16 bits.
///
/// The computation goes through the unsigned range, the same way as for
/// `u24_to_i16`, and is truncated towards zero.
fn i24_to_i16(x: i32) -> i16 {
    (((x as f32 + 0x80_0000 as f32) / 0x7f_ffff as f32) * 0x7fff as f32 - 0x8000 as f32) as i16
}

/// Rescales an unsigned 24-bit sample to a signed 16-bit one.
fn u24_to_i16(x: u32) -> i16 {
    ((x as f32 / 0x7f_ffff as f32) * 0x7fff as f32 - 0x8000 as f32) as i16
}

/// Scales a float sample in [-1.0, 1.0] to 16 bits, truncating.
///
/// Values outside of the range saturate.
fn f32_to_i16(x: f32) -> i16 {
    (x * 0x7fff as f32) as i16
}

/// Appends the sample values to `out` in the layout of the wav data chunk.
fn write_samples(out: &mut Vec<u8>, data: &SampleData) -> io::Result<()> {
    match *data {
        SampleData::UInt8(ref v) => out.write_all(v)?,
        SampleData::Int8(ref v) => {
            for &x in v {
                out.write_u8(u8_from_signed(x))?;
            }
        }
        SampleData::Int16(ref v) => {
            for &x in v {
                out.write_le_i16(x)?;
            }
        }
        SampleData::UInt16(ref v) => {
            for &x in v {
                out.write_le_i16(x.wrapping_sub(0x8000) as i16)?;
            }
        }
        SampleData::Int24(ref v) => {
            for &x in v {
                out.write_le_i16(i24_to_i16(x))?;
            }
        }
        SampleData::UInt24(ref v) => {
            for &x in v {
                out.write_le_i16(u24_to_i16(x))?;
            }
        }
        SampleData::Float32(ref v) => {
            for &x in v {
                out.write_le_i16(f32_to_i16(x))?;
            }
        }
    }
    Ok(())
}

/// Encodes a sample buffer as a complete wav file in memory.
///
/// The output is the canonical 44-byte header (a single 16-byte `fmt ` chunk
/// with the PCM format code) followed by the data chunk. 8-bit depths are
/// written as 8-bit unsigned samples, every other depth is converted to
/// 16-bit signed samples.
///
/// Fails if the buffer does not have one or two channels, if its sample rate
/// is 0 or too high for the byte rate field, or if its data does not hold
/// exactly `frames × channels` values.
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    if buffer.channels != 1 && buffer.channels != 2 {
        return Err(Error::UnsupportedChannels(buffer.channels));
    }
    // The decoder rejects such a file, so do not write one.
    if buffer.sample_rate == 0 {
        return Err(Error::FormatError("sample rate is 0"));
    }

    let expected = buffer.frames.saturating_mul(buffer.channels as usize);
    let actual = buffer.data.len();
    if expected != actual {
        return Err(Error::LengthMismatch {
            expected: expected,
            actual: actual,
        });
    }

    let format = PcmFormat {
        channels: buffer.channels,
        sample_rate: buffer.sample_rate,
        bits_per_sample: buffer.depth().wav_bits(),
    };
    let format_bytes = format.to_bytes()?;

    // The header minus magic and 32-bit file size is 36 bytes long.
    let data_size = (actual as u64) * (format.bits_per_sample as u64 / 8);
    if data_size > (u32::MAX - 36) as u64 {
        return Err(Error::FormatError("sample data does not fit in a wav file"));
    }
    let data_size = data_size as u32;

    let mut out = Vec::with_capacity(44 + data_size as usize);
    out.write_all(&RiffHeader { inner_len: 36 + data_size }.to_bytes())?;
    out.write_all(&ChunkHeader { kind: ChunkKind::Fmt, len: PcmFormat::LEN }.to_bytes())?;
    out.write_all(&format_bytes)?;
    out.write_all(&ChunkHeader { kind: ChunkKind::Data, len: data_size }.to_bytes())?;
    write_samples(&mut out, &buffer.data)?;

    Ok(out)
}

/// Writes a sample buffer to `writer` in the wav format.
///
/// The file is encoded in memory first, so nothing is written when the
/// buffer cannot be encoded. See `encode` for the format.
pub fn save_to<W: io::Write>(writer: &mut W, buffer: &SampleBuffer) -> Result<()> {
    let bytes = encode(buffer)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Writes a sample buffer to a wav file.
///
/// The file is created only after the buffer has been encoded successfully,
/// and is removed again if writing fails, so no partial file is left behind.
/// An existing file at `filename` is overwritten.
pub fn save<P: AsRef<path::Path>>(filename: P, buffer: &SampleBuffer) -> Result<()> {
    let path = filename.as_ref();
    let bytes = encode(buffer)?;

    let mut file = fs::File::create(path)?;
    if let Err(err) = file.write_all(&bytes).and_then(|()| file.sync_all()) {
        drop(file);
        warn!(path = %path.display(), error = %err, "failed to write wav file, removing it");
        let _ = fs::remove_file(path);
        return Err(Error::IoError(err));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "saved wav file");
    Ok(())
}

#[cfg(test)]
fn data_of(bytes: &[u8]) -> &[u8] {
    &bytes[44..]
}

#[test]
fn encode_writes_canonical_header() {
    let buffer = SampleBuffer::new(1, 44100, SampleData::Int16(vec![100, -100]));
    let bytes = encode(&buffer).unwrap();

    assert_eq!(bytes.len(), 48);
    assert_eq!(&bytes[..44], &b"RIFF\x28\x00\x00\x00WAVE\
fmt \x10\x00\x00\x00\x01\x00\x01\x00\x44\xac\x00\x00\x88\x58\x01\x00\x02\x00\x10\x00\
data\x04\x00\x00\x00"[..]);
    assert_eq!(data_of(&bytes), &[100, 0, 0x9c, 0xff]);
}

#[test]
fn encode_8bit_declares_8_bits() {
    let buffer = SampleBuffer::new(2, 8000, SampleData::Int8(vec![-128, 127]));
    let bytes = encode(&buffer).unwrap();
    assert_eq!(&bytes[34..36], &[8, 0]);
    assert_eq!(data_of(&bytes), &[0, 255]);
}

#[test]
fn encode_converts_wide_depths_to_16_bits() {
    let buffer = SampleBuffer::new(1, 8000, SampleData::UInt16(vec![0, 0x8000, 0xffff]));
    let bytes = encode(&buffer).unwrap();
    assert_eq!(&bytes[34..36], &[16, 0]);
    assert_eq!(data_of(&bytes), &[0x00, 0x80, 0x00, 0x00, 0xff, 0x7f]);

    assert_eq!(i24_to_i16(-0x80_0000), -0x8000);
    assert_eq!(i24_to_i16(0), 0);
    assert_eq!(i24_to_i16(0x7f_ffff), 0x7ffe);
    assert_eq!(u24_to_i16(0), -0x8000);
    assert_eq!(u24_to_i16(0xff_ffff), 0x7ffe);

    assert_eq!(f32_to_i16(0.0), 0);
    assert_eq!(f32_to_i16(0.5), 16383);
    assert_eq!(f32_to_i16(-1.0), -32767);
    assert_eq!(f32_to_i16(4.0), i16::MAX);
}

#[test]
fn encode_rejects_unsupported_channels() {
    let buffer = SampleBuffer::new(3, 8000, SampleData::Int16(vec![0; 6]));
    match encode(&buffer) {
        Err(Error::UnsupportedChannels(3)) => {}
        other => panic!("expected UnsupportedChannels, got {:?}", other),
    }
}

#[test]
fn save_to_writes_nothing_on_failure() {
    let mut buffer = SampleBuffer::new(2, 8000, SampleData::Float32(vec![0.0; 4]));
    buffer.frames = 3;

    let mut out = Vec::new();
    match save_to(&mut out, &buffer) {
        Err(Error::LengthMismatch { expected: 6, actual: 4 }) => {}
        other => panic!("expected LengthMismatch, got {:?}", other),
    }
    assert!(out.is_empty());
}

#[test]
fn encode_rejects_unrepresentable_sample_rates() {
    let fast = SampleBuffer::new(2, 3_000_000_000, SampleData::Int16(vec![0, 0]));
    match encode(&fast) {
        Err(Error::FormatError("sample rate too high")) => {}
        other => panic!("expected a format error, got {:?}", other),
    }

    // 8-bit mono still fits at the same rate.
    let narrow = SampleBuffer::new(1, 3_000_000_000, SampleData::UInt8(vec![0x80]));
    let bytes = encode(&narrow).unwrap();
    assert_eq!(&bytes[28..32], &3_000_000_000_u32.to_le_bytes());

    let mut out = Vec::new();
    let still = SampleBuffer::new(1, 0, SampleData::UInt8(vec![0x80; 4]));
    match save_to(&mut out, &still) {
        Err(Error::FormatError("sample rate is 0")) => {}
        other => panic!("expected a format error, got {:?}", other),
    }
    assert!(out.is_empty());
}
